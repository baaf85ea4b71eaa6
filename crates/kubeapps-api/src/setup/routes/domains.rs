//! Domain route groups (users, queue, cluster, storage).

use crate::handlers;
use crate::state::AppState;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;

pub fn user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/api/list", get(handlers::users::list_users))
        .route("/users/api/add", post(handlers::users::add_user))
        .route("/users/api/delete/{id}", delete(handlers::users::delete_user))
        .with_state(state)
}

pub fn queue_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/sqs/api/send-message", post(handlers::messages::send_message))
        .route(
            "/sqs/api/receive-messages",
            get(handlers::messages::receive_messages),
        )
        .route(
            "/sqs/api/delete-message",
            post(handlers::messages::delete_message),
        )
        .route(
            "/sqs/api/process-messages",
            post(handlers::messages::process_messages),
        )
        .with_state(state)
}

pub fn cluster_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/kubernetes/api/list-pods", post(handlers::cluster::list_pods))
        .route(
            "/kubernetes/api/namespaces",
            get(handlers::cluster::list_namespaces),
        )
        .with_state(state)
}

pub fn storage_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/s3/api/list-buckets", get(handlers::storage::list_buckets))
        .route("/s3/api/list-objects", post(handlers::storage::list_objects))
        .with_state(state)
}
