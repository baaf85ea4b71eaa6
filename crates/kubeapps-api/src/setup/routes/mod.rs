//! Route configuration and setup.
//!
//! Domain route groups live in [domains](domains); health checks in [health](health).

mod domains;
mod health;

use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use kubeapps_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(&config.cors_origins)?;

    let app = public_routes(state.clone())
        .merge(domains::user_routes(state.clone()))
        .merge(domains::queue_routes(state.clone()))
        .merge(domains::cluster_routes(state.clone()))
        .merge(domains::storage_routes(state.clone()))
        .fallback(crate::error::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn setup_cors(cors_origins: &[String]) -> Result<CorsLayer, anyhow::Error> {
    let cors = if cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins = cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}

fn public_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/health",
            get({
                let state = state.clone();
                move || async move { health::health_check(state).await }
            }),
        )
        .route(
            "/health/live",
            get({
                let state = state.clone();
                move || async move { health::liveness_check(state).await }
            }),
        )
        .route(
            "/health/ready",
            get({
                let state = state.clone();
                move || async move { health::readiness_check(state).await }
            }),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_origins_are_parsed() {
        let origins = vec!["http://localhost:3000".to_string()];
        assert!(setup_cors(&origins).is_ok());
    }

    #[test]
    fn invalid_origin_is_rejected() {
        let origins = vec!["bad\norigin".to_string()];
        assert!(setup_cors(&origins).is_err());
    }
}
