//! User management handlers backed by the `users` table.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use kubeapps_core::models::{AddUserRequest, User};
use kubeapps_core::AppError;
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{HttpAppError, ValidatedJson, ValidatedPath};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub users: Vec<User>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAddedResponse {
    pub success: bool,
    pub message: &'static str,
    pub user_id: i64,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

#[tracing::instrument(skip(state))]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let users = state.users.list_users().await?;

    Ok(Json(UserListResponse {
        success: true,
        count: users.len(),
        users,
    }))
}

#[tracing::instrument(skip(state, request))]
pub async fn add_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<AddUserRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;

    let (name, email) = request.normalized();
    if name.is_empty() || email.is_empty() {
        return Err(AppError::Validation("Name and email are required".to_string()).into());
    }

    let user = state.users.add_user(&name, &email).await?;
    tracing::info!(user_id = user.id, "User added");

    Ok((
        StatusCode::CREATED,
        Json(UserAddedResponse {
            success: true,
            message: "User added successfully",
            user_id: user.id,
            user,
        }),
    ))
}

#[tracing::instrument(skip(state))]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    ValidatedPath(id): ValidatedPath<i64>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.users.delete_user(id).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "User deleted successfully",
    }))
}
