//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Any `AppError` (or a type
//! with `Into<AppError>`, such as `QueueError` or `ClusterError`) becomes an
//! `HttpAppError` via `?` and renders as `{ "success": false, "error": { ... } }` with
//! the mapped status code. Unknown routes and unparseable extractors use the same shape.

use axum::{
    body::Bytes,
    extract::rejection::{JsonRejection, PathRejection},
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use kubeapps_cluster::ClusterError;
use kubeapps_core::config::is_development_env;
use kubeapps_core::{AppError, ErrorMetadata, LogLevel};
use kubeapps_storage::StorageError;
use kubeapps_worker::{ConsumerError, QueueError};
use serde::{de::DeserializeOwned, Serialize};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub status: u16,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether a retry can succeed
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    /// Error chain, development environments only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse (orphan rule).
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<QueueError> for HttpAppError {
    fn from(err: QueueError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<ClusterError> for HttpAppError {
    fn from(err: ClusterError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<ConsumerError> for HttpAppError {
    fn from(err: ConsumerError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<validator::ValidationErrors> for HttpAppError {
    fn from(err: validator::ValidationErrors) -> Self {
        HttpAppError(err.into())
    }
}

/// Malformed JSON bodies become a 400 in the standard error shape.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::Validation(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// JSON body extractor that answers with [`ErrorResponse`] on deserialization failure.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

/// JSON body extractor for endpoints where the body may be omitted; an empty body
/// yields `T::default()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalJson<T>(pub T);

impl<T, S> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned + Default + Send,
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state).await.map_err(|rejection| {
            AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
        })?;
        if body.is_empty() {
            return Ok(OptionalJson(T::default()));
        }
        let value = serde_json::from_slice(&body).map_err(AppError::from)?;
        Ok(OptionalJson(value))
    }
}

/// Unparseable path parameters become a 400 in the standard error shape.
impl From<PathRejection> for HttpAppError {
    fn from(rejection: PathRejection) -> Self {
        HttpAppError(AppError::Validation(format!(
            "Invalid path parameter: {}",
            rejection.body_text()
        )))
    }
}

/// Path extractor that answers with [`ErrorResponse`] when a segment does not parse.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(inner) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedPath(inner))
    }
}

/// Router fallback: unknown routes get a JSON 404.
pub async fn not_found() -> HttpAppError {
    HttpAppError(AppError::NotFound("Not Found".to_string()))
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_development() -> bool {
    let environment = std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .or_else(|_| std::env::var("NODE_ENV"))
        .ok();
    details_enabled(environment.as_deref())
}

/// Details are opt-in: an unset environment hides them.
fn details_enabled(environment: Option<&str>) -> bool {
    environment.is_some_and(is_development_env)
}

impl ErrorResponse {
    pub fn from_app_error(error: &AppError, include_details: bool) -> Self {
        let details = (include_details && !error.is_sensitive()).then(|| error.detailed_message());
        Self {
            success: false,
            error: ErrorBody {
                message: error.client_message(),
                status: error.http_status_code(),
                code: error.error_code().to_string(),
                recoverable: error.is_recoverable(),
                suggested_action: error.suggested_action().map(String::from),
                details,
            },
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;
        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let body = ErrorResponse::from_app_error(app_error, is_development());
        (status, Json(body)).into_response()
    }
}
