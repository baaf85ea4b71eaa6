//! S3 bucket and object browsing.

use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use kubeapps_core::retry::retry_recoverable;
use kubeapps_core::AppError;
use kubeapps_storage::{format_bytes, BucketSummary, ObjectSummary, MAX_LIST_KEYS};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::messages::required;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListObjectsRequest {
    #[serde(default)]
    pub bucket_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListBucketsResponse {
    pub success: bool,
    pub buckets: Vec<BucketSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEntry {
    pub key: String,
    /// Human-readable, e.g. `1.5 KB`.
    pub size: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub storage_class: Option<String>,
}

impl From<ObjectSummary> for ObjectEntry {
    fn from(object: ObjectSummary) -> Self {
        Self {
            size: format_bytes(object.size),
            key: object.key,
            last_modified: object.last_modified,
            storage_class: object.storage_class,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListObjectsResponse {
    pub success: bool,
    pub objects: Vec<ObjectEntry>,
    pub bucket_name: String,
    pub is_truncated: bool,
}

#[tracing::instrument(skip(state))]
pub async fn list_buckets(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let store = &state.storage.store;

    let buckets = retry_recoverable(
        || async move { store.list_buckets().await.map_err(AppError::from) },
        &state.storage.policy,
    )
    .await
    .inspect_err(|e| tracing::error!(error = %e, "Failed to list S3 buckets"))?;

    Ok(Json(ListBucketsResponse {
        success: true,
        buckets,
    }))
}

#[tracing::instrument(skip(state, request))]
pub async fn list_objects(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ListObjectsRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let bucket_name = required(request.bucket_name, "Bucket name is required")?;
    let store = &state.storage.store;
    let bucket = bucket_name.as_str();

    let listing = retry_recoverable(
        || async move {
            store
                .list_objects(bucket, MAX_LIST_KEYS)
                .await
                .map_err(AppError::from)
        },
        &state.storage.policy,
    )
    .await
    .inspect_err(|e| {
        tracing::error!(bucket = %bucket_name, error = %e, "Failed to list S3 objects")
    })?;

    Ok(Json(ListObjectsResponse {
        success: true,
        objects: listing.objects.into_iter().map(Into::into).collect(),
        bucket_name,
        is_truncated: listing.is_truncated,
    }))
}
