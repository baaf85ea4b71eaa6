//! Kubernetes pod and namespace listing.

use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use kubeapps_cluster::{NamespaceSummary, PodSummary, DEFAULT_NAMESPACE};
use kubeapps_core::retry::retry_recoverable;
use kubeapps_core::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{HttpAppError, OptionalJson};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListPodsRequest {
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListPodsResponse {
    pub success: bool,
    pub pods: Vec<PodSummary>,
    pub namespace: String,
}

#[derive(Debug, Serialize)]
pub struct ListNamespacesResponse {
    pub success: bool,
    pub namespaces: Vec<NamespaceSummary>,
}

#[tracing::instrument(skip(state, request))]
pub async fn list_pods(
    State(state): State<Arc<AppState>>,
    OptionalJson(request): OptionalJson<ListPodsRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let namespace = request
        .namespace
        .filter(|ns| !ns.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
    let cluster = state.cluster.client()?;

    let ns = namespace.as_str();
    let pods = retry_recoverable(
        || async move { cluster.list_pods(ns).await.map_err(AppError::from) },
        &state.cluster.policy,
    )
    .await
    .inspect_err(|e| {
        tracing::error!(namespace = %namespace, error = %e, "Failed to list pods")
    })?;

    Ok(Json(ListPodsResponse {
        success: true,
        pods,
        namespace,
    }))
}

#[tracing::instrument(skip(state))]
pub async fn list_namespaces(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let cluster = state.cluster.client()?;

    let namespaces = retry_recoverable(
        || async move { cluster.list_namespaces().await.map_err(AppError::from) },
        &state.cluster.policy,
    )
    .await
    .inspect_err(|e| tracing::error!(error = %e, "Failed to list namespaces"))?;

    Ok(Json(ListNamespacesResponse {
        success: true,
        namespaces,
    }))
}
