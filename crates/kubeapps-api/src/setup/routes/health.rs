//! Health check handlers.
//!
//! Each endpoint evaluates its own aggregator and maps `ok` to 200 and `degraded` to 503.

use crate::state::AppState;
use axum::{http::StatusCode, response::IntoResponse, Json};
use kubeapps_core::{HealthReport, ProbeResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub(super) struct StatusResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub(super) struct ReadinessResponse {
    pub status: &'static str,
    pub checks: BTreeMap<String, ProbeResult>,
}

fn status_code(report: &HealthReport) -> StatusCode {
    if report.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Full report: every probe plus informational ones.
pub async fn health_check(state: Arc<AppState>) -> impl IntoResponse {
    let report = state.health.general.aggregate().await;
    (status_code(&report), Json(report))
}

/// Liveness probe - process is running.
pub async fn liveness_check(state: Arc<AppState>) -> impl IntoResponse {
    let report = state.health.liveness.aggregate().await;
    let status = if report.is_ok() { "alive" } else { "dead" };
    (status_code(&report), Json(StatusResponse { status }))
}

/// Readiness probe - dependencies required to serve traffic.
pub async fn readiness_check(state: Arc<AppState>) -> impl IntoResponse {
    let report = state.health.readiness.aggregate().await;
    let code = status_code(&report);
    if !report.is_ok() {
        tracing::warn!(
            failing = ?report
                .checks
                .iter()
                .filter(|(_, r)| !r.is_healthy())
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>(),
            "Readiness check failed"
        );
    }
    let status = if report.is_ok() { "ready" } else { "not ready" };
    (
        code,
        Json(ReadinessResponse {
            status,
            checks: report.checks,
        }),
    )
}
