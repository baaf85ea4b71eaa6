//! Cluster port and the summaries returned to API callers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{ContainerStatus, Namespace, Pod, PodCondition};
use kubeapps_core::AppError;
use serde::Serialize;
use thiserror::Error;

/// Namespace used when a pod listing names none.
pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Kubernetes client not configured")]
    NotConfigured,

    #[error("Failed to load Kubernetes config: {0}")]
    Config(String),

    #[error("Kubernetes API request failed: {0}")]
    Api(String),
}

impl From<ClusterError> for AppError {
    fn from(err: ClusterError) -> Self {
        match err {
            ClusterError::NotConfigured | ClusterError::Config(_) => {
                AppError::NotConfigured(err.to_string())
            }
            ClusterError::Api(_) => AppError::UpstreamUnavailable(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceSummary {
    pub name: String,
    pub status: Option<String>,
}

impl NamespaceSummary {
    pub fn from_namespace(namespace: &Namespace) -> Self {
        Self {
            name: namespace.metadata.name.clone().unwrap_or_default(),
            status: namespace.status.as_ref().and_then(|s| s.phase.clone()),
        }
    }
}

/// One row of a pod listing, shaped like `kubectl get pods`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodSummary {
    pub name: String,
    pub namespace: String,
    pub status: Option<String>,
    /// `ready/total` containers.
    pub ready: String,
    pub restarts: i32,
    pub age: Option<String>,
    pub conditions: Vec<PodCondition>,
}

impl PodSummary {
    pub fn from_pod(pod: &Pod, now: DateTime<Utc>) -> Self {
        let status = pod.status.as_ref();
        let containers = status
            .and_then(|s| s.container_statuses.as_deref())
            .unwrap_or_default();

        Self {
            name: pod.metadata.name.clone().unwrap_or_default(),
            namespace: pod.metadata.namespace.clone().unwrap_or_default(),
            status: status.and_then(|s| s.phase.clone()),
            ready: pod_readiness(containers),
            restarts: pod_restarts(containers),
            age: pod
                .metadata
                .creation_timestamp
                .as_ref()
                .map(|created| format_age(created.0, now)),
            conditions: status
                .and_then(|s| s.conditions.clone())
                .unwrap_or_default(),
        }
    }
}

pub fn pod_readiness(containers: &[ContainerStatus]) -> String {
    let ready = containers.iter().filter(|c| c.ready).count();
    format!("{}/{}", ready, containers.len())
}

pub fn pod_restarts(containers: &[ContainerStatus]) -> i32 {
    containers.iter().map(|c| c.restart_count).sum()
}

/// Compact age: `3d4h`, `5h12m` or `7m`.
pub fn format_age(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - created).num_minutes().max(0);
    let days = minutes / (24 * 60);
    let hours = (minutes % (24 * 60)) / 60;
    let minutes = minutes % 60;

    if days > 0 {
        format!("{}d{}h", days, hours)
    } else if hours > 0 {
        format!("{}h{}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Cluster reads used by the API. Implementations are shared across requests.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<NamespaceSummary>, ClusterError>;

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodSummary>, ClusterError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use k8s_openapi::api::core::v1::{NamespaceStatus, PodStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
    use kubeapps_core::ErrorMetadata;

    fn container(ready: bool, restarts: i32) -> ContainerStatus {
        ContainerStatus {
            name: "app".to_string(),
            ready,
            restart_count: restarts,
            ..Default::default()
        }
    }

    #[test]
    fn readiness_counts_ready_containers() {
        let containers = [container(true, 0), container(false, 0), container(true, 0)];
        assert_eq!(pod_readiness(&containers), "2/3");
        assert_eq!(pod_readiness(&[]), "0/0");
    }

    #[test]
    fn restarts_are_summed() {
        let containers = [container(true, 2), container(true, 5)];
        assert_eq!(pod_restarts(&containers), 7);
        assert_eq!(pod_restarts(&[]), 0);
    }

    #[test]
    fn age_uses_two_largest_units() {
        let now = Utc::now();
        let age = |d: Duration| format_age(now - d, now);

        assert_eq!(age(Duration::days(3) + Duration::hours(4)), "3d4h");
        assert_eq!(age(Duration::hours(5) + Duration::minutes(12)), "5h12m");
        assert_eq!(age(Duration::minutes(7) + Duration::seconds(59)), "7m");
        assert_eq!(age(Duration::seconds(-30)), "0m");
    }

    #[test]
    fn pod_summary_reads_metadata_and_status() {
        let now = Utc::now();
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("web-7d9f".to_string()),
                namespace: Some("apps".to_string()),
                creation_timestamp: Some(Time(now - Duration::hours(2))),
                ..Default::default()
            },
            status: Some(PodStatus {
                phase: Some("Running".to_string()),
                container_statuses: Some(vec![container(true, 1), container(false, 2)]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let summary = PodSummary::from_pod(&pod, now);
        assert_eq!(summary.name, "web-7d9f");
        assert_eq!(summary.namespace, "apps");
        assert_eq!(summary.status.as_deref(), Some("Running"));
        assert_eq!(summary.ready, "1/2");
        assert_eq!(summary.restarts, 3);
        assert_eq!(summary.age.as_deref(), Some("2h0m"));
        assert!(summary.conditions.is_empty());
    }

    #[test]
    fn pending_pod_without_status_is_empty() {
        let summary = PodSummary::from_pod(&Pod::default(), Utc::now());
        assert_eq!(summary.ready, "0/0");
        assert_eq!(summary.restarts, 0);
        assert!(summary.status.is_none());
        assert!(summary.age.is_none());
    }

    #[test]
    fn namespace_summary_serializes_phase() {
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some("kube-system".to_string()),
                ..Default::default()
            },
            status: Some(NamespaceStatus {
                phase: Some("Active".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let json = serde_json::to_value(NamespaceSummary::from_namespace(&namespace)).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "kube-system", "status": "Active" }));
    }

    #[test]
    fn cluster_errors_map_to_app_errors() {
        let err = AppError::from(ClusterError::NotConfigured);
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.client_message(), "Kubernetes client not configured");
        assert!(!err.is_recoverable());

        let err = AppError::from(ClusterError::Api("connection refused".into()));
        assert_eq!(err.http_status_code(), 503);
        assert!(err.is_recoverable());
    }
}
