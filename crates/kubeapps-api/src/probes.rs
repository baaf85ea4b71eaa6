//! Health probes for the services this API depends on.

use async_trait::async_trait;
use kubeapps_cluster::{ClusterApi, ClusterError};
use kubeapps_core::retry::{retry, RetryPolicy};
use kubeapps_core::{Probe, ProbeOutcome};
use serde_json::json;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use sysinfo::{Pid, System};

/// Pings the connection pool, retried with the given policy.
pub struct DatabaseProbe {
    pool: PgPool,
    policy: RetryPolicy,
}

impl DatabaseProbe {
    pub fn new(pool: PgPool, policy: RetryPolicy) -> Self {
        Self { pool, policy }
    }
}

#[async_trait]
impl Probe for DatabaseProbe {
    fn name(&self) -> &str {
        "database"
    }

    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        let pool = &self.pool;
        retry(|| kubeapps_db::ping(pool), &self.policy).await?;
        Ok(ProbeOutcome::healthy())
    }
}

/// Healthy once the shared Kubernetes client was built at startup.
pub struct KubernetesProbe {
    cluster: Option<Arc<dyn ClusterApi>>,
}

impl KubernetesProbe {
    pub fn new(cluster: Option<Arc<dyn ClusterApi>>) -> Self {
        Self { cluster }
    }
}

#[async_trait]
impl Probe for KubernetesProbe {
    fn name(&self) -> &str {
        "kubernetes"
    }

    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        if self.cluster.is_some() {
            Ok(ProbeOutcome::healthy())
        } else {
            Ok(ProbeOutcome::unhealthy(ClusterError::NotConfigured.to_string()))
        }
    }
}

/// Reports process memory usage. Never affects the overall status.
pub struct MemoryProbe {
    system: Mutex<System>,
}

impl MemoryProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn snapshot(&self) -> Option<(u64, u64, u64)> {
        let pid = Pid::from_u32(std::process::id());
        let mut system = self.system.lock().unwrap_or_else(|p| p.into_inner());
        system.refresh_memory();
        system.refresh_process(pid);
        let process = system.process(pid)?;
        Some((process.memory(), process.virtual_memory(), system.total_memory()))
    }
}

impl Default for MemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn to_mb(bytes: u64) -> String {
    format!("{}MB", bytes / 1024 / 1024)
}

#[async_trait]
impl Probe for MemoryProbe {
    fn name(&self) -> &str {
        "memory"
    }

    fn informational(&self) -> bool {
        true
    }

    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        let outcome = match self.snapshot() {
            Some((rss, virtual_memory, total)) => ProbeOutcome::healthy().with_info(json!({
                "rss": to_mb(rss),
                "virtual": to_mb(virtual_memory),
                "systemTotal": to_mb(total),
            })),
            None => ProbeOutcome::healthy(),
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubeapps_core::ProbeStatus;

    struct NoCluster;

    #[async_trait]
    impl ClusterApi for NoCluster {
        async fn list_namespaces(
            &self,
        ) -> Result<Vec<kubeapps_cluster::NamespaceSummary>, ClusterError> {
            Ok(Vec::new())
        }

        async fn list_pods(
            &self,
            _namespace: &str,
        ) -> Result<Vec<kubeapps_cluster::PodSummary>, ClusterError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn built_client_is_healthy() {
        let probe = KubernetesProbe::new(Some(Arc::new(NoCluster)));
        assert_eq!(probe.check().await.unwrap().status, ProbeStatus::Healthy);
    }

    #[tokio::test]
    async fn missing_client_is_unhealthy() {
        let outcome = KubernetesProbe::new(None).check().await.unwrap();
        assert_eq!(outcome.status, ProbeStatus::Unhealthy);
        assert_eq!(outcome.detail.as_deref(), Some("Kubernetes client not configured"));
    }

    #[tokio::test]
    async fn memory_probe_is_informational_and_healthy() {
        let probe = MemoryProbe::new();
        assert!(probe.informational());
        let outcome = probe.check().await.unwrap();
        assert_eq!(outcome.status, ProbeStatus::Healthy);
        if let Some(info) = outcome.info {
            assert!(info["rss"].as_str().unwrap().ends_with("MB"));
        }
    }

    #[test]
    fn megabytes_are_rounded_down() {
        assert_eq!(to_mb(3 * 1024 * 1024 + 10), "3MB");
    }
}
