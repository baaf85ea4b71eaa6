//! Application state shared by all handlers.

use kubeapps_cluster::{ClusterApi, ClusterError};
use kubeapps_core::{HealthAggregator, RetryPolicy};
use kubeapps_db::UserRepository;
use kubeapps_storage::ObjectStore;
use kubeapps_worker::{MessageQueue, QueueConsumer, QueueError};
use std::sync::Arc;
use std::time::Duration;

/// Long-poll wait used by the receive endpoint.
pub const RECEIVE_WAIT: Duration = Duration::from_secs(5);

/// Aggregators behind the three health endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// `/health`: every probe including informational ones.
    pub general: HealthAggregator,
    /// `/health/ready`: dependencies that must be up to serve traffic.
    pub readiness: HealthAggregator,
    /// `/health/live`: the process itself.
    pub liveness: HealthAggregator,
}

/// Queue client and the consumer built on top of it. Both are absent when no queue URL
/// is configured.
#[derive(Clone)]
pub struct QueueState {
    pub queue: Option<Arc<dyn MessageQueue>>,
    pub consumer: Option<Arc<QueueConsumer>>,
    /// Policy for send/receive/delete issued directly by the API.
    pub policy: RetryPolicy,
}

impl QueueState {
    pub fn disabled(policy: RetryPolicy) -> Self {
        Self {
            queue: None,
            consumer: None,
            policy,
        }
    }

    pub fn queue(&self) -> Result<&Arc<dyn MessageQueue>, QueueError> {
        self.queue.as_ref().ok_or(QueueError::NotConfigured)
    }

    pub fn consumer(&self) -> Result<&Arc<QueueConsumer>, QueueError> {
        self.consumer.as_ref().ok_or(QueueError::NotConfigured)
    }
}

/// Kubernetes client, absent when no configuration could be loaded at startup.
#[derive(Clone)]
pub struct ClusterState {
    pub client: Option<Arc<dyn ClusterApi>>,
    pub policy: RetryPolicy,
}

impl ClusterState {
    pub fn client(&self) -> Result<&Arc<dyn ClusterApi>, ClusterError> {
        self.client.as_ref().ok_or(ClusterError::NotConfigured)
    }
}

#[derive(Clone)]
pub struct StorageState {
    pub store: Arc<dyn ObjectStore>,
    pub policy: RetryPolicy,
}

pub struct AppState {
    pub users: UserRepository,
    pub queue: QueueState,
    pub cluster: ClusterState,
    pub storage: StorageState,
    pub health: HealthState,
}
