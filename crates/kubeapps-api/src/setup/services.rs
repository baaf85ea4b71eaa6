//! Builds repositories, the queue, cluster and storage clients, health aggregators and
//! the background consumer.

use crate::probes::{DatabaseProbe, KubernetesProbe, MemoryProbe};
use crate::state::{AppState, ClusterState, HealthState, QueueState, StorageState};
use anyhow::Result;
use kubeapps_cluster::{ClusterApi, KubeCluster};
use kubeapps_core::{Config, HealthAggregator, LivenessProbe, Probe};
use kubeapps_db::UserRepository;
use kubeapps_storage::{ObjectStore, S3ObjectStore};
use kubeapps_worker::{
    ConsumerConfig, ConsumerHandle, LoggingHandler, MessageQueue, QueueConsumer, SqsQueue,
    MAX_RECEIVE_BATCH,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct Services {
    pub state: Arc<AppState>,
    pub consumer: Option<ConsumerHandle>,
}

pub async fn initialize_services(config: &Config, pool: PgPool) -> Result<Services> {
    let started_at = Instant::now();

    let users = UserRepository::new(pool.clone(), config.db_retry_policy());

    let database: Arc<dyn Probe> =
        Arc::new(DatabaseProbe::new(pool, config.readiness_retry_policy()));
    let cluster = setup_cluster(config).await;
    let kubernetes: Arc<dyn Probe> = Arc::new(KubernetesProbe::new(cluster.clone()));
    let health = build_health_state(
        vec![database, kubernetes],
        Arc::new(MemoryProbe::new()),
        config.health_probe_timeout(),
        started_at,
    );
    tracing::info!(
        probes = ?health.general.probe_names(),
        readiness = ?health.readiness.probe_names(),
        "Health probes registered"
    );

    let storage: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::connect(&config.aws_region).await);
    tracing::info!(region = %config.aws_region, "S3 client initialized");

    let (queue, consumer) = setup_queue(config).await;
    let handle = match (&consumer, config.queue.consumer_enabled) {
        (Some(consumer), true) => Some(consumer.clone().spawn(Arc::new(LoggingHandler))),
        (None, true) => {
            tracing::warn!(
                "SQS_CONSUMER_ENABLED is set but SQS_QUEUE_URL is not, consumer not started"
            );
            None
        }
        _ => None,
    };

    let state = Arc::new(AppState {
        users,
        queue: QueueState {
            queue,
            consumer,
            policy: config.remote_retry_policy(),
        },
        cluster: ClusterState {
            client: cluster,
            policy: config.remote_retry_policy(),
        },
        storage: StorageState {
            store: storage,
            policy: config.remote_retry_policy(),
        },
        health,
    });

    Ok(Services {
        state,
        consumer: handle,
    })
}

/// Readiness runs `dependencies`; the general report adds `informational` on top.
pub fn build_health_state(
    dependencies: Vec<Arc<dyn Probe>>,
    informational: Arc<dyn Probe>,
    probe_timeout: Duration,
    started_at: Instant,
) -> HealthState {
    let liveness: Arc<dyn Probe> = Arc::new(LivenessProbe);
    let mut general_probes = dependencies.clone();
    general_probes.push(informational);

    HealthState {
        general: HealthAggregator::new(general_probes)
            .with_timeout(probe_timeout)
            .with_started_at(started_at),
        readiness: HealthAggregator::new(dependencies)
            .with_timeout(probe_timeout)
            .with_started_at(started_at),
        liveness: HealthAggregator::new(vec![liveness])
            .with_timeout(probe_timeout)
            .with_started_at(started_at),
    }
}

/// A missing or unreadable configuration leaves the cluster routes answering
/// `Kubernetes client not configured` and the readiness check failing.
async fn setup_cluster(config: &Config) -> Option<Arc<dyn ClusterApi>> {
    match KubeCluster::connect(config.kubeconfig.as_deref()).await {
        Ok(cluster) => {
            tracing::info!(
                kubeconfig = ?config.kubeconfig,
                "Kubernetes client configured successfully"
            );
            let cluster: Arc<dyn ClusterApi> = Arc::new(cluster);
            Some(cluster)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load Kubernetes config");
            None
        }
    }
}

async fn setup_queue(
    config: &Config,
) -> (Option<Arc<dyn MessageQueue>>, Option<Arc<QueueConsumer>>) {
    let Some(queue_url) = config.queue.queue_url.as_deref() else {
        tracing::info!("SQS_QUEUE_URL not set, queue routes disabled");
        return (None, None);
    };

    let queue: Arc<dyn MessageQueue> =
        Arc::new(SqsQueue::connect(&config.aws_region, queue_url).await);
    tracing::info!(
        queue_url = %queue_url,
        region = %config.aws_region,
        "SQS client initialized"
    );

    let consumer = QueueConsumer::new(
        queue.clone(),
        config.remote_retry_policy(),
        ConsumerConfig {
            wait_time: Duration::from_secs(config.queue.wait_time_seconds),
            poll_interval: Duration::from_millis(config.queue.consumer_interval_ms),
            batch_size: MAX_RECEIVE_BATCH,
        },
    );

    (Some(queue), Some(Arc::new(consumer)))
}
