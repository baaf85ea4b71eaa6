//! Composite health aggregation.
//!
//! A fixed set of independent [`Probe`]s is evaluated on every call to
//! [`HealthAggregator::aggregate`]. Probes run concurrently, each under its own timeout,
//! and a failing or hanging probe never prevents the others from being reported. The
//! overall verdict is `degraded` when any non-informational probe is unhealthy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default timeout applied to each probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Ok,
    Degraded,
}

/// What a probe reports when it completes without error.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub status: ProbeStatus,
    pub detail: Option<String>,
    pub info: Option<serde_json::Value>,
}

impl ProbeOutcome {
    pub fn healthy() -> Self {
        Self {
            status: ProbeStatus::Healthy,
            detail: None,
            info: None,
        }
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Unhealthy,
            detail: Some(detail.into()),
            info: None,
        }
    }

    pub fn with_info(mut self, info: serde_json::Value) -> Self {
        self.info = Some(info);
        self
    }
}

/// A single subsystem check.
#[async_trait]
pub trait Probe: Send + Sync {
    fn name(&self) -> &str;

    /// Run the check. An `Err` is reported exactly like an unhealthy outcome, with the
    /// error message as detail.
    async fn check(&self) -> anyhow::Result<ProbeOutcome>;

    /// Informational probes are reported but never affect the overall status.
    fn informational(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    #[serde(skip)]
    pub name: String,
    pub status: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub info: Option<serde_json::Value>,
}

impl ProbeResult {
    pub fn is_healthy(&self) -> bool {
        self.status == ProbeStatus::Healthy
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: OverallStatus,
    pub timestamp: DateTime<Utc>,
    pub uptime: f64,
    pub checks: BTreeMap<String, ProbeResult>,
}

impl HealthReport {
    pub fn is_ok(&self) -> bool {
        self.status == OverallStatus::Ok
    }
}

/// Evaluates a fixed, ordered set of probes.
#[derive(Clone)]
pub struct HealthAggregator {
    probes: Vec<Arc<dyn Probe>>,
    probe_timeout: Duration,
    started_at: Instant,
}

impl HealthAggregator {
    pub fn new(probes: Vec<Arc<dyn Probe>>) -> Self {
        Self {
            probes,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            started_at: Instant::now(),
        }
    }

    pub fn with_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    /// Process start time used for the reported uptime.
    pub fn with_started_at(mut self, started_at: Instant) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn probe_names(&self) -> Vec<&str> {
        self.probes.iter().map(|p| p.name()).collect()
    }

    /// Run every probe and merge the results. Always returns a report, even when every
    /// probe fails.
    pub async fn aggregate(&self) -> HealthReport {
        let timeout = self.probe_timeout;
        let results = futures::future::join_all(
            self.probes
                .iter()
                .map(|probe| run_probe(probe.as_ref(), timeout)),
        )
        .await;

        let degraded = self
            .probes
            .iter()
            .zip(&results)
            .any(|(probe, result)| !probe.informational() && !result.is_healthy());

        let checks = results
            .into_iter()
            .map(|result| (result.name.clone(), result))
            .collect();

        HealthReport {
            status: if degraded {
                OverallStatus::Degraded
            } else {
                OverallStatus::Ok
            },
            timestamp: Utc::now(),
            uptime: self.started_at.elapsed().as_secs_f64(),
            checks,
        }
    }
}

async fn run_probe(probe: &dyn Probe, timeout: Duration) -> ProbeResult {
    let name = probe.name().to_string();
    let outcome = match tokio::time::timeout(timeout, probe.check()).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            tracing::error!(probe = %name, error = %e, "Health probe failed");
            ProbeOutcome::unhealthy(e.to_string())
        }
        Err(_) => {
            tracing::error!(
                probe = %name,
                timeout_ms = timeout.as_millis() as u64,
                "Health probe timed out"
            );
            ProbeOutcome::unhealthy("timeout")
        }
    };

    if outcome.status == ProbeStatus::Unhealthy {
        tracing::warn!(probe = %name, detail = ?outcome.detail, "Health probe reported unhealthy");
    }

    ProbeResult {
        name,
        status: outcome.status,
        error: outcome.detail,
        info: outcome.info,
    }
}

/// Probe that is healthy whenever the process can answer.
pub struct LivenessProbe;

#[async_trait]
impl Probe for LivenessProbe {
    fn name(&self) -> &str {
        "process"
    }

    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        Ok(ProbeOutcome::healthy())
    }
}
