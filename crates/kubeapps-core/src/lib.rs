//! kubeapps core library
//!
//! Error types, configuration, the retry executor wrapped around every remote call,
//! and the health aggregation used by the liveness/readiness endpoints.

pub mod config;
pub mod error;
pub mod health;
pub mod models;
pub mod retry;

pub use config::{Config, QueueConfig, RetryConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use health::{
    HealthAggregator, HealthReport, LivenessProbe, OverallStatus, Probe, ProbeOutcome,
    ProbeResult, ProbeStatus,
};
pub use retry::{retry, retry_recoverable, RetryEvent, RetryPolicy};
