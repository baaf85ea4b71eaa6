//! Configuration module
//!
//! Settings are read once at process start from the environment (after loading an
//! optional `.env` file). Retry policies for each integration are derived from here.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

const SERVER_PORT: u16 = 3000;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 60;
const DEFAULT_AWS_REGION: &str = "eu-central-1";
/// Long-poll wait used by the background consumer.
const SQS_WAIT_TIME_SECS: u64 = 20;
/// SQS does not accept long-poll waits above 20 seconds.
const SQS_MAX_WAIT_TIME_SECS: u64 = 20;
const SQS_CONSUMER_INTERVAL_MS: u64 = 1000;
const RETRY_MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 1000;
const RETRY_BACKOFF_MULTIPLIER: f64 = 2.0;
const DB_RETRY_BASE_DELAY_MS: u64 = 500;
const HEALTH_READY_MAX_ATTEMPTS: u32 = 1;
const HEALTH_PROBE_TIMEOUT_SECS: u64 = 5;

/// Queue settings. `queue_url` is optional: the service starts without it and the
/// queue endpoints report the missing configuration.
#[derive(Clone, Debug)]
pub struct QueueConfig {
    pub queue_url: Option<String>,
    pub wait_time_seconds: u64,
    pub consumer_enabled: bool,
    pub consumer_interval_ms: u64,
}

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub db_base_delay_ms: u64,
    pub health_ready_max_attempts: u32,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Region shared by the SQS and S3 clients.
    pub aws_region: String,
    pub kubeconfig: Option<PathBuf>,
    pub health_probe_timeout_secs: u64,
    pub queue: QueueConfig,
    pub retry: RetryConfig,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .or_else(|_| env::var("NODE_ENV"))
            .unwrap_or_else(|_| "production".to_string());

        let server_port = match env::var("PORT") {
            Ok(port) => port
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            Err(_) => SERVER_PORT,
        };

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let queue = QueueConfig {
            queue_url: env::var("SQS_QUEUE_URL").ok().filter(|s| !s.trim().is_empty()),
            wait_time_seconds: env_or("SQS_WAIT_TIME_SECONDS", SQS_WAIT_TIME_SECS)
                .min(SQS_MAX_WAIT_TIME_SECS),
            consumer_enabled: env_flag("SQS_CONSUMER_ENABLED"),
            consumer_interval_ms: env_or("SQS_CONSUMER_INTERVAL_MS", SQS_CONSUMER_INTERVAL_MS),
        };

        let retry = RetryConfig {
            max_attempts: env_or("RETRY_MAX_ATTEMPTS", RETRY_MAX_ATTEMPTS).max(1),
            base_delay_ms: env_or("RETRY_BASE_DELAY_MS", RETRY_BASE_DELAY_MS),
            backoff_multiplier: env_or("RETRY_BACKOFF_MULTIPLIER", RETRY_BACKOFF_MULTIPLIER),
            db_base_delay_ms: env_or("DB_RETRY_BASE_DELAY_MS", DB_RETRY_BASE_DELAY_MS),
            health_ready_max_attempts: env_or(
                "HEALTH_READY_MAX_ATTEMPTS",
                HEALTH_READY_MAX_ATTEMPTS,
            )
            .max(1),
        };

        Ok(Config {
            server_port,
            environment,
            cors_origins,
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_AWS_REGION.to_string()),
            kubeconfig: env::var("KUBECONFIG").ok().map(PathBuf::from),
            health_probe_timeout_secs: env_or(
                "HEALTH_PROBE_TIMEOUT_SECS",
                HEALTH_PROBE_TIMEOUT_SECS,
            ),
            queue,
            retry,
        })
    }

    /// Development-like environments expose error details to clients.
    pub fn is_development(&self) -> bool {
        is_development_env(&self.environment)
    }

    pub fn health_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.health_probe_timeout_secs)
    }

    /// Policy for queue and other remote calls.
    pub fn remote_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .max_attempts(self.retry.max_attempts)
            .base_delay(Duration::from_millis(self.retry.base_delay_ms))
            .backoff_multiplier(self.retry.backoff_multiplier)
    }

    /// Policy for database queries.
    pub fn db_retry_policy(&self) -> RetryPolicy {
        self.remote_retry_policy()
            .base_delay(Duration::from_millis(self.retry.db_base_delay_ms))
    }

    /// Policy for dependency checks behind the readiness endpoint.
    pub fn readiness_retry_policy(&self) -> RetryPolicy {
        self.db_retry_policy()
            .max_attempts(self.retry.health_ready_max_attempts)
    }
}

pub fn is_development_env(environment: &str) -> bool {
    matches!(
        environment.trim().to_lowercase().as_str(),
        "development" | "dev" | "local"
    )
}
