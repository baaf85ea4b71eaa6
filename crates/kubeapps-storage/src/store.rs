//! Storage port and listing types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kubeapps_core::AppError;
use serde::Serialize;
use thiserror::Error;

/// Upper bound on keys returned by one object listing.
pub const MAX_LIST_KEYS: i32 = 100;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Bucket {0} not found")]
    BucketNotFound(String),

    #[error("S3 request failed: {0}")]
    Request(String),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::BucketNotFound(_) => AppError::NotFound(err.to_string()),
            StorageError::Request(_) => AppError::UpstreamUnavailable(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSummary {
    pub name: String,
    pub creation_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSummary {
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub storage_class: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectListing {
    pub objects: Vec<ObjectSummary>,
    /// More keys exist past this page.
    pub is_truncated: bool,
}

/// Human-readable size with up to two decimals: `0 Bytes`, `512 Bytes`, `1.5 KB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, StorageError>;

    /// List the first `max_keys` objects of `bucket`.
    async fn list_objects(&self, bucket: &str, max_keys: i32)
        -> Result<ObjectListing, StorageError>;
}
