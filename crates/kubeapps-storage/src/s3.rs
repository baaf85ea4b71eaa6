//! Amazon S3 implementation of [`ObjectStore`].

use async_trait::async_trait;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::DateTime as AwsDateTime;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};

use crate::store::{BucketSummary, ObjectListing, ObjectStore, ObjectSummary, StorageError};

/// Attempts made by the SDK itself for each call.
const SDK_MAX_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl std::fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ObjectStore")
            .field("region", &self.client.config().region())
            .finish()
    }
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS credential chain for `region`.
    pub async fn connect(region: &str) -> Self {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(SDK_MAX_ATTEMPTS)
            .with_retry_mode(RetryMode::Adaptive);

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .retry_config(retry_config)
            .load()
            .await;

        Self::new(Client::new(&config))
    }
}

fn to_utc(timestamp: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[tracing::instrument(skip(self))]
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, StorageError> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| StorageError::Request(DisplayErrorContext(&e).to_string()))?;

        Ok(output
            .buckets()
            .iter()
            .map(|bucket| BucketSummary {
                name: bucket.name().unwrap_or_default().to_string(),
                creation_date: bucket.creation_date().and_then(to_utc),
            })
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn list_objects(
        &self,
        bucket: &str,
        max_keys: i32,
    ) -> Result<ObjectListing, StorageError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_bucket()) {
                    StorageError::BucketNotFound(bucket.to_string())
                } else {
                    StorageError::Request(DisplayErrorContext(&e).to_string())
                }
            })?;

        let objects = output
            .contents()
            .iter()
            .map(|object| ObjectSummary {
                key: object.key().unwrap_or_default().to_string(),
                size: object.size().unwrap_or_default().max(0) as u64,
                last_modified: object.last_modified().and_then(to_utc),
                storage_class: object.storage_class().map(|c| c.as_str().to_string()),
            })
            .collect();

        Ok(ObjectListing {
            objects,
            is_truncated: output.is_truncated().unwrap_or(false),
        })
    }
}
