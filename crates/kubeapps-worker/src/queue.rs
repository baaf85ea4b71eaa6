//! Queue port and message types.

use async_trait::async_trait;
use kubeapps_core::AppError;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Largest batch a single receive call may return.
pub const MAX_RECEIVE_BATCH: u32 = 10;

/// Clamp a requested batch size into `1..=MAX_RECEIVE_BATCH`.
pub fn clamp_batch_size(requested: u32) -> u32 {
    requested.clamp(1, MAX_RECEIVE_BATCH)
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("SQS_QUEUE_URL not configured")]
    NotConfigured,

    #[error("Failed to send message: {0}")]
    Send(String),

    #[error("Failed to receive messages: {0}")]
    Receive(String),

    #[error("Failed to delete message: {0}")]
    Delete(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::NotConfigured => AppError::NotConfigured(err.to_string()),
            QueueError::InvalidMessage(msg) => AppError::Validation(msg),
            other => AppError::UpstreamUnavailable(other.to_string()),
        }
    }
}

/// A received delivery of a queue message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub message_id: String,
    /// Single-use token for deleting this delivery.
    pub receipt_handle: String,
    pub body: String,
    pub attributes: HashMap<String, String>,
}

impl Message {
    pub fn decode_body(&self) -> MessageBody {
        MessageBody::decode(&self.body)
    }
}

/// Message payload after best-effort JSON decoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageBody {
    Json(serde_json::Value),
    Raw(String),
}

impl MessageBody {
    /// Parse `body` as JSON, falling back to the raw text when it is not valid JSON.
    pub fn decode(body: &str) -> Self {
        match serde_json::from_str(body) {
            Ok(value) => MessageBody::Json(value),
            Err(_) => MessageBody::Raw(body.to_string()),
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            MessageBody::Json(value) => Some(value),
            MessageBody::Raw(_) => None,
        }
    }
}

/// Queue operations consumed by the API and the consumer. Implementations own their
/// transport client and are shared across tasks.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueue `body` with string attributes; returns the assigned message id.
    async fn send(
        &self,
        body: String,
        attributes: HashMap<String, String>,
    ) -> Result<String, QueueError>;

    /// Receive up to `max_messages`, long-polling for at most `wait`.
    async fn receive(&self, max_messages: u32, wait: Duration)
        -> Result<Vec<Message>, QueueError>;

    /// Acknowledge a delivery.
    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubeapps_core::ErrorMetadata;

    #[test]
    fn json_bodies_are_decoded() {
        let body = MessageBody::decode(r#"{"message":"hi","source":"web-app"}"#);
        assert_eq!(body.as_json().unwrap()["source"], "web-app");
    }

    #[test]
    fn invalid_json_falls_back_to_raw() {
        let body = MessageBody::decode("plain text {");
        assert_eq!(body, MessageBody::Raw("plain text {".to_string()));
        assert!(body.as_json().is_none());
    }

    #[test]
    fn batch_size_is_clamped() {
        assert_eq!(clamp_batch_size(0), 1);
        assert_eq!(clamp_batch_size(5), 5);
        assert_eq!(clamp_batch_size(50), MAX_RECEIVE_BATCH);
    }

    #[test]
    fn queue_errors_map_to_app_errors() {
        assert_eq!(AppError::from(QueueError::NotConfigured).http_status_code(), 500);
        let transport = AppError::from(QueueError::Receive("timeout".into()));
        assert_eq!(transport.http_status_code(), 503);
        assert!(transport.is_recoverable());
    }

    #[test]
    fn untagged_body_serializes_inline() {
        let raw = serde_json::to_value(MessageBody::Raw("x".into())).unwrap();
        assert_eq!(raw, serde_json::json!("x"));
        let json = serde_json::to_value(MessageBody::decode(r#"{"a":1}"#)).unwrap();
        assert_eq!(json, serde_json::json!({"a": 1}));
    }
}
