//! Queue handlers: send, peek, acknowledge and drain messages.
//!
//! Every queue call goes through the retry executor with the queue policy. When no
//! queue URL is configured each route answers 500 `SQS_QUEUE_URL not configured`.

use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use chrono::{SecondsFormat, Utc};
use kubeapps_core::retry::retry;
use kubeapps_core::AppError;
use kubeapps_worker::{LoggingHandler, Message, MessageBody, MAX_RECEIVE_BATCH};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{HttpAppError, OptionalJson, ValidatedJson};
use crate::state::{AppState, RECEIVE_WAIT};

/// Value of the `source` field in every message body sent from this API.
pub const MESSAGE_SOURCE: &str = "web-app";

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessageRequest {
    #[serde(default)]
    pub receipt_handle: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMessagesRequest {
    #[serde(default)]
    pub max_messages: Option<u32>,
}

/// Body written to the queue.
#[derive(Debug, Serialize)]
struct OutgoingMessage<'a> {
    message: &'a str,
    timestamp: &'a str,
    source: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub success: bool,
    pub message_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: MessageBody,
    pub attributes: HashMap<String, String>,
}

impl From<Message> for ReceivedMessage {
    fn from(message: Message) -> Self {
        Self {
            body: message.decode_body(),
            message_id: message.message_id,
            receipt_handle: message.receipt_handle,
            attributes: message.attributes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReceiveMessagesResponse {
    pub success: bool,
    pub messages: Vec<ReceivedMessage>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ProcessMessagesResponse {
    pub success: bool,
    pub processed: usize,
}

pub(crate) fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Validation(message.to_string()))
}

#[tracing::instrument(skip(state, request))]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SendMessageRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let queue = state.queue.queue()?;
    let message = required(request.message, "Message is required")?;

    let sent_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let body = serde_json::to_string(&OutgoingMessage {
        message: &message,
        timestamp: &sent_at,
        source: MESSAGE_SOURCE,
    })
    .map_err(AppError::from)?;
    let attributes = HashMap::from([("SentAt".to_string(), sent_at)]);

    let message_id = retry(
        || queue.send(body.clone(), attributes.clone()),
        &state.queue.policy,
    )
    .await
    .inspect_err(|e| tracing::error!(error = %e, "Failed to send queue message"))?;

    tracing::info!(message_id = %message_id, "Queue message sent");

    Ok(Json(SendMessageResponse {
        success: true,
        message_id,
        message,
    }))
}

/// Peek at up to ten messages without acknowledging them.
#[tracing::instrument(skip(state))]
pub async fn receive_messages(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let queue = state.queue.queue()?;

    let messages = retry(
        || queue.receive(MAX_RECEIVE_BATCH, RECEIVE_WAIT),
        &state.queue.policy,
    )
    .await
    .inspect_err(|e| tracing::error!(error = %e, "Failed to receive queue messages"))?;

    let messages: Vec<ReceivedMessage> = messages.into_iter().map(Into::into).collect();

    Ok(Json(ReceiveMessagesResponse {
        success: true,
        count: messages.len(),
        messages,
    }))
}

#[tracing::instrument(skip(state, request))]
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<DeleteMessageRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let queue = state.queue.queue()?;
    let receipt_handle = required(request.receipt_handle, "Receipt handle is required")?;

    retry(|| queue.delete(&receipt_handle), &state.queue.policy)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to delete queue message"))?;

    Ok(Json(super::users::MessageResponse {
        success: true,
        message: "Message deleted successfully",
    }))
}

/// Run one consumer batch with the logging handler. The body is optional.
#[tracing::instrument(skip(state, request))]
pub async fn process_messages(
    State(state): State<Arc<AppState>>,
    OptionalJson(request): OptionalJson<ProcessMessagesRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let consumer = state.queue.consumer()?;

    let processed = consumer
        .process_batch(request.max_messages.unwrap_or(1), &LoggingHandler)
        .await?;

    Ok(Json(ProcessMessagesResponse {
        success: true,
        processed,
    }))
}
