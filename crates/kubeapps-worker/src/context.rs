//! Message handler trait
//!
//! The consumer calls [`MessageHandler::handle`] once per received message. Returning
//! `Ok` acknowledges the message; returning `Err` leaves it on the queue for
//! redelivery. Deliveries are at-least-once, so implementations must be idempotent.

use anyhow::Result;
use async_trait::async_trait;

use crate::queue::{Message, MessageBody};

#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, body: &MessageBody, message: &Message) -> Result<()>;
}

/// Handler that only records each message in the log.
pub struct LoggingHandler;

#[async_trait]
impl MessageHandler for LoggingHandler {
    async fn handle(&self, body: &MessageBody, message: &Message) -> Result<()> {
        match body {
            MessageBody::Json(value) => tracing::info!(
                message_id = %message.message_id,
                body = %value,
                "Processed queue message"
            ),
            MessageBody::Raw(text) => tracing::info!(
                message_id = %message.message_id,
                body = %text,
                raw = true,
                "Processed queue message"
            ),
        }
        Ok(())
    }
}
