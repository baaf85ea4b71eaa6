//! Queue consumer: receive a batch, hand off each message, acknowledge on success.
//!
//! Per message: `received -> handled ok -> deleted` or `received -> handler error ->
//! abandoned`. Messages in a batch are handled one after another; a handler error is
//! logged and the batch moves on. Receive and delete calls go through the retry
//! executor; exhausting their budget is reported to the caller.
//!
//! Shutdown: [`ConsumerHandle::shutdown`] stops the polling loop between batches. A
//! batch that is already long-polling finishes first.

use kubeapps_core::retry::{retry, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::context::MessageHandler;
use crate::queue::{clamp_batch_size, MessageQueue, QueueError};

#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    /// Long-poll wait passed to each receive call.
    pub wait_time: Duration,
    /// Pause between batches in the background loop.
    pub poll_interval: Duration,
    /// Batch size used by the background loop.
    pub batch_size: u32,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            wait_time: Duration::from_secs(20),
            poll_interval: Duration::from_millis(1000),
            batch_size: 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("receive failed after retries: {0}")]
    Receive(#[source] QueueError),

    #[error("{} of {received} message(s) could not be acknowledged", failed.len())]
    Delete {
        /// Messages received in the batch.
        received: usize,
        /// Ids of handled messages whose delete exhausted its retries.
        failed: Vec<String>,
        #[source]
        source: QueueError,
    },
}

impl ConsumerError {
    /// Messages received before the error, if the receive itself succeeded.
    pub fn received(&self) -> usize {
        match self {
            ConsumerError::Receive(_) => 0,
            ConsumerError::Delete { received, .. } => *received,
        }
    }
}

impl From<ConsumerError> for kubeapps_core::AppError {
    fn from(err: ConsumerError) -> Self {
        match err {
            ConsumerError::Receive(source) => source.into(),
            ConsumerError::Delete { source, .. } => source.into(),
        }
    }
}

pub struct QueueConsumer {
    queue: Arc<dyn MessageQueue>,
    policy: RetryPolicy,
    config: ConsumerConfig,
}

impl QueueConsumer {
    pub fn new(queue: Arc<dyn MessageQueue>, policy: RetryPolicy, config: ConsumerConfig) -> Self {
        Self {
            queue,
            policy,
            config,
        }
    }

    /// Receive up to `max_messages` (clamped to the queue maximum) and process them.
    ///
    /// Returns the number of messages received, regardless of how many handlers
    /// succeeded.
    #[tracing::instrument(skip(self, handler))]
    pub async fn process_batch(
        &self,
        max_messages: u32,
        handler: &dyn MessageHandler,
    ) -> Result<usize, ConsumerError> {
        let batch_size = clamp_batch_size(max_messages);
        let wait = self.config.wait_time;
        let queue = self.queue.as_ref();

        let messages = retry(|| queue.receive(batch_size, wait), &self.policy)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to receive messages");
                ConsumerError::Receive(e)
            })?;

        let received = messages.len();
        if received > 0 {
            tracing::info!(count = received, "Received messages");
        }

        let mut failed_deletes = Vec::new();
        let mut last_delete_error = None;

        for message in &messages {
            let body = message.decode_body();

            if let Err(e) = handler.handle(&body, message).await {
                tracing::error!(
                    message_id = %message.message_id,
                    error = %e,
                    "Message handler failed, leaving message for redelivery"
                );
                continue;
            }

            let receipt_handle = message.receipt_handle.as_str();
            match retry(|| queue.delete(receipt_handle), &self.policy).await {
                Ok(()) => {
                    tracing::debug!(message_id = %message.message_id, "Message deleted");
                }
                Err(e) => {
                    tracing::error!(
                        message_id = %message.message_id,
                        error = %e,
                        "Failed to delete handled message, it may be delivered again"
                    );
                    failed_deletes.push(message.message_id.clone());
                    last_delete_error = Some(e);
                }
            }
        }

        match last_delete_error {
            Some(source) => Err(ConsumerError::Delete {
                received,
                failed: failed_deletes,
                source,
            }),
            None => Ok(received),
        }
    }

    /// Poll until `shutdown_rx` fires or its sender is dropped. Batch errors are logged
    /// and polling continues.
    pub async fn run(&self, handler: Arc<dyn MessageHandler>, mut shutdown_rx: mpsc::Receiver<()>) {
        tracing::info!(
            batch_size = self.config.batch_size,
            wait_time_secs = self.config.wait_time.as_secs(),
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Queue consumer started"
        );

        loop {
            match self
                .process_batch(self.config.batch_size, handler.as_ref())
                .await
            {
                Ok(count) => tracing::trace!(count, "Batch processed"),
                Err(e) => tracing::error!(
                    error = %e,
                    received = e.received(),
                    "Batch processing failed"
                ),
            }

            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        tracing::info!("Queue consumer stopped");
    }

    /// Spawn [`QueueConsumer::run`] on the runtime.
    pub fn spawn(self: Arc<Self>, handler: Arc<dyn MessageHandler>) -> ConsumerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let join = tokio::spawn(async move { self.run(handler, shutdown_rx).await });
        ConsumerHandle { shutdown_tx, join }
    }
}

pub struct ConsumerHandle {
    shutdown_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl ConsumerHandle {
    /// Signal the loop to stop after the current batch and wait for it to exit.
    pub async fn shutdown(self) {
        tracing::info!("Initiating queue consumer shutdown");
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "Queue consumer task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryQueue;
    use crate::queue::{Message, MessageBody};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Fails for bodies listed in `fail_on`, records everything it sees.
    struct RecordingHandler {
        fail_on: Vec<&'static str>,
        seen: Mutex<Vec<MessageBody>>,
    }

    impl RecordingHandler {
        fn failing_on(fail_on: Vec<&'static str>) -> Self {
            Self {
                fail_on,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MessageHandler for RecordingHandler {
        async fn handle(&self, body: &MessageBody, message: &Message) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(body.clone());
            if self.fail_on.contains(&message.body.as_str()) {
                anyhow::bail!("handler rejected {}", message.message_id);
            }
            Ok(())
        }
    }

    fn consumer(queue: Arc<InMemoryQueue>, max_attempts: u32) -> QueueConsumer {
        QueueConsumer::new(
            queue,
            RetryPolicy::default()
                .max_attempts(max_attempts)
                .base_delay(Duration::from_millis(100)),
            ConsumerConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn failed_handler_leaves_message_undeleted() {
        let queue = Arc::new(InMemoryQueue::new());
        let first = queue.push(r#"{"n":1}"#);
        let second = queue.push("second");
        let third = queue.push(r#"{"n":3}"#);
        let handler = RecordingHandler::failing_on(vec!["second"]);

        let count = consumer(queue.clone(), 3)
            .process_batch(10, &handler)
            .await
            .unwrap();

        assert_eq!(count, 3);
        assert_eq!(
            queue.deleted(),
            vec![first.receipt_handle, third.receipt_handle]
        );
        assert!(!queue.deleted().contains(&second.receipt_handle));
        assert_eq!(queue.in_flight_len(), 1);
        assert_eq!(handler.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn undecodable_bodies_reach_handler_raw() {
        let queue = Arc::new(InMemoryQueue::new());
        queue.push("not json");
        queue.push(r#"{"message":"hello"}"#);
        let handler = RecordingHandler::failing_on(vec![]);

        consumer(queue.clone(), 1)
            .process_batch(2, &handler)
            .await
            .unwrap();

        let seen = handler.seen.lock().unwrap().clone();
        assert_eq!(seen[0], MessageBody::Raw("not json".to_string()));
        assert_eq!(seen[1].as_json().unwrap()["message"], "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn batch_size_is_clamped_to_queue_maximum() {
        let queue = Arc::new(InMemoryQueue::new());
        for i in 0..12 {
            queue.push(format!("m{}", i));
        }
        let handler = RecordingHandler::failing_on(vec![]);

        let count = consumer(queue.clone(), 1)
            .process_batch(50, &handler)
            .await
            .unwrap();

        assert_eq!(count, 10);
        assert_eq!(queue.visible_len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_receive_failures_are_retried() {
        let queue = Arc::new(InMemoryQueue::new());
        queue.push("a");
        queue.fail_next_receives(2);
        let handler = RecordingHandler::failing_on(vec![]);

        let count = consumer(queue.clone(), 3)
            .process_batch(1, &handler)
            .await
            .unwrap();

        assert_eq!(count, 1);
        assert_eq!(queue.receive_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn receive_exhaustion_is_surfaced() {
        let queue = Arc::new(InMemoryQueue::new());
        queue.push("a");
        queue.fail_next_receives(5);
        let handler = RecordingHandler::failing_on(vec![]);

        let err = consumer(queue.clone(), 2)
            .process_batch(1, &handler)
            .await
            .unwrap_err();

        assert!(matches!(err, ConsumerError::Receive(QueueError::Receive(_))));
        assert_eq!(queue.receive_calls(), 2);
        assert!(handler.seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn delete_exhaustion_is_reported_after_whole_batch() {
        let queue = Arc::new(InMemoryQueue::new());
        let first = queue.push("a");
        let second = queue.push("b");
        queue.fail_deletes_for(first.receipt_handle.clone());
        let handler = RecordingHandler::failing_on(vec![]);

        let err = consumer(queue.clone(), 3)
            .process_batch(10, &handler)
            .await
            .unwrap_err();

        match err {
            ConsumerError::Delete {
                received, failed, ..
            } => {
                assert_eq!(received, 2);
                assert_eq!(failed, vec![first.message_id]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(queue.deleted(), vec![second.receipt_handle]);
        // 3 attempts for the failing delete, 1 for the successful one
        assert_eq!(queue.delete_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_message_is_handled_again_after_redelivery() {
        let queue = Arc::new(InMemoryQueue::new());
        let first = queue.push("flaky");
        let second = queue.push("steady");
        let consumer = consumer(queue.clone(), 1);

        let failing = RecordingHandler::failing_on(vec!["flaky"]);
        consumer.process_batch(10, &failing).await.unwrap();
        assert_eq!(queue.deleted(), vec![second.receipt_handle.clone()]);

        // Visibility timeout expiry
        queue.requeue_in_flight();

        let recovered = RecordingHandler::failing_on(vec![]);
        let count = consumer.process_batch(10, &recovered).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            queue.deleted(),
            vec![second.receipt_handle, first.receipt_handle]
        );
        assert_eq!(queue.in_flight_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_queue_returns_zero() {
        let queue = Arc::new(InMemoryQueue::new());
        let handler = RecordingHandler::failing_on(vec![]);

        let count = consumer(queue, 1).process_batch(5, &handler).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn background_loop_drains_queue_and_stops_on_shutdown() {
        let queue = Arc::new(InMemoryQueue::new());
        queue.push("a");
        queue.push("b");
        let consumer = Arc::new(consumer(queue.clone(), 1));

        let handle = consumer.spawn(Arc::new(crate::context::LoggingHandler));
        tokio::time::sleep(Duration::from_secs(5)).await;
        handle.shutdown().await;

        assert_eq!(queue.deleted().len(), 2);
        assert_eq!(queue.visible_len(), 0);
    }
}
