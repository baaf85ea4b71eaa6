//! In-memory queue for local development and tests.
//!
//! Received messages move to an in-flight set until deleted. There is no visibility
//! timeout; [`InMemoryQueue::requeue_in_flight`] makes abandoned messages visible again.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::queue::{clamp_batch_size, Message, MessageQueue, QueueError};

#[derive(Default)]
struct State {
    next_id: u64,
    visible: VecDeque<Message>,
    /// Keyed by receipt handle; the sequence number records send order.
    in_flight: HashMap<String, (u64, Message)>,
    sequence: HashMap<String, u64>,
    deleted: Vec<String>,
    receive_calls: u32,
    delete_calls: u32,
    receive_failures: u32,
    failing_deletes: HashSet<String>,
}

impl State {
    fn enqueue(&mut self, body: String, attributes: HashMap<String, String>) -> Message {
        self.next_id += 1;
        let id = self.next_id;
        let message = Message {
            message_id: format!("msg-{}", id),
            receipt_handle: format!("receipt-{}", id),
            body,
            attributes,
        };
        self.sequence.insert(message.message_id.clone(), id);
        self.visible.push_back(message.clone());
        message
    }
}

#[derive(Default)]
pub struct InMemoryQueue {
    state: Mutex<State>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Enqueue a message directly and return it as it will be delivered.
    pub fn push(&self, body: impl Into<String>) -> Message {
        self.lock().enqueue(body.into(), HashMap::new())
    }

    /// The next `count` receive calls fail with a transport error.
    pub fn fail_next_receives(&self, count: u32) {
        self.lock().receive_failures = count;
    }

    /// Every delete of `receipt_handle` fails with a transport error.
    pub fn fail_deletes_for(&self, receipt_handle: impl Into<String>) {
        self.lock().failing_deletes.insert(receipt_handle.into());
    }

    /// Make every received-but-undeleted message visible again.
    pub fn requeue_in_flight(&self) {
        let mut state = self.lock();
        let mut abandoned: Vec<(u64, Message)> =
            state.in_flight.drain().map(|(_, entry)| entry).collect();
        abandoned.sort_by_key(|(seq, _)| *seq);
        state.visible.extend(abandoned.into_iter().map(|(_, m)| m));
    }

    /// Receipt handles passed to a successful delete, in order.
    pub fn deleted(&self) -> Vec<String> {
        self.lock().deleted.clone()
    }

    pub fn visible_len(&self) -> usize {
        self.lock().visible.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.lock().in_flight.len()
    }

    pub fn receive_calls(&self) -> u32 {
        self.lock().receive_calls
    }

    pub fn delete_calls(&self) -> u32 {
        self.lock().delete_calls
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn send(
        &self,
        body: String,
        attributes: HashMap<String, String>,
    ) -> Result<String, QueueError> {
        Ok(self.lock().enqueue(body, attributes).message_id)
    }

    async fn receive(
        &self,
        max_messages: u32,
        _wait: Duration,
    ) -> Result<Vec<Message>, QueueError> {
        let mut state = self.lock();
        state.receive_calls += 1;
        if state.receive_failures > 0 {
            state.receive_failures -= 1;
            return Err(QueueError::Receive("connection reset".to_string()));
        }

        let take = (clamp_batch_size(max_messages) as usize).min(state.visible.len());
        let batch: Vec<Message> = state.visible.drain(..take).collect();
        for message in &batch {
            let seq = state.sequence.get(&message.message_id).copied().unwrap_or_default();
            state
                .in_flight
                .insert(message.receipt_handle.clone(), (seq, message.clone()));
        }
        Ok(batch)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        let mut state = self.lock();
        state.delete_calls += 1;
        if state.failing_deletes.contains(receipt_handle) {
            return Err(QueueError::Delete("service unavailable".to_string()));
        }
        let Some((_, message)) = state.in_flight.remove(receipt_handle) else {
            return Err(QueueError::Delete(format!(
                "receipt handle {} is not valid",
                receipt_handle
            )));
        };
        state.sequence.remove(&message.message_id);
        state.deleted.push(receipt_handle.to_string());
        Ok(())
    }
}
