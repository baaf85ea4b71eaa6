//! Message queue consumption for kubeapps.
//!
//! [`QueueConsumer`] pulls batches from a [`MessageQueue`], hands each message to a
//! [`MessageHandler`] and deletes it only when the handler succeeded. Abandoned
//! messages become visible again once the queue's visibility timeout expires; that is
//! the only redelivery mechanism.

pub mod consumer;
pub mod context;
pub mod memory;
pub mod queue;
pub mod sqs;

pub use consumer::{ConsumerConfig, ConsumerError, ConsumerHandle, QueueConsumer};
pub use context::{LoggingHandler, MessageHandler};
pub use memory::InMemoryQueue;
pub use queue::{
    clamp_batch_size, Message, MessageBody, MessageQueue, QueueError, MAX_RECEIVE_BATCH,
};
pub use sqs::SqsQueue;
