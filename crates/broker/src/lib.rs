//! Broker client: the durable work queue between ingress and consumer.
//!
//! The queue is a single named list with head-enqueue / tail-dequeue polarity,
//! which gives FIFO per producer but no total order across concurrent
//! producers. Alongside the list lives one atomic counter that meters
//! envelopes observed by the consumer; it is incremented after a successful
//! dequeue, never reset, and reconciled against the store by the stats view.

use std::time::Duration;

use async_trait::async_trait;

mod in_memory;
mod redis_queue;

pub use in_memory::InMemoryBroker;
pub use redis_queue::RedisBroker;

/// Errors surfaced by broker operations.
///
/// Both variants are transient from the pipeline's point of view: ingress
/// maps them to a 500, the consumer logs and backs off.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("broker connection error: {0}")]
    Connection(String),

    #[error("broker command error: {0}")]
    Command(String),
}

/// Queue + counter operations shared by the HTTP handlers and the consumer.
///
/// Implementations must be safe for concurrent use from multiple tasks; the
/// ingress handlers and the consumer share one client.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Push one envelope onto the head of the queue.
    async fn enqueue(&self, envelope: &str) -> Result<(), BrokerError>;

    /// Push envelopes in order via a single pipelined round-trip.
    ///
    /// Either the whole batch is sent or the call fails; callers validate
    /// before enqueueing so a failure here never leaves a half-validated
    /// batch behind.
    async fn enqueue_batch(&self, envelopes: &[String]) -> Result<(), BrokerError>;

    /// Pop from the tail of the queue, blocking up to `timeout`.
    ///
    /// Returns `None` on timeout so the caller periodically reacquires
    /// control for shutdown and error recovery.
    async fn blocking_pop(&self, timeout: Duration) -> Result<Option<String>, BrokerError>;

    /// Atomically increment the received-count meter; returns the
    /// post-increment value.
    async fn increment_received(&self) -> Result<u64, BrokerError>;

    /// Read the received-count meter (zero if never incremented).
    async fn received_count(&self) -> Result<u64, BrokerError>;
}
