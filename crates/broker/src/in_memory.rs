//! In-memory broker for dev/test wiring.
//!
//! Same queue discipline as the Redis list (FIFO, blocking pop with a bounded
//! timeout, monotone counter) without the external process. The API black-box
//! tests run the full pipeline against this implementation.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::{Broker, BrokerError};

#[derive(Debug, Default)]
pub struct InMemoryBroker {
    queue: Mutex<VecDeque<String>>,
    notify: Notify,
    received: AtomicU64,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of envelopes currently waiting in the queue.
    pub fn depth(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn enqueue(&self, envelope: &str) -> Result<(), BrokerError> {
        self.queue.lock().unwrap().push_back(envelope.to_string());
        self.notify.notify_one();
        Ok(())
    }

    async fn enqueue_batch(&self, envelopes: &[String]) -> Result<(), BrokerError> {
        {
            let mut queue = self.queue.lock().unwrap();
            queue.extend(envelopes.iter().cloned());
        }
        self.notify.notify_one();
        Ok(())
    }

    async fn blocking_pop(&self, timeout: Duration) -> Result<Option<String>, BrokerError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(envelope) = self.queue.lock().unwrap().pop_front() {
                return Ok(Some(envelope));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            // Woken on enqueue; re-check the queue, the item may have been
            // taken by another consumer in the meantime.
            if tokio::time::timeout(remaining, self.notify.notified())
                .await
                .is_err()
            {
                return Ok(None);
            }
        }
    }

    async fn increment_received(&self) -> Result<u64, BrokerError> {
        Ok(self.received.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn received_count(&self) -> Result<u64, BrokerError> {
        Ok(self.received.load(Ordering::SeqCst))
    }
}
