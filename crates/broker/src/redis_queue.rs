//! Redis-backed list queue (LPUSH/BRPOP) with an INCR-only counter.
//!
//! Wire contract:
//! - Queue list key: `event_queue`. Enqueue = LPUSH, dequeue = BRPOP.
//! - Counter key: `stats:received_count`. INCR-only, never expired or reset.
//!
//! The list has no ack semantics: an envelope popped by a consumer that
//! crashes before committing is lost. That at-most-once-post-dequeue window
//! is an accepted property of the pipeline and shows up as a slightly
//! inflated duplicate estimate in the stats view.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use crate::{Broker, BrokerError};

/// Default queue list key.
const DEFAULT_QUEUE_KEY: &str = "event_queue";

/// Default received-counter key.
const DEFAULT_COUNTER_KEY: &str = "stats:received_count";

/// Redis list-queue client.
///
/// Holds a multiplexed connection manager that reconnects on failure and is
/// cheap to clone, so one `RedisBroker` is shared between every HTTP handler
/// and the consumer task.
#[derive(Clone)]
pub struct RedisBroker {
    conn: ConnectionManager,
    queue_key: String,
    counter_key: String,
}

impl RedisBroker {
    /// Connect to the broker.
    ///
    /// # Arguments
    ///
    /// * `broker_url` - Redis connection URL (e.g. "redis://broker:6379/0")
    /// * `queue_key` - queue list key (default: "event_queue")
    /// * `counter_key` - received-counter key (default: "stats:received_count")
    pub async fn connect(
        broker_url: impl AsRef<str>,
        queue_key: Option<String>,
        counter_key: Option<String>,
    ) -> Result<Self, BrokerError> {
        let client = redis::Client::open(broker_url.as_ref())
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        Ok(Self {
            conn,
            queue_key: queue_key.unwrap_or_else(|| DEFAULT_QUEUE_KEY.to_string()),
            counter_key: counter_key.unwrap_or_else(|| DEFAULT_COUNTER_KEY.to_string()),
        })
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn enqueue(&self, envelope: &str) -> Result<(), BrokerError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("LPUSH")
            .arg(&self.queue_key)
            .arg(envelope)
            .query_async(&mut conn)
            .await
            .map_err(|e| BrokerError::Command(format!("LPUSH failed: {}", e)))?;
        Ok(())
    }

    async fn enqueue_batch(&self, envelopes: &[String]) -> Result<(), BrokerError> {
        if envelopes.is_empty() {
            return Ok(());
        }

        // One LPUSH per envelope keeps array order in the list; pipelining
        // collapses the batch into a single round-trip.
        let mut pipe = redis::pipe();
        for envelope in envelopes {
            pipe.cmd("LPUSH").arg(&self.queue_key).arg(envelope).ignore();
        }

        let mut conn = self.conn.clone();
        pipe.query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| BrokerError::Command(format!("pipelined LPUSH failed: {}", e)))?;
        Ok(())
    }

    async fn blocking_pop(&self, timeout: Duration) -> Result<Option<String>, BrokerError> {
        let mut conn = self.conn.clone();
        // BRPOP returns (key, value) or nil on timeout.
        let item: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(&self.queue_key)
            .arg(timeout.as_secs_f64())
            .query_async(&mut conn)
            .await
            .map_err(|e| BrokerError::Command(format!("BRPOP failed: {}", e)))?;
        Ok(item.map(|(_, envelope)| envelope))
    }

    async fn increment_received(&self) -> Result<u64, BrokerError> {
        let mut conn = self.conn.clone();
        let n: u64 = redis::cmd("INCR")
            .arg(&self.counter_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| BrokerError::Command(format!("INCR failed: {}", e)))?;
        Ok(n)
    }

    async fn received_count(&self) -> Result<u64, BrokerError> {
        let mut conn = self.conn.clone();
        let n: Option<u64> = redis::cmd("GET")
            .arg(&self.counter_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| BrokerError::Command(format!("GET failed: {}", e)))?;
        Ok(n.unwrap_or(0))
    }
}
