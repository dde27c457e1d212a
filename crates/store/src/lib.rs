//! Persistence store: insert-with-dedup on `(topic, event_id)` plus the
//! aggregate queries behind the stats and events endpoints.
//!
//! The unique index is the arbitration point of the whole pipeline: multiple
//! consumers may race identical events and the store resolves the conflict
//! without application-level locking. Everything else here is plain reads.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;

use eventsink_core::Event;

mod in_memory;
mod postgres;

pub use in_memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;

/// Default row cap for [`EventStore::select_recent`].
pub const DEFAULT_RECENT_LIMIT: u32 = 100;

/// Errors surfaced by store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connection-level failure (unreachable server, closed pool).
    #[error("store connection error: {0}")]
    Connection(String),

    /// Statement execution or row decoding failure.
    #[error("store statement error: {0}")]
    Statement(String),
}

/// Result of an [`EventStore::insert_dedup`] call.
///
/// `Duplicate` is not an error: the row already existed under the same
/// `(topic, event_id)` key and the insert was absorbed silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// A persisted event row.
///
/// Rows are created on first unique insert and never mutated; `id` is the
/// store-assigned surrogate key and `processed_at` the commit instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventLog {
    pub id: i64,
    pub topic: String,
    pub event_id: String,
    pub timestamp: NaiveDateTime,
    pub source: String,
    pub payload: serde_json::Value,
    pub processed_at: NaiveDateTime,
}

/// Per-topic cardinality, as reported by the stats view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicCount {
    pub topic: String,
    pub count: u64,
}

/// Storage operations used by the consumer and the read endpoints.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Create the table and indexes if absent. Idempotent; called once at
    /// service start and fatal on failure.
    async fn init_schema(&self) -> Result<(), StoreError>;

    /// Insert the event unless a row with the same `(topic, event_id)`
    /// already exists.
    ///
    /// Must be a single atomic statement (insert-on-conflict); a
    /// read-then-write would race under concurrent consumers. The outcome is
    /// decided by the affected-row count.
    async fn insert_dedup(&self, event: &Event) -> Result<InsertOutcome, StoreError>;

    /// Number of unique persisted events.
    async fn count_unique(&self) -> Result<u64, StoreError>;

    /// Per-topic cardinalities, in no defined order.
    async fn count_by_topic(&self) -> Result<Vec<TopicCount>, StoreError>;

    /// Up to `limit` rows, newest-first by event timestamp, optionally
    /// filtered by topic.
    async fn select_recent(
        &self,
        topic: Option<&str>,
        limit: u32,
    ) -> Result<Vec<EventLog>, StoreError>;
}
