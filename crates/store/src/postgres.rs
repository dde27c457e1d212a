//! Postgres-backed event store.
//!
//! ## Dedup mechanics
//!
//! `insert_dedup` is a single `INSERT ... ON CONFLICT (topic, event_id) DO
//! NOTHING` statement. The named unique constraint `uq_topic_event_id` is the
//! sole dedup identity; a conflicting insert is absorbed server-side and
//! reported back through the affected-row count (1 = inserted, 0 =
//! duplicate). READ COMMITTED isolation is sufficient because the unique
//! index alone resolves concurrent insert races.
//!
//! ## Thread safety
//!
//! `PostgresEventStore` is `Send + Sync` and shared across tasks; the SQLx
//! pool hands each operation its own transaction-scoped session.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{PgPool, Row};
use tracing::instrument;

use eventsink_core::Event;

use crate::{EventLog, EventStore, InsertOutcome, StoreError, TopicCount};

#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: Arc<PgPool>,
}

impl PostgresEventStore {
    /// Connect a new pool against the given DSN.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS event_logs (
                id           BIGSERIAL PRIMARY KEY,
                topic        TEXT NOT NULL,
                event_id     TEXT NOT NULL,
                timestamp    TIMESTAMP NOT NULL,
                source       TEXT NOT NULL,
                payload      JSON NOT NULL,
                processed_at TIMESTAMP NOT NULL DEFAULT NOW(),
                CONSTRAINT uq_topic_event_id UNIQUE (topic, event_id)
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_table", e))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS ix_event_logs_topic ON event_logs (topic)")
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_topic_index", e))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS ix_event_logs_event_id ON event_logs (event_id)")
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_event_id_index", e))?;

        Ok(())
    }

    #[instrument(
        skip(self, event),
        fields(topic = %event.topic, event_id = %event.event_id),
        err
    )]
    async fn insert_dedup(&self, event: &Event) -> Result<InsertOutcome, StoreError> {
        // Per-event transaction: one bad event never poisons its neighbours.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let result = sqlx::query(
            r#"
            INSERT INTO event_logs (topic, event_id, timestamp, source, payload)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (topic, event_id) DO NOTHING
            "#,
        )
        .bind(&event.topic)
        .bind(&event.event_id)
        .bind(event.timestamp)
        .bind(&event.source)
        .bind(sqlx::types::Json(&event.payload))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_dedup", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(if result.rows_affected() == 1 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::Duplicate
        })
    }

    async fn count_unique(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM event_logs")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_unique", e))?;

        let total: i64 = row
            .try_get("total")
            .map_err(|e| StoreError::Statement(format!("failed to read count: {}", e)))?;
        Ok(total as u64)
    }

    async fn count_by_topic(&self) -> Result<Vec<TopicCount>, StoreError> {
        let rows = sqlx::query(
            "SELECT topic, COUNT(*) AS count FROM event_logs GROUP BY topic",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_by_topic", e))?;

        let mut topics = Vec::with_capacity(rows.len());
        for row in rows {
            let topic: String = row
                .try_get("topic")
                .map_err(|e| StoreError::Statement(format!("failed to read topic: {}", e)))?;
            let count: i64 = row
                .try_get("count")
                .map_err(|e| StoreError::Statement(format!("failed to read count: {}", e)))?;
            topics.push(TopicCount {
                topic,
                count: count as u64,
            });
        }
        Ok(topics)
    }

    #[instrument(skip(self), err)]
    async fn select_recent(
        &self,
        topic: Option<&str>,
        limit: u32,
    ) -> Result<Vec<EventLog>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, topic, event_id, timestamp, source, payload, processed_at
            FROM event_logs
            WHERE ($1::text IS NULL OR topic = $1)
            ORDER BY timestamp DESC
            LIMIT $2
            "#,
        )
        .bind(topic)
        .bind(i64::from(limit))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("select_recent", e))?;

        let mut logs = Vec::with_capacity(rows.len());
        for row in rows {
            logs.push(event_log_from_row(&row)?);
        }
        Ok(logs)
    }
}

fn event_log_from_row(row: &sqlx::postgres::PgRow) -> Result<EventLog, StoreError> {
    let read = |e: sqlx::Error| StoreError::Statement(format!("failed to decode row: {}", e));

    let timestamp: NaiveDateTime = row.try_get("timestamp").map_err(read)?;
    let processed_at: NaiveDateTime = row.try_get("processed_at").map_err(read)?;

    Ok(EventLog {
        id: row.try_get("id").map_err(read)?,
        topic: row.try_get("topic").map_err(read)?,
        event_id: row.try_get("event_id").map_err(read)?,
        timestamp,
        source: row.try_get("source").map_err(read)?,
        payload: row.try_get("payload").map_err(read)?,
        processed_at,
    })
}

/// Map SQLx errors to [`StoreError`].
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            StoreError::Connection(format!("{} failed: {}", operation, err))
        }
        sqlx::Error::Database(db_err) => {
            StoreError::Statement(format!("{} failed: {}", operation, db_err.message()))
        }
        _ => StoreError::Statement(format!("{} failed: {}", operation, err)),
    }
}
