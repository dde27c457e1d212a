//! In-memory event store for dev/test wiring.
//!
//! Mirrors the Postgres behaviour the tests rely on: dedup by
//! `(topic, event_id)`, monotone surrogate ids, newest-first reads.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use eventsink_core::Event;

use crate::{EventLog, EventStore, InsertOutcome, StoreError, TopicCount};

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<EventLog>,
    keys: HashSet<(String, String)>,
    next_id: i64,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn init_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_dedup(&self, event: &Event) -> Result<InsertOutcome, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        let key = (event.topic.clone(), event.event_id.clone());
        if !inner.keys.insert(key) {
            return Ok(InsertOutcome::Duplicate);
        }

        inner.next_id += 1;
        let id = inner.next_id;
        inner.rows.push(EventLog {
            id,
            topic: event.topic.clone(),
            event_id: event.event_id.clone(),
            timestamp: event.timestamp,
            source: event.source.clone(),
            payload: serde_json::Value::Object(event.payload.clone()),
            processed_at: Utc::now().naive_utc(),
        });
        Ok(InsertOutcome::Inserted)
    }

    async fn count_unique(&self) -> Result<u64, StoreError> {
        Ok(self.inner.lock().unwrap().rows.len() as u64)
    }

    async fn count_by_topic(&self) -> Result<Vec<TopicCount>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut counts: HashMap<String, u64> = HashMap::new();
        for row in &inner.rows {
            *counts.entry(row.topic.clone()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(topic, count)| TopicCount { topic, count })
            .collect())
    }

    async fn select_recent(
        &self,
        topic: Option<&str>,
        limit: u32,
    ) -> Result<Vec<EventLog>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<EventLog> = inner
            .rows
            .iter()
            .filter(|row| topic.is_none_or(|t| row.topic == t))
            .cloned()
            .collect();
        rows.sort_by_key(|row| (Reverse(row.timestamp), Reverse(row.id)));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(topic: &str, event_id: &str, ts: &str) -> Event {
        Event::from_json(
            &json!({
                "topic": topic,
                "event_id": event_id,
                "timestamp": ts,
                "source": "test",
                "payload": {"n": 1}
            })
            .to_string(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_key_is_absorbed_once() {
        let store = InMemoryEventStore::new();
        let e = event("d", "E1", "2025-01-01T00:00:00Z");

        assert_eq!(store.insert_dedup(&e).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.insert_dedup(&e).await.unwrap(), InsertOutcome::Duplicate);
        assert_eq!(store.insert_dedup(&e).await.unwrap(), InsertOutcome::Duplicate);
        assert_eq!(store.count_unique().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn same_event_id_under_different_topics_is_not_a_duplicate() {
        let store = InMemoryEventStore::new();
        store
            .insert_dedup(&event("a", "E1", "2025-01-01T00:00:00"))
            .await
            .unwrap();
        let outcome = store
            .insert_dedup(&event("b", "E1", "2025-01-01T00:00:00"))
            .await
            .unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted);
        assert_eq!(store.count_unique().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn recent_is_newest_first_with_limit_and_filter() {
        let store = InMemoryEventStore::new();
        store.insert_dedup(&event("t", "old", "2025-01-01T00:00:00")).await.unwrap();
        store.insert_dedup(&event("t", "new", "2025-03-01T00:00:00")).await.unwrap();
        store.insert_dedup(&event("t", "mid", "2025-02-01T00:00:00")).await.unwrap();
        store.insert_dedup(&event("other", "x", "2025-04-01T00:00:00")).await.unwrap();

        let recent = store.select_recent(Some("t"), 2).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|r| r.event_id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid"]);

        assert!(store.select_recent(Some("t"), 0).await.unwrap().is_empty());
        assert!(store.select_recent(Some("missing"), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn topic_counts_group_by_topic() {
        let store = InMemoryEventStore::new();
        store.insert_dedup(&event("a", "1", "2025-01-01T00:00:00")).await.unwrap();
        store.insert_dedup(&event("a", "2", "2025-01-01T00:00:00")).await.unwrap();
        store.insert_dedup(&event("b", "1", "2025-01-01T00:00:00")).await.unwrap();

        let mut counts = store.count_by_topic().await.unwrap();
        counts.sort_by(|l, r| l.topic.cmp(&r.topic));
        assert_eq!(
            counts,
            vec![
                TopicCount { topic: "a".into(), count: 2 },
                TopicCount { topic: "b".into(), count: 1 },
            ]
        );
    }
}
