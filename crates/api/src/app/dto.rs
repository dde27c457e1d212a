use serde::Serialize;

use eventsink_store::TopicCount;

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub status: &'static str,
    pub event_id: String,
}

#[derive(Debug, Serialize)]
pub struct BatchQueuedResponse {
    pub status: &'static str,
    pub count: usize,
}

/// Reconciled view of counter vs store.
///
/// `total_received_queued` is a historical misnomer kept for wire
/// compatibility: the counter is incremented at consume-time, so the
/// duplicate figure is an eventual-consistency estimate, not an exact ledger.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_received_queued: u64,
    pub unique_processed_db: u64,
    pub estimated_duplicate_dropped: i64,
    pub topics_count: Vec<TopicCount>,
    pub uptime_seconds: f64,
}
