use axum::{
    Router,
    routing::{get, post},
};

pub mod events;
pub mod ingest;
pub mod stats;
pub mod system;

/// Router for the ingestion and operator endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/publish", post(ingest::publish))
        .route("/publish/batch", post(ingest::publish_batch))
        .route("/events", get(events::list_events))
        .route("/stats", get(stats::stats))
}
