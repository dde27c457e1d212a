//! Read-only access to recently persisted events.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use eventsink_store::DEFAULT_RECENT_LIMIT;

use crate::app::{errors, services::AppServices};

#[derive(Debug, Deserialize)]
pub struct EventListQuery {
    pub topic: Option<String>,
    pub limit: Option<u32>,
}

/// GET /events?topic=X&limit=50
///
/// Up to `limit` (default 100) persisted events, newest-first by the event
/// timestamp (not by processing order), optionally filtered by topic.
pub async fn list_events(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<EventListQuery>,
) -> axum::response::Response {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);

    match services
        .store
        .select_recent(query.topic.as_deref(), limit)
        .await
    {
        Ok(logs) => (StatusCode::OK, Json(logs)).into_response(),
        Err(e) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "query_failed",
            format!("failed to query events: {}", e),
        ),
    }
}
