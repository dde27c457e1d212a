//! Operator stats: counter-vs-store reconciliation.

use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::{dto::StatsResponse, errors, services::AppServices};

/// GET /stats
///
/// `estimated_duplicate_dropped` is the broker counter minus the unique rows
/// in the store. Pending in-flight envelopes make it a momentary estimate;
/// after quiescence it is exact (modulo events lost post-dequeue).
pub async fn stats(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let received = match services.broker.received_count().await {
        Ok(n) => n,
        Err(e) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "broker_unavailable",
                e.to_string(),
            );
        }
    };

    let unique = match services.store.count_unique().await {
        Ok(n) => n,
        Err(e) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "query_failed",
                e.to_string(),
            );
        }
    };

    let topics = match services.store.count_by_topic().await {
        Ok(topics) => topics,
        Err(e) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "query_failed",
                e.to_string(),
            );
        }
    };

    (
        StatusCode::OK,
        Json(StatsResponse {
            total_received_queued: received,
            unique_processed_db: unique,
            estimated_duplicate_dropped: received as i64 - unique as i64,
            topics_count: topics,
            uptime_seconds: services.uptime_seconds(),
        }),
    )
        .into_response()
}
