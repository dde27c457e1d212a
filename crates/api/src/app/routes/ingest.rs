//! Producer-facing ingress: single and batch publish.
//!
//! Both endpoints only validate and enqueue; persistence happens later in the
//! consumer. The batch endpoint validates every member before enqueueing
//! anything, so a bad member can never leave a partial batch on the queue.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use eventsink_core::Event;

use crate::app::{dto, errors, services::AppServices};

/// POST /publish
///
/// Body = a single event. 200 with `{status, event_id}` once the envelope is
/// on the queue; 422 on schema failure; 500 when the broker is unreachable.
pub async fn publish(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<Event>, JsonRejection>,
) -> axum::response::Response {
    let event = match body {
        Ok(Json(event)) => event,
        Err(rejection) => {
            return errors::json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "schema_rejected",
                rejection.body_text(),
            );
        }
    };
    if let Err(e) = event.validate() {
        return errors::json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "schema_rejected",
            e.to_string(),
        );
    }

    let envelope = match event.to_json() {
        Ok(envelope) => envelope,
        Err(e) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "render_failed",
                e.to_string(),
            );
        }
    };

    match services.broker.enqueue(&envelope).await {
        Ok(()) => (
            StatusCode::OK,
            Json(dto::QueuedResponse {
                status: "queued",
                event_id: event.event_id.clone(),
            }),
        )
            .into_response(),
        Err(e) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "broker_unavailable",
            e.to_string(),
        ),
    }
}

/// POST /publish/batch
///
/// Body = JSON array of events. Validation is atomic over the whole batch:
/// any invalid member rejects everything with 422 and nothing is enqueued.
/// On success all envelopes go out in one pipelined broker round-trip.
pub async fn publish_batch(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<Vec<Event>>, JsonRejection>,
) -> axum::response::Response {
    let events = match body {
        Ok(Json(events)) => events,
        Err(rejection) => {
            return errors::json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "schema_rejected",
                rejection.body_text(),
            );
        }
    };

    let mut envelopes = Vec::with_capacity(events.len());
    for (idx, event) in events.iter().enumerate() {
        if let Err(e) = event.validate() {
            return errors::json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "schema_rejected",
                format!("event at index {idx}: {e}"),
            );
        }
        match event.to_json() {
            Ok(envelope) => envelopes.push(envelope),
            Err(e) => {
                return errors::json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "render_failed",
                    format!("event at index {idx}: {e}"),
                );
            }
        }
    }

    match services.broker.enqueue_batch(&envelopes).await {
        Ok(()) => (
            StatusCode::OK,
            Json(dto::BatchQueuedResponse {
                status: "batch_queued",
                count: events.len(),
            }),
        )
            .into_response(),
        Err(e) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "broker_unavailable",
            e.to_string(),
        ),
    }
}
