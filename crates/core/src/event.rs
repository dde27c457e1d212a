//! The in-flight event record and its wire encoding.
//!
//! An `Event` is what producers submit over HTTP and what travels through the
//! broker queue as a JSON envelope. The same struct backs both directions:
//! `from_json` is the ingress validator, `to_json` is the canonical render
//! used for broker transport, and the two are exact inverses for every valid
//! event.
//!
//! ## Timestamp normalisation
//!
//! Producers send ISO-8601 timestamps with or without a UTC offset. The store
//! keeps a timezone-naive column, so offsets are resolved at parse time: an
//! offset-bearing instant is converted to UTC and the offset metadata is
//! dropped. A naive timestamp is taken as already being UTC. Rendering always
//! emits the naive extended form, so a re-parse yields the same instant.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SchemaError;

/// Immutable in-flight event envelope.
///
/// Uniqueness of an event is scoped by `(topic, event_id)`; the rest of the
/// record is carried through to storage untouched. `payload` is opaque to the
/// pipeline and must be map-shaped at the top level, which the deserialiser
/// enforces by decoding into a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub topic: String,
    pub event_id: String,
    #[serde(with = "iso_instant")]
    pub timestamp: NaiveDateTime,
    pub source: String,
    pub payload: Map<String, Value>,
}

impl Event {
    /// Parse and validate an inbound payload or broker envelope.
    pub fn from_json(raw: &str) -> Result<Self, SchemaError> {
        let event: Event =
            serde_json::from_str(raw).map_err(|e| SchemaError::rejected(e.to_string()))?;
        event.validate()?;
        Ok(event)
    }

    /// Render the canonical envelope text used for broker transport.
    pub fn to_json(&self) -> Result<String, SchemaError> {
        serde_json::to_string(self).map_err(|e| SchemaError::Render(e.to_string()))
    }

    /// Field-level checks that serde cannot express.
    ///
    /// The dedup key `(topic, event_id)` must be non-degenerate; everything
    /// else is free-form by contract.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.topic.is_empty() {
            return Err(SchemaError::invalid_field("topic must be non-empty"));
        }
        if self.event_id.is_empty() {
            return Err(SchemaError::invalid_field("event_id must be non-empty"));
        }
        Ok(())
    }
}

/// Serde adapter for the flexible ISO-8601 timestamp field.
///
/// Accepts `2025-01-01T12:00:00Z`, `2025-01-01T12:00:00+02:00`, and the naive
/// `2025-01-01T12:00:00[.ffffff]`; emits the naive extended form.
pub mod iso_instant {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const RENDER_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.format(RENDER_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    /// Parse either form, resolving any offset to UTC and discarding it.
    pub fn parse(raw: &str) -> Result<NaiveDateTime, String> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(dt.naive_utc());
        }
        raw.parse::<NaiveDateTime>()
            .map_err(|e| format!("invalid timestamp {raw:?}: {e}"))
    }
}
