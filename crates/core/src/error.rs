//! Schema error model.

use thiserror::Error;

/// Rejection raised when an inbound payload does not decode into an [`Event`].
///
/// Keep this focused on deterministic shape failures (missing fields, wrong
/// types, unparseable timestamps). Transport and storage concerns belong to
/// the broker and store crates.
///
/// [`Event`]: crate::Event
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The raw bytes were not valid JSON, or a required field was missing
    /// or of the wrong type.
    #[error("schema rejected: {0}")]
    Rejected(String),

    /// A field decoded but failed validation (e.g. empty dedup key part).
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// The event could not be rendered back to its envelope form.
    #[error("render failed: {0}")]
    Render(String),
}

impl SchemaError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn invalid_field(msg: impl Into<String>) -> Self {
        Self::InvalidField(msg.into())
    }
}
