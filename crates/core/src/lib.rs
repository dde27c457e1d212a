//! Core domain: the event model, schema validation, and the canonical
//! envelope encoding shared by the ingress and the consumer.

pub mod error;
pub mod event;

pub use error::SchemaError;
pub use event::Event;
