//! Structured lifecycle events (the ops event stream).

pub mod events;

pub use events::{OpsEvent, OpsEventKind, RetrievalStatus};
