//! Port definitions (interfaces for external adapters)

pub mod action_executor;
pub mod action_store;
pub mod embedding_index;
pub mod telemetry;
