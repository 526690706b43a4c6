//! Logging infrastructure: the structured ops event stream.
//!
//! Provides [`JsonlTelemetrySink`], a JSONL file writer that implements
//! the [`TelemetrySink`](mesh_application::TelemetrySink) port.

mod jsonl_telemetry;

pub use jsonl_telemetry::JsonlTelemetrySink;
