//! Port for the ops event stream.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while this port captures the lifecycle
//! events (`mesh.start`, `rag.retrieve`, `mesh.final`, ...) in a
//! machine-readable, append-only form.

use mesh_domain::OpsEvent;
use std::sync::Mutex;

/// Port for recording ops events.
///
/// `record` is synchronous and non-fallible; sink failures must never
/// disturb an invocation.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: OpsEvent);
}

/// No-op implementation for tests and when telemetry is disabled.
pub struct NoTelemetry;

impl TelemetrySink for NoTelemetry {
    fn record(&self, _event: OpsEvent) {}
}

/// Keeps every event in memory, in emission order.
#[derive(Default)]
pub struct MemoryTelemetry {
    events: Mutex<Vec<OpsEvent>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OpsEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Event names in emission order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .map(|e| e.iter().map(|ev| ev.name()).collect())
            .unwrap_or_default()
    }

    pub fn named(&self, name: &str) -> Vec<OpsEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.name() == name)
            .collect()
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn record(&self, event: OpsEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_domain::{OpsEventKind, RetrievalStatus};

    #[test]
    fn test_memory_telemetry_keeps_order() {
        let sink = MemoryTelemetry::new();
        for k in [1, 2] {
            sink.record(OpsEvent::for_session(
                "s",
                "u",
                OpsEventKind::RagRetrieve {
                    k,
                    ms: 0,
                    sources: vec![],
                    status: RetrievalStatus::Empty,
                },
            ));
        }
        assert_eq!(sink.names(), vec!["rag.retrieve", "rag.retrieve"]);
        assert_eq!(sink.named("rag.retrieve").len(), 2);
        assert!(sink.named("mesh.final").is_empty());
    }
}
