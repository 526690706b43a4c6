//! JSONL file writer for ops events.
//!
//! Each [`OpsEvent`] is serialized as a single flat JSON line (`ts`,
//! `session_id`, `user_id`, `type`, then the event fields) and appended to
//! the file via a buffered writer.

use mesh_application::TelemetrySink;
use mesh_domain::OpsEvent;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Append-only JSONL telemetry sink.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Each record is flushed as it
/// is written; write failures are dropped so an invocation never fails on
/// telemetry.
pub struct JsonlTelemetrySink {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlTelemetrySink {
    /// Open `path` for appending, creating it and its parent directories.
    ///
    /// Returns `None` if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create telemetry directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open telemetry file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TelemetrySink for JsonlTelemetrySink {
    fn record(&self, event: OpsEvent) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                warn!("Dropping {} event: {}", event.name(), e);
                return;
            }
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlTelemetrySink {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_domain::{OpsEventKind, RetrievalStatus};

    fn retrieve_event(k: usize) -> OpsEvent {
        OpsEvent::for_session(
            "s-1",
            "u-1",
            OpsEventKind::RagRetrieve {
                k,
                ms: 3,
                sources: vec!["d1".into(), "d2".into()],
                status: RetrievalStatus::Ok,
            },
        )
    }

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_flat_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ops.jsonl");
        let sink = JsonlTelemetrySink::open(&path).unwrap();

        sink.record(retrieve_event(5));
        sink.record(OpsEvent::for_session(
            "s-1",
            "u-1",
            OpsEventKind::MeshConsensus {
                method: mesh_domain::ConsensusMethod::EvidenceWeighted,
                disagreements: 1,
            },
        ));
        drop(sink);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "rag.retrieve");
        assert_eq!(lines[0]["session_id"], "s-1");
        assert_eq!(lines[0]["sources"][1], "d2");
        assert!(lines[0].get("ts").is_some());
        assert_eq!(lines[1]["type"], "mesh.consensus");
        assert_eq!(lines[1]["disagreements"], 1);
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ops.jsonl");

        JsonlTelemetrySink::open(&path).unwrap().record(retrieve_event(1));
        JsonlTelemetrySink::open(&path).unwrap().record(retrieve_event(2));

        let ks: Vec<_> = read_lines(&path).iter().map(|v| v["k"].clone()).collect();
        assert_eq!(ks, vec![serde_json::json!(1), serde_json::json!(2)]);
    }

    #[test]
    fn test_lines_parse_back_into_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ops.jsonl");
        let sink = JsonlTelemetrySink::open(&path).unwrap();
        let event = retrieve_event(4);
        sink.record(event.clone());
        drop(sink);

        let content = std::fs::read_to_string(&path).unwrap();
        let back: OpsEvent = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_open_fails_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        assert!(JsonlTelemetrySink::open(blocker.join("ops.jsonl")).is_none());
    }
}
