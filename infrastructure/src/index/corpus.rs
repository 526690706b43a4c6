//! JSONL corpus loader.
//!
//! One document per line:
//!
//! ```text
//! {"id":"doc-1","text":"...","url":"https://...","cluster_id":"c1","lines":[10,24],"updated_at":"2024-05-01T00:00:00Z"}
//! ```
//!
//! Only `id` and `text` are required. Blank lines and lines starting with
//! `#` are skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Could not read corpus {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid corpus entry at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Duplicate document id '{id}' at line {line}")]
    DuplicateId { id: String, line: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusDocument {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<(u32, u32)>,
    /// Missing timestamps load as the Unix epoch, so they rank last on ties.
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl CorpusDocument {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            url: None,
            cluster_id: None,
            lines: None,
            updated_at: epoch(),
        }
    }

    pub fn with_cluster(mut self, cluster_id: impl Into<String>) -> Self {
        self.cluster_id = Some(cluster_id.into());
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }
}

/// Load a corpus file.
pub fn load_corpus(path: impl AsRef<Path>) -> Result<Vec<CorpusDocument>, CorpusError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_corpus(&content)
}

/// Parse JSONL corpus text. Line numbers in errors are 1-based.
pub fn parse_corpus(content: &str) -> Result<Vec<CorpusDocument>, CorpusError> {
    let mut docs: Vec<CorpusDocument> = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let doc: CorpusDocument =
            serde_json::from_str(trimmed).map_err(|e| CorpusError::Parse {
                line,
                message: e.to_string(),
            })?;

        if doc.id.trim().is_empty() {
            return Err(CorpusError::Parse {
                line,
                message: "document id cannot be empty".to_string(),
            });
        }
        if docs.iter().any(|d| d.id == doc.id) {
            return Err(CorpusError::DuplicateId { id: doc.id, line });
        }
        docs.push(doc);
    }

    Ok(docs)
}
