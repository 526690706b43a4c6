//! Sections that only the adapters and the CLI read.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application directory name under the platform config/data dirs.
pub const APP_DIR: &str = "reasoning-mesh";

/// `[storage]`: where pending actions and plans are persisted.
///
/// ```toml
/// [storage]
/// actions_path = "~/.local/share/reasoning-mesh/actions.json"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    pub actions_path: Option<String>,
}

impl FileStorageConfig {
    /// Configured path, or `<data dir>/reasoning-mesh/actions.json`.
    pub fn resolved_actions_path(&self) -> PathBuf {
        match &self.actions_path {
            Some(p) => expand_home(p),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("actions.json"),
        }
    }
}

/// `[telemetry]`: the JSONL ops event file. Unset disables the sink.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTelemetryConfig {
    pub path: Option<String>,
}

impl FileTelemetryConfig {
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.as_deref().map(expand_home)
    }
}

/// `[corpus]`: documents loaded into the in-memory embedding index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCorpusConfig {
    pub path: Option<String>,
    /// Width of the hashed embedding vectors.
    pub dimensions: usize,
}

impl Default for FileCorpusConfig {
    fn default() -> Self {
        Self {
            path: None,
            dimensions: 256,
        }
    }
}

impl FileCorpusConfig {
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.as_deref().map(expand_home)
    }
}

/// `[log]`: optional daily-rotated diagnostic log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLogConfig {
    pub dir: Option<String>,
    pub file_prefix: String,
}

impl Default for FileLogConfig {
    fn default() -> Self {
        Self {
            dir: None,
            file_prefix: "mesh.log".to_string(),
        }
    }
}

impl FileLogConfig {
    pub fn resolved_dir(&self) -> Option<PathBuf> {
        self.dir.as_deref().map(expand_home)
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    Path::new(path).to_path_buf()
}
