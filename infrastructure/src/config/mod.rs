//! Configuration file loading for reasoning-mesh
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `MESH_*` environment variables (`MESH_RETRIEVAL__K=8`)
//! 2. `--config <path>` specified file
//! 3. Project root: `./mesh.toml` or `./.mesh.toml`
//! 4. Global: `~/.config/reasoning-mesh/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    APP_DIR, ConfigValidationError, FileConfig, FileCorpusConfig, FileLogConfig,
    FileStorageConfig, FileTelemetryConfig, expand_home,
};
pub use loader::{ConfigLoader, ConfigSource, ENV_PREFIX, PROJECT_FILES};
