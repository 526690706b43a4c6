//! Infrastructure layer for reasoning-mesh
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer.
//!
//! # Adapters
//!
//! - [`InMemoryEmbeddingIndex`]: hashed-embedding search over a JSONL corpus
//! - [`InMemoryActionStore`] and [`JsonFileActionStore`]: plan/action stores
//! - [`JsonlTelemetrySink`]: append-only ops event file
//! - [`LoggingActionExecutor`]: confirms approved actions by logging them
//!
//! Configuration loading ([`ConfigLoader`]) also lives here, since it
//! touches the file system and the environment.

pub mod config;
pub mod executor;
pub mod index;
pub mod logging;
pub mod store;

pub use config::{
    ConfigLoader, ConfigSource, ConfigValidationError, FileConfig, FileCorpusConfig,
    FileLogConfig, FileStorageConfig, FileTelemetryConfig,
};
pub use executor::LoggingActionExecutor;
pub use index::{
    CorpusDocument, CorpusError, HashingEmbedder, InMemoryEmbeddingIndex, load_corpus,
};
pub use logging::JsonlTelemetrySink;
pub use store::{InMemoryActionStore, JsonFileActionStore};
