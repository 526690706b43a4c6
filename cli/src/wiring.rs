//! Dependency injection: adapters from configuration, assembled into a mesh.

use anyhow::{Context, Result};
use mesh_application::{Mesh, MeshPorts, NoTelemetry, TelemetrySink};
use mesh_infrastructure::{
    FileConfig, HashingEmbedder, InMemoryEmbeddingIndex, JsonFileActionStore, JsonlTelemetrySink,
    LoggingActionExecutor, load_corpus,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Which corpus, if any, backs the embedding index.
pub enum CorpusSource<'a> {
    /// The `--corpus` path, else `[corpus] path`.
    Configured(Option<&'a Path>),
    /// Commands that never retrieve.
    Skip,
}

pub fn build_mesh(config: &FileConfig, corpus: CorpusSource<'_>) -> Result<Mesh> {
    let embedder = HashingEmbedder::new(config.corpus.dimensions);
    let docs = match corpus {
        CorpusSource::Configured(explicit) => {
            match explicit
                .map(Path::to_path_buf)
                .or_else(|| config.corpus.resolved_path())
            {
                Some(path) => {
                    let docs = load_corpus(&path)
                        .with_context(|| format!("loading corpus {}", path.display()))?;
                    info!("Loaded {} documents from {}", docs.len(), path.display());
                    docs
                }
                None => {
                    warn!("No corpus configured; answers will have no evidence");
                    Vec::new()
                }
            }
        }
        CorpusSource::Skip => Vec::new(),
    };
    let index = Arc::new(InMemoryEmbeddingIndex::from_documents(embedder, docs));

    let actions_path = config.storage.resolved_actions_path();
    let store = Arc::new(
        JsonFileActionStore::open(&actions_path)
            .with_context(|| format!("opening action store {}", actions_path.display()))?,
    );
    info!("Action store: {}", store.path().display());

    let telemetry: Arc<dyn TelemetrySink> = match config.telemetry.resolved_path() {
        Some(path) => match JsonlTelemetrySink::open(&path) {
            Some(sink) => {
                info!("Telemetry: {}", sink.path().display());
                Arc::new(sink)
            }
            None => Arc::new(NoTelemetry),
        },
        None => Arc::new(NoTelemetry),
    };

    Ok(Mesh::build(
        &config.mesh_config(),
        MeshPorts {
            index,
            store,
            executor: Arc::new(LoggingActionExecutor::new()),
            telemetry,
        },
    ))
}
