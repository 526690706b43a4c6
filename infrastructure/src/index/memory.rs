//! In-process embedding index over a loaded corpus.

use super::corpus::CorpusDocument;
use super::embedder::{HashingEmbedder, cosine_similarity};
use async_trait::async_trait;
use mesh_application::{EmbeddingIndex, IndexError, IndexHit, IndexQuery};
use mesh_domain::core::string::truncate;
use std::sync::RwLock;
use tracing::debug;

/// Longest snippet returned with a hit, in bytes.
pub const SNIPPET_MAX_LEN: usize = 280;

struct IndexedDocument {
    doc: CorpusDocument,
    vector: Vec<f32>,
}

/// Brute-force cosine search over hashed embeddings.
///
/// Results are deterministic for a given corpus and query: hits are ordered
/// by similarity, then by document id.
pub struct InMemoryEmbeddingIndex {
    embedder: HashingEmbedder,
    docs: RwLock<Vec<IndexedDocument>>,
}

impl Default for InMemoryEmbeddingIndex {
    fn default() -> Self {
        Self::new(HashingEmbedder::default())
    }
}

impl InMemoryEmbeddingIndex {
    pub fn new(embedder: HashingEmbedder) -> Self {
        Self {
            embedder,
            docs: RwLock::new(Vec::new()),
        }
    }

    pub fn from_documents(embedder: HashingEmbedder, docs: Vec<CorpusDocument>) -> Self {
        let index = Self::new(embedder);
        for doc in docs {
            index.upsert(doc);
        }
        index
    }

    /// Add a document, replacing any with the same id.
    pub fn upsert(&self, doc: CorpusDocument) {
        let vector = self.embedder.embed(&doc.text);
        let Ok(mut docs) = self.docs.write() else {
            return;
        };
        match docs.iter_mut().find(|d| d.doc.id == doc.id) {
            Some(existing) => *existing = IndexedDocument { doc, vector },
            None => docs.push(IndexedDocument { doc, vector }),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EmbeddingIndex for InMemoryEmbeddingIndex {
    async fn search(&self, query: &IndexQuery) -> Result<Vec<IndexHit>, IndexError> {
        let mut text = query.text.clone();
        for hint in &query.hints {
            text.push(' ');
            text.push_str(hint);
        }
        let qv = self.embedder.embed(&text);

        let docs = self
            .docs
            .read()
            .map_err(|_| IndexError::Unavailable("index lock poisoned".to_string()))?;

        let mut scored: Vec<(f64, &IndexedDocument)> = docs
            .iter()
            .filter(|d| {
                query.cluster_ids.is_empty()
                    || d.doc
                        .cluster_id
                        .as_ref()
                        .is_some_and(|c| query.cluster_ids.contains(c))
            })
            .map(|d| (f64::from(cosine_similarity(&qv, &d.vector)).clamp(0.0, 1.0), d))
            .filter(|(sim, _)| *sim > 0.0)
            .collect();

        // Ties newest first, matching retrieval ranking.
        scored.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| b.1.doc.updated_at.cmp(&a.1.doc.updated_at))
                .then_with(|| a.1.doc.id.cmp(&b.1.doc.id))
        });
        scored.truncate(query.limit);

        debug!(
            "Index search over {} docs returned {} hits",
            docs.len(),
            scored.len()
        );

        Ok(scored
            .into_iter()
            .map(|(similarity, d)| IndexHit {
                doc_id: d.doc.id.clone(),
                similarity,
                snippet: Some(truncate(&d.doc.text, SNIPPET_MAX_LEN)),
                url: d.doc.url.clone(),
                lines: d.doc.lines,
                cluster_id: d.doc.cluster_id.clone(),
                updated_at: d.doc.updated_at,
            })
            .collect())
    }
}
