//! Port for the embedding index behind the Retrieval Service.
//!
//! The index returns raw similarity hits; ranking weights, the relevance
//! floor and ordering are applied by
//! [`RetrievalService`](crate::services::retrieval::RetrievalService).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors reported by an index adapter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("Index unavailable: {0}")]
    Unavailable(String),

    #[error("Index query failed: {0}")]
    Query(String),
}

/// A similarity query against the index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexQuery {
    pub text: String,
    /// Extra terms folded into the query embedding.
    pub hints: Vec<String>,
    /// Restrict to these clusters. Empty means no restriction.
    pub cluster_ids: Vec<String>,
    /// Upper bound on hits the adapter needs to return.
    pub limit: usize,
}

/// One raw hit from the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub doc_id: String,
    /// Similarity in `[0, 1]`.
    pub similarity: f64,
    pub snippet: Option<String>,
    pub url: Option<String>,
    pub lines: Option<(u32, u32)>,
    pub cluster_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl IndexHit {
    pub fn new(doc_id: impl Into<String>, similarity: f64, updated_at: DateTime<Utc>) -> Self {
        Self {
            doc_id: doc_id.into(),
            similarity,
            snippet: None,
            url: None,
            lines: None,
            cluster_id: None,
            updated_at,
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    pub fn with_cluster(mut self, cluster_id: impl Into<String>) -> Self {
        self.cluster_id = Some(cluster_id.into());
        self
    }
}

/// Port for similarity search over the document corpus.
#[async_trait]
pub trait EmbeddingIndex: Send + Sync {
    async fn search(&self, query: &IndexQuery) -> Result<Vec<IndexHit>, IndexError>;
}
