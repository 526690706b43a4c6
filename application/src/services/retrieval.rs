//! Retrieval Service: ranked, thresholded citations for a query.

use crate::config::RetrievalConfig;
use crate::ports::embedding_index::{EmbeddingIndex, IndexError, IndexHit, IndexQuery};
use crate::ports::telemetry::TelemetrySink;
use mesh_domain::{
    Citation, ContextHandle, Feedback, FeedbackWeights, OpsEvent, OpsEventKind, RetrievalStatus,
};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Over-fetch factor so re-weighting can promote hits beyond the raw top-k.
const FETCH_FACTOR: usize = 4;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetrievalError {
    #[error("Retrieval unavailable: {0}")]
    Unavailable(#[from] IndexError),

    #[error("Retrieval timed out after {0:?}")]
    Timeout(Duration),
}

/// What to retrieve.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalRequest {
    pub query: String,
    pub k: usize,
    pub hints: Vec<String>,
    pub cluster_ids: Vec<String>,
    /// Upper bound from the caller's remaining context budget
    pub max_latency: Option<Duration>,
}

impl RetrievalRequest {
    pub fn new(query: impl Into<String>, k: usize) -> Self {
        Self {
            query: query.into(),
            k,
            hints: Vec::new(),
            cluster_ids: Vec::new(),
            max_latency: None,
        }
    }

    /// Request scoped by the context's hints and clusters.
    pub fn for_context(ctx: &ContextHandle, query: impl Into<String>, k: usize) -> Self {
        Self {
            query: query.into(),
            k,
            hints: ctx.hints().to_vec(),
            cluster_ids: ctx.cluster_ids().to_vec(),
            max_latency: None,
        }
    }

    /// Clip the retrieval budget to what the context has left.
    pub fn with_max_latency(mut self, max_latency: Duration) -> Self {
        self.max_latency = Some(max_latency);
        self
    }
}

/// Wraps the embedding index with ranking, the relevance floor, feedback
/// weights and the retrieval latency budget. The budget is clipped to the
/// request's `max_latency` when one is set.
///
/// Ordering is deterministic: score descending, then most recently updated,
/// then document id.
pub struct RetrievalService {
    index: Arc<dyn EmbeddingIndex>,
    config: RetrievalConfig,
    weights: RwLock<FeedbackWeights>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl RetrievalService {
    pub fn new(
        index: Arc<dyn EmbeddingIndex>,
        config: RetrievalConfig,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            index,
            config,
            weights: RwLock::new(FeedbackWeights::new()),
            telemetry,
        }
    }

    pub fn with_weights(self, weights: FeedbackWeights) -> Self {
        Self {
            weights: RwLock::new(weights),
            ..self
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Fold one feedback record into the ranking weights. Returns the new
    /// weight of the target.
    pub fn ingest_feedback(&self, feedback: &Feedback) -> f64 {
        match self.weights.write() {
            Ok(mut weights) => weights.apply(feedback),
            Err(poisoned) => poisoned.into_inner().apply(feedback),
        }
    }

    pub fn weights(&self) -> FeedbackWeights {
        match self.weights.read() {
            Ok(weights) => weights.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Retrieve up to `request.k` citations.
    ///
    /// An empty list is a valid result. A failing or slow index yields
    /// [`RetrievalError`]; a `rag.retrieve` event is recorded either way.
    pub async fn retrieve(
        &self,
        request: &RetrievalRequest,
        ctx: &ContextHandle,
    ) -> Result<Vec<Citation>, RetrievalError> {
        let start = Instant::now();
        let budget = match request.max_latency {
            Some(remaining) => self.config.latency_budget().min(remaining),
            None => self.config.latency_budget(),
        };
        let query = IndexQuery {
            text: request.query.clone(),
            hints: request.hints.clone(),
            cluster_ids: request.cluster_ids.clone(),
            limit: request.k.saturating_mul(FETCH_FACTOR),
        };

        let result = match tokio::time::timeout(budget, self.index.search(&query)).await {
            Ok(Ok(hits)) => Ok(self.rank(hits, request.k)),
            Ok(Err(e)) => Err(RetrievalError::Unavailable(e)),
            Err(_) => Err(RetrievalError::Timeout(budget)),
        };
        let ms = start.elapsed().as_millis() as u64;

        let (status, sources) = match &result {
            Ok(citations) if citations.is_empty() => (RetrievalStatus::Empty, Vec::new()),
            Ok(citations) => (
                RetrievalStatus::Ok,
                citations.iter().map(|c| c.doc_id.clone()).collect(),
            ),
            Err(e) => {
                warn!("Retrieval for '{}' failed: {}", request.query, e);
                (RetrievalStatus::Unavailable, Vec::new())
            }
        };
        debug!(
            "Retrieved {} citation(s) for '{}' in {}ms",
            sources.len(),
            request.query,
            ms
        );
        self.telemetry.record(OpsEvent::new(
            ctx,
            OpsEventKind::RagRetrieve {
                k: request.k,
                ms,
                sources,
                status,
            },
        ));

        result
    }

    fn rank(&self, hits: Vec<IndexHit>, k: usize) -> Vec<Citation> {
        let weights = self.weights();
        let mut scored: Vec<(f64, IndexHit)> = hits
            .into_iter()
            .map(|hit| {
                let weight = weights.weight_for(&hit.doc_id, hit.cluster_id.as_deref());
                ((hit.similarity * weight).clamp(0.0, 1.0), hit)
            })
            .filter(|(score, _)| *score >= self.config.min_relevance)
            .collect();

        scored.sort_by(|(sa, a), (sb, b)| {
            sb.total_cmp(sa)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });

        scored
            .into_iter()
            .take(k)
            .map(|(score, hit)| Citation {
                snippet: hit.snippet,
                url: hit.url,
                lines: hit.lines,
                ..Citation::new(hit.doc_id, score)
            })
            .collect()
    }
}
