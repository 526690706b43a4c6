//! Researcher: grounds one sub-task in retrieved evidence.

use super::{Agent, AgentInput};
use crate::services::retrieval::{RetrievalRequest, RetrievalService};
use async_trait::async_trait;
use mesh_domain::{AgentMessage, AgentRole, Citation, ContextHandle, MessageType};
use std::sync::Arc;
use tracing::warn;

const EMPTY_CONFIDENCE: f64 = 0.1;
const DEGRADED_CONFIDENCE: f64 = 0.05;

pub struct ResearcherAgent {
    retrieval: Arc<RetrievalService>,
    k: usize,
    fact_threshold: f64,
}

impl ResearcherAgent {
    pub fn new(retrieval: Arc<RetrievalService>, k: usize, fact_threshold: f64) -> Self {
        Self {
            retrieval,
            k,
            fact_threshold,
        }
    }

    /// FACT needs two citations at or above the fact threshold.
    fn classify(&self, citations: &[Citation]) -> MessageType {
        let strong = citations
            .iter()
            .filter(|c| c.score >= self.fact_threshold)
            .count();
        if strong >= 2 {
            MessageType::Fact
        } else {
            MessageType::Hypothesis
        }
    }
}

/// The claim is the best snippet, falling back to the query itself.
fn claim(query: &str, citations: &[Citation]) -> String {
    citations
        .iter()
        .find_map(|c| c.snippet.clone())
        .unwrap_or_else(|| format!("{} (see {})", query, citations[0].doc_id))
}

#[async_trait]
impl Agent for ResearcherAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Researcher
    }

    async fn handle(&self, input: &AgentInput, ctx: &ContextHandle) -> AgentMessage {
        let query = input
            .focus
            .clone()
            .unwrap_or_else(|| input.message.content.clone());
        let mut request = RetrievalRequest::for_context(ctx, query.clone(), self.k);
        if let Some(deadline) = input.deadline {
            request = request.with_max_latency(deadline);
        }

        let mut message = match self.retrieval.retrieve(&request, ctx).await {
            Ok(citations) if citations.is_empty() => {
                let mut m = AgentMessage::new(
                    MessageType::Hypothesis,
                    AgentRole::Researcher,
                    format!("No supporting evidence found for: {}", query),
                );
                m.meta.confidence = Some(EMPTY_CONFIDENCE);
                m
            }
            Ok(citations) => {
                let confidence =
                    citations.iter().map(|c| c.score).sum::<f64>() / citations.len() as f64;
                let mut m = AgentMessage::new(
                    self.classify(&citations),
                    AgentRole::Researcher,
                    claim(&query, &citations),
                )
                .with_evidence(citations);
                m.meta.confidence = Some(confidence);
                m
            }
            Err(e) => {
                warn!("Researcher degraded on '{}': {}", query, e);
                let mut m = AgentMessage::new(
                    MessageType::Hypothesis,
                    AgentRole::Researcher,
                    format!("Unverified: {}", query),
                );
                m.meta.confidence = Some(DEGRADED_CONFIDENCE);
                m.meta.degraded = Some(e.to_string());
                m
            }
        };

        message.meta.focus = Some(query);
        message
            .to(vec![AgentRole::Critic])
            .in_reply_to(&input.message.id)
    }
}
