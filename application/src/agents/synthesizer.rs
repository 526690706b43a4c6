//! Synthesizer: merges candidates and critiques into a FINAL answer.

use super::{Agent, AgentInput};
use crate::services::consensus::ConsensusService;
use async_trait::async_trait;
use mesh_domain::{AgentMessage, AgentRole, ContextHandle, MessageType, ProposedAction};
use std::sync::Arc;
use tracing::warn;

/// Citations at which an action's expected gain stops growing.
const FULL_SUPPORT_CITATIONS: usize = 3;

pub struct SynthesizerAgent {
    consensus: Arc<ConsensusService>,
}

impl SynthesizerAgent {
    pub fn new(consensus: Arc<ConsensusService>) -> Self {
        Self { consensus }
    }
}

/// The planned action, re-weighted by how well the FINAL is supported.
fn ground_action(history: &[AgentMessage], final_message: &AgentMessage) -> Option<ProposedAction> {
    let planned = history
        .iter()
        .rev()
        .filter(|m| m.is(MessageType::Plan))
        .find_map(|m| m.meta.action.clone())?;

    let confidence = final_message.meta.confidence.unwrap_or(0.0);
    let n = final_message.evidence.len();
    let support = (n as f64 / FULL_SUPPORT_CITATIONS as f64).min(1.0);
    let explanation = format!("{}; supported by {} citation(s)", planned.explanation, n);

    let mut action = ProposedAction::new(planned.action, confidence, explanation)
        .with_expected_gain(confidence * support);
    action.target = planned.target;
    Some(action)
}

#[async_trait]
impl Agent for SynthesizerAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Synthesizer
    }

    async fn handle(&self, input: &AgentInput, ctx: &ContextHandle) -> AgentMessage {
        let candidates: Vec<AgentMessage> = input
            .history
            .iter()
            .filter(|m| m.kind.is_candidate())
            .cloned()
            .collect();
        let critiques: Vec<AgentMessage> = input
            .history
            .iter()
            .filter(|m| m.is(MessageType::Critique))
            .cloned()
            .collect();

        let Some(outcome) = self
            .consensus
            .merge(&candidates, &critiques, input.mode, ctx)
        else {
            warn!("Synthesizer found no candidate answers");
            let mut empty = AgentMessage::new(
                MessageType::Final,
                AgentRole::Synthesizer,
                "No candidate answers to merge",
            )
            .in_reply_to(&input.message.id);
            empty.meta.confidence = Some(0.0);
            empty.meta.degraded = Some("no candidates".to_string());
            return empty;
        };

        let mut final_message = outcome.final_message;
        final_message.meta.action = ground_action(&input.history, &final_message);
        final_message
    }
}
