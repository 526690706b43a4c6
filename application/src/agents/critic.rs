//! Critic: judges whether a claim is backed by its evidence.

use super::{Agent, AgentInput};
use async_trait::async_trait;
use mesh_domain::{AgentMessage, AgentRole, ContextHandle, CritiqueVerdict, MessageType};

/// Citations at which the critic stops discounting for thin evidence.
const CORROBORATING_SOURCES: usize = 2;

pub struct CriticAgent {
    support_threshold: f64,
}

impl CriticAgent {
    pub fn new(support_threshold: f64) -> Self {
        Self { support_threshold }
    }

    /// Verdict on a single FACT, HYPOTHESIS or FINAL message.
    pub fn assess(&self, message: &AgentMessage) -> CritiqueVerdict {
        let mut concerns = Vec::new();
        let n = message.evidence.len();

        if let Some(reason) = &message.meta.degraded {
            concerns.push(format!("degraded: {}", reason));
        }
        if n == 0 {
            concerns.push("no supporting evidence".to_string());
            return CritiqueVerdict {
                supported: false,
                confidence: 0.0,
                concerns,
            };
        }

        let mean = message.evidence_score() / n as f64;
        if mean < self.support_threshold {
            concerns.push(format!("weak evidence (mean score {:.2})", mean));
        }
        if n < CORROBORATING_SOURCES {
            concerns.push("single source".to_string());
        }

        let breadth = (n as f64 / CORROBORATING_SOURCES as f64).min(1.0);
        CritiqueVerdict {
            supported: mean >= self.support_threshold,
            confidence: (mean * breadth).clamp(0.0, 1.0),
            concerns,
        }
    }
}

#[async_trait]
impl Agent for CriticAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Critic
    }

    async fn handle(&self, input: &AgentInput, _ctx: &ContextHandle) -> AgentMessage {
        let verdict = self.assess(&input.message);
        let content = if verdict.concerns.is_empty() {
            "Claim is supported by its evidence".to_string()
        } else {
            format!(
                "{}: {}",
                if verdict.supported {
                    "Supported with concerns"
                } else {
                    "Not supported"
                },
                verdict.concerns.join("; ")
            )
        };

        let mut critique = AgentMessage::new(MessageType::Critique, AgentRole::Critic, content)
            .in_reply_to(&input.message.id);
        critique.meta.confidence = Some(verdict.confidence);
        critique.meta.critique = Some(verdict);
        critique
    }
}
