//! Mesh agents and the capability table that routes to them.
//!
//! ```text
//! TASK ──▶ Planner ──PLAN──▶ Researcher ×N ──HYPOTHESIS/FACT──▶ Critic
//!                                                                 │
//!                         FINAL ◀── Synthesizer ◀──── CRITIQUE ───┘
//! ```
//!
//! Agents never fail a hop: a problem they cannot recover from becomes a
//! degraded message (`meta.degraded`) with low confidence. Agents never
//! touch the Plan/Action Store.

pub mod critic;
pub mod planner;
pub mod registry;
pub mod researcher;
pub mod synthesizer;

pub use critic::CriticAgent;
pub use planner::PlannerAgent;
pub use registry::AgentRegistry;
pub use researcher::ResearcherAgent;
pub use synthesizer::SynthesizerAgent;

use async_trait::async_trait;
use mesh_domain::{AgentMessage, AgentRole, ContextHandle, MergeMode};
use std::sync::Arc;
use std::time::Duration;

/// Everything an agent sees for one hop.
#[derive(Debug, Clone)]
pub struct AgentInput {
    /// The message being delivered.
    pub message: AgentMessage,
    /// Trace messages emitted before this hop's batch, in order.
    pub history: Arc<Vec<AgentMessage>>,
    /// Sub-task this hop works on, set when a PLAN fans out.
    pub focus: Option<String>,
    /// Merge mode for synthesizer hops.
    pub mode: MergeMode,
    /// Context latency left when the hop was dispatched.
    pub deadline: Option<Duration>,
}

impl AgentInput {
    pub fn new(message: AgentMessage) -> Self {
        Self {
            message,
            history: Arc::new(Vec::new()),
            focus: None,
            mode: MergeMode::Standard,
            deadline: None,
        }
    }

    pub fn with_history(mut self, history: Arc<Vec<AgentMessage>>) -> Self {
        self.history = history;
        self
    }

    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = Some(focus.into());
        self
    }

    pub fn with_mode(mut self, mode: MergeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// A role-specialized handler.
#[async_trait]
pub trait Agent: Send + Sync {
    fn role(&self) -> AgentRole;

    /// Handle one delivered message and emit exactly one message.
    async fn handle(&self, input: &AgentInput, ctx: &ContextHandle) -> AgentMessage;
}
