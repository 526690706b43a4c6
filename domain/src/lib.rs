//! Domain layer for reasoning-mesh
//!
//! This crate contains the core types and rules of the reasoning mesh.
//! It has no dependencies on infrastructure, async runtimes or I/O.
//!
//! # Core Concepts
//!
//! ## Mesh invocation
//!
//! A caller binds a goal and a budget into a [`ContextHandle`]. Agents
//! exchange [`AgentMessage`]s; everything emitted is appended to a
//! [`MeshTrace`] in dispatch order.
//!
//! ## Grounding and scoring
//!
//! - **Consensus**: candidate answers are grouped by approximate equivalence
//!   and the best-evidenced group becomes the FINAL answer
//! - **Validation**: the FINAL answer is scored on four weighted subscores
//!
//! ## Safety
//!
//! Actions implied by an answer are classified by [`RiskPolicy`] and tracked
//! as [`PendingAction`] records through the approval state machine.

pub mod consensus;
pub mod context;
pub mod core;
pub mod message;
pub mod plan;
pub mod retrieval;
pub mod safety;
pub mod telemetry;
pub mod validation;

// Re-export commonly used types
pub use consensus::{
    ConsensusMethod, ConsensusSummary, GroupingRule, MergeMode, MergeOutcome, merge,
};
pub use context::{BudgetExhaustion, BudgetMeter, ContextHandle, ContextLimits};
pub use core::error::DomainError;
pub use message::{
    AgentMessage, AgentRole, Citation, CritiqueVerdict, HopFailure, MeshTrace, MessageId,
    MessageMeta, MessageType, TraceEntry, TraceStats,
};
pub use plan::{Phase, PlanTask, TaskId, TaskStatus};
pub use retrieval::{Feedback, FeedbackWeights, Outcome, Thumb};
pub use safety::{
    ActionId, ApprovalStatus, PendingAction, ProposedAction, ReviewDecision, RiskLevel,
    RiskPolicy, SYSTEM_ACTOR, StatusChange, TaskRef,
};
pub use telemetry::{OpsEvent, OpsEventKind, RetrievalStatus};
pub use validation::{Subscores, ValidationReport, ValidationStrategy, ValidationWeights};
