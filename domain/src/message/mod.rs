//! Message protocol exchanged between agents.
//!
//! # Overview
//!
//! ```text
//! caller ──TASK──▶ planner ──PLAN──▶ researcher ×N ──HYPOTHESIS──▶ critic
//!                                                         │            │
//!                                                         └──────┬─────┘
//!                                                                ▼
//!                                                   synthesizer ──FINAL
//! ```
//!
//! Every message emitted during one invocation is appended to a [`MeshTrace`]
//! by the bus, in dispatch order.

pub mod entities;
pub mod role;
pub mod trace;

pub use entities::{
    AgentMessage, CALLER, Citation, CritiqueVerdict, MessageId, MessageMeta, MessageType,
};
pub use role::AgentRole;
pub use trace::{HopFailure, MeshTrace, TraceEntry, TraceStats};
