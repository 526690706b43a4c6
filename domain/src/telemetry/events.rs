//! Ops event types.
//!
//! Every event carries `{ts, session_id, user_id}` plus a `type` tag and
//! type-specific fields, serialized flat as one JSON object.

use crate::consensus::ConsensusMethod;
use crate::context::ContextHandle;
use crate::message::{AgentRole, MessageType};
use crate::safety::{ApprovalStatus, RiskLevel};
use crate::validation::{ValidationReport, ValidationStrategy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a retrieval call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalStatus {
    Ok,
    Empty,
    Unavailable,
}

/// Type-specific event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OpsEventKind {
    #[serde(rename = "mesh.start")]
    MeshStart {
        trace_id: String,
        goal: String,
        tokens_limit: u64,
        latency_limit_ms: u64,
    },
    #[serde(rename = "rag.retrieve")]
    RagRetrieve {
        k: usize,
        ms: u64,
        sources: Vec<String>,
        status: RetrievalStatus,
    },
    #[serde(rename = "mesh.consensus")]
    MeshConsensus {
        method: ConsensusMethod,
        disagreements: usize,
    },
    #[serde(rename = "mesh.final")]
    MeshFinal {
        trace_id: String,
        tokens: u64,
        ms: u64,
        citations_count: usize,
        hops: u32,
        resolved: bool,
        budget_exceeded: bool,
    },
    #[serde(rename = "rag.validate")]
    RagValidate {
        citation: f64,
        context: f64,
        source: f64,
        relevance: f64,
        score: f64,
        model_version: String,
        strategy: ValidationStrategy,
        weights_version: String,
        attempt: u8,
        passed: bool,
    },
    #[serde(rename = "mesh.hop")]
    MeshHop {
        hop: u32,
        role: AgentRole,
        message_type: MessageType,
        ms: u64,
        tokens: u64,
    },
    #[serde(rename = "safety.classify")]
    SafetyClassify {
        action_id: String,
        action: String,
        risk: RiskLevel,
        status: ApprovalStatus,
    },
    #[serde(rename = "safety.transition")]
    SafetyTransition {
        action_id: String,
        from: ApprovalStatus,
        to: ApprovalStatus,
        actor: String,
        executed: bool,
    },
}

impl OpsEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            OpsEventKind::MeshStart { .. } => "mesh.start",
            OpsEventKind::RagRetrieve { .. } => "rag.retrieve",
            OpsEventKind::MeshConsensus { .. } => "mesh.consensus",
            OpsEventKind::MeshFinal { .. } => "mesh.final",
            OpsEventKind::RagValidate { .. } => "rag.validate",
            OpsEventKind::MeshHop { .. } => "mesh.hop",
            OpsEventKind::SafetyClassify { .. } => "safety.classify",
            OpsEventKind::SafetyTransition { .. } => "safety.transition",
        }
    }

    pub fn from_validation(report: &ValidationReport) -> Self {
        OpsEventKind::RagValidate {
            citation: report.subscores.citation,
            context: report.subscores.context,
            source: report.subscores.source,
            relevance: report.subscores.relevance,
            score: report.score,
            model_version: report.model_version.clone(),
            strategy: report.strategy,
            weights_version: report.weights_version.clone(),
            attempt: report.attempt,
            passed: report.passed,
        }
    }
}

/// One append-only telemetry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpsEvent {
    pub ts: DateTime<Utc>,
    pub session_id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub kind: OpsEventKind,
}

impl OpsEvent {
    pub fn new(ctx: &ContextHandle, kind: OpsEventKind) -> Self {
        Self::for_session(ctx.session_id(), ctx.user_id(), kind)
    }

    pub fn for_session(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        kind: OpsEventKind,
    ) -> Self {
        Self {
            ts: Utc::now(),
            session_id: session_id.into(),
            user_id: user_id.into(),
            kind,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}
