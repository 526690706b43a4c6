//! Agent message envelope and evidence types.

use super::role::AgentRole;
use crate::consensus::ConsensusSummary;
use crate::core::string::estimate_tokens;
use crate::safety::ProposedAction;
use serde::{Deserialize, Serialize};

/// Unique identifier of a message within the mesh.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    Task,
    Fact,
    Hypothesis,
    Critique,
    Plan,
    Final,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Task => "TASK",
            MessageType::Fact => "FACT",
            MessageType::Hypothesis => "HYPOTHESIS",
            MessageType::Critique => "CRITIQUE",
            MessageType::Plan => "PLAN",
            MessageType::Final => "FINAL",
        }
    }

    /// Whether messages of this kind may carry citations.
    pub fn carries_evidence(&self) -> bool {
        matches!(
            self,
            MessageType::Fact | MessageType::Hypothesis | MessageType::Final
        )
    }

    /// Candidate answers the Consensus Engine merges.
    pub fn is_candidate(&self) -> bool {
        matches!(self, MessageType::Fact | MessageType::Hypothesis)
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A piece of retrieved evidence.
///
/// `score` is clamped to `[0, 1]` on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub doc_id: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Inclusive line range within the source document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<(u32, u32)>,
}

impl Citation {
    pub fn new(doc_id: impl Into<String>, score: f64) -> Self {
        Self {
            doc_id: doc_id.into(),
            score: clamp_unit(score),
            snippet: None,
            url: None,
            lines: None,
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_lines(mut self, start: u32, end: u32) -> Self {
        self.lines = Some((start, end));
        self
    }
}

/// A critic's judgement of another message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CritiqueVerdict {
    /// Whether the reviewed message is adequately supported by its evidence
    pub supported: bool,
    /// Confidence in the reviewed message, 0.0 to 1.0
    pub confidence: f64,
    pub concerns: Vec<String>,
}

/// Structured metadata riding along with a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageMeta {
    /// Message this one responds to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<MessageId>,
    /// Sub-tasks of a PLAN
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<String>,
    /// Sub-task a researcher worked on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
    /// Time the producing hop took, stamped by the bus
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Why the message is a degraded stand-in for a failed step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critique: Option<CritiqueVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consensus: Option<ConsensusSummary>,
    /// External action implied by a PLAN or FINAL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ProposedAction>,
}

/// The typed envelope agents exchange.
///
/// # Example
///
/// ```
/// use mesh_domain::message::{AgentMessage, AgentRole, Citation, MessageType};
///
/// let msg = AgentMessage::new(MessageType::Hypothesis, AgentRole::Researcher, "X caches reads")
///     .with_evidence(vec![Citation::new("doc-1", 0.9)])
///     .to(vec![AgentRole::Critic]);
/// assert_eq!(msg.evidence_score(), 0.9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub id: MessageId,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub content: String,
    #[serde(default)]
    pub evidence: Vec<Citation>,
    /// Producer: a role name, or `caller` for the initial TASK
    pub from: String,
    #[serde(default)]
    pub to: Vec<AgentRole>,
    #[serde(default)]
    pub meta: MessageMeta,
}

/// Sender name used for messages injected from outside the mesh.
pub const CALLER: &str = "caller";

impl AgentMessage {
    pub fn new(kind: MessageType, from: AgentRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            kind,
            content: content.into(),
            evidence: Vec::new(),
            from: from.as_str().to_string(),
            to: Vec::new(),
            meta: MessageMeta::default(),
        }
    }

    /// Initial TASK sent by the caller, addressed to the planner.
    pub fn task(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            kind: MessageType::Task,
            content: content.into(),
            evidence: Vec::new(),
            from: CALLER.to_string(),
            to: vec![AgentRole::Planner],
            meta: MessageMeta::default(),
        }
    }

    pub fn to(mut self, roles: Vec<AgentRole>) -> Self {
        self.to = roles;
        self
    }

    pub fn with_evidence(mut self, evidence: Vec<Citation>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_meta(mut self, meta: MessageMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn in_reply_to(mut self, id: &MessageId) -> Self {
        self.meta.in_reply_to = Some(id.clone());
        self
    }

    pub fn is(&self, kind: MessageType) -> bool {
        self.kind == kind
    }

    /// Role that produced this message, if it came from an agent.
    pub fn sender_role(&self) -> Option<AgentRole> {
        self.from.parse().ok()
    }

    /// Sum of citation scores.
    pub fn evidence_score(&self) -> f64 {
        self.evidence.iter().map(|c| c.score).sum()
    }

    /// Token cost of this message for budget accounting.
    pub fn estimated_tokens(&self, chars_per_token: usize) -> u64 {
        let snippets: u64 = self
            .evidence
            .iter()
            .filter_map(|c| c.snippet.as_deref())
            .map(|s| estimate_tokens(s, chars_per_token))
            .sum();
        estimate_tokens(&self.content, chars_per_token) + snippets
    }
}

pub(crate) fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
