//! Append-only log of one mesh invocation.

use super::entities::{AgentMessage, MessageId, MessageType};
use super::role::AgentRole;
use crate::context::BudgetExhaustion;
use serde::{Deserialize, Serialize};

/// One appended message with its position and timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// 1-indexed hop number, gapless within a trace
    pub hop: u32,
    /// Milliseconds since the invocation started when the hop was appended
    pub elapsed_ms: u64,
    pub tokens: u64,
    pub message: AgentMessage,
}

/// Aggregate counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStats {
    pub hops: u32,
    /// Total run time, or the truncation point for a truncated trace
    pub ms: u64,
    pub tokens: u64,
}

/// A delivery that could not be dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopFailure {
    pub role: AgentRole,
    pub message_id: MessageId,
    pub reason: String,
}

/// The ordered log of everything emitted during one invocation.
///
/// Only the bus appends; hop numbers are assigned on append so they are
/// strictly increasing and gapless by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshTrace {
    pub id: String,
    entries: Vec<TraceEntry>,
    pub stats: TraceStats,
    /// Set when the budget ran out before the mesh settled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated: Option<BudgetExhaustion>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<HopFailure>,
}

impl MeshTrace {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            entries: Vec::new(),
            stats: TraceStats::default(),
            truncated: None,
            failures: Vec::new(),
        }
    }

    /// Append a message and return its hop number.
    pub fn append(&mut self, message: AgentMessage, elapsed_ms: u64, tokens: u64) -> u32 {
        let hop = self.entries.len() as u32 + 1;
        self.entries.push(TraceEntry {
            hop,
            elapsed_ms,
            tokens,
            message,
        });
        self.stats.hops = hop;
        self.stats.tokens = self.stats.tokens.saturating_add(tokens);
        self.stats.ms = self.stats.ms.max(elapsed_ms);
        hop
    }

    pub fn record_failure(&mut self, failure: HopFailure) {
        self.failures.push(failure);
    }

    /// Mark the trace as cut short at `ms`.
    pub fn mark_truncated(&mut self, exhaustion: BudgetExhaustion, ms: u64) {
        if self.truncated.is_none() {
            self.truncated = Some(exhaustion);
            self.stats.ms = ms;
        }
    }

    /// Record the total run time unless a truncation point was already set.
    pub fn finish(&mut self, ms: u64) {
        if self.truncated.is_none() {
            self.stats.ms = ms;
        }
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &AgentMessage> {
        self.entries.iter().map(|e| &e.message)
    }

    pub fn of_type(&self, kind: MessageType) -> Vec<&AgentMessage> {
        self.messages().filter(|m| m.kind == kind).collect()
    }

    /// Most recent FINAL message, if any.
    pub fn final_message(&self) -> Option<&AgentMessage> {
        self.entries
            .iter()
            .rev()
            .map(|e| &e.message)
            .find(|m| m.kind == MessageType::Final)
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated.is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hop numbers run 1, 2, 3, ... with no gaps.
    pub fn hops_are_gapless(&self) -> bool {
        self.entries
            .iter()
            .enumerate()
            .all(|(i, e)| e.hop as usize == i + 1)
    }
}

impl Default for MeshTrace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(kind: MessageType) -> AgentMessage {
        AgentMessage::new(kind, AgentRole::Researcher, "content")
    }

    #[test]
    fn test_append_assigns_gapless_hops() {
        let mut trace = MeshTrace::new();
        assert_eq!(trace.append(msg(MessageType::Plan), 1, 5), 1);
        assert_eq!(trace.append(msg(MessageType::Hypothesis), 4, 5), 2);
        assert_eq!(trace.append(msg(MessageType::Final), 9, 5), 3);

        assert!(trace.hops_are_gapless());
        assert_eq!(trace.stats.hops, 3);
        assert_eq!(trace.stats.tokens, 15);
        assert_eq!(trace.stats.ms, 9);
    }

    #[test]
    fn test_truncation_pins_stats_ms() {
        let mut trace = MeshTrace::new();
        trace.append(msg(MessageType::Plan), 2, 1);
        trace.mark_truncated(
            BudgetExhaustion::Latency {
                elapsed_ms: 3,
                limit_ms: 1,
            },
            3,
        );
        trace.finish(50);

        assert!(trace.is_truncated());
        assert_eq!(trace.stats.ms, 3);
    }

    #[test]
    fn test_final_message_returns_latest() {
        let mut trace = MeshTrace::new();
        assert!(trace.final_message().is_none());

        let first = msg(MessageType::Final);
        let second = msg(MessageType::Final);
        let second_id = second.id.clone();
        trace.append(first, 1, 1);
        trace.append(second, 2, 1);

        assert_eq!(trace.final_message().map(|m| &m.id), Some(&second_id));
        assert_eq!(trace.of_type(MessageType::Final).len(), 2);
    }

    #[test]
    fn test_truncated_trace_serde_roundtrip() {
        let mut trace = MeshTrace::new();
        trace.append(msg(MessageType::Plan), 2, 1);
        trace.mark_truncated(BudgetExhaustion::Tokens { used: 12, limit: 10 }, 2);

        let json = serde_json::to_value(&trace).unwrap();
        assert_eq!(json["truncated"]["kind"], "tokens");
        assert_eq!(json["truncated"]["limit"], 10);

        let back: MeshTrace = serde_json::from_value(json).unwrap();
        assert_eq!(back, trace);
        assert!(back.hops_are_gapless());
    }
}
