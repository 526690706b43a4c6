//! Merge policy: the best-evidenced group becomes the FINAL answer.

use super::grouping::{GroupingRule, HypothesisGroup, group_candidates};
use crate::message::{AgentMessage, AgentRole, Citation, MessageType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

/// How strictly critiques filter candidates before grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// All candidates compete
    #[default]
    Standard,
    /// Candidates a critic judged unsupported are excluded, unless that
    /// would exclude every candidate
    Strict,
}

/// Method label recorded in `mesh.consensus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusMethod {
    EvidenceWeighted,
    EvidenceWeightedStrict,
}

impl ConsensusMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusMethod::EvidenceWeighted => "evidence_weighted",
            ConsensusMethod::EvidenceWeightedStrict => "evidence_weighted_strict",
        }
    }
}

impl From<MergeMode> for ConsensusMethod {
    fn from(mode: MergeMode) -> Self {
        match mode {
            MergeMode::Standard => ConsensusMethod::EvidenceWeighted,
            MergeMode::Strict => ConsensusMethod::EvidenceWeightedStrict,
        }
    }
}

impl std::fmt::Display for ConsensusMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the merge decided, attached to the FINAL message.
///
/// Counts are summed over sub-tasks; candidates only compete with others
/// that share their `meta.focus`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusSummary {
    pub method: ConsensusMethod,
    /// Groups beyond the winner, counted within each sub-task
    pub disagreements: usize,
    pub groups: usize,
    pub winner_size: usize,
    pub candidates: usize,
    pub critiques_considered: usize,
    /// Distinct sub-tasks merged into the FINAL
    #[serde(default = "one")]
    pub subtasks: usize,
}

fn one() -> usize {
    1
}

/// A FINAL message plus the summary that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub final_message: AgentMessage,
    pub summary: ConsensusSummary,
}

/// Winner of one sub-task's competition.
struct FocusWinner<'a> {
    representative: &'a AgentMessage,
    members: Vec<&'a AgentMessage>,
    confidence: f64,
    groups: usize,
    competing: usize,
}

/// Merge candidate answers and critiques into one FINAL message.
///
/// Candidates are partitioned by sub-task (`meta.focus`) and each
/// partition is merged on its own. The FINAL joins the per-sub-task
/// winners in first-emission order and carries the union of their
/// evidence. Returns `None` when there is nothing to merge.
///
/// # Example
///
/// ```
/// use mesh_domain::consensus::{merge, GroupingRule, MergeMode};
/// use mesh_domain::message::{AgentMessage, AgentRole, Citation, MessageType};
///
/// let a = AgentMessage::new(MessageType::Hypothesis, AgentRole::Researcher, "X uses a cache")
///     .with_evidence(vec![Citation::new("d1", 0.9)]);
/// let b = AgentMessage::new(MessageType::Hypothesis, AgentRole::Researcher, "X uses a queue")
///     .with_evidence(vec![Citation::new("d2", 0.3)]);
///
/// let outcome = merge(&[a, b], &[], &GroupingRule::new(0.9), MergeMode::Standard).unwrap();
/// assert_eq!(outcome.final_message.content, "X uses a cache");
/// assert_eq!(outcome.summary.disagreements, 1);
/// ```
pub fn merge(
    candidates: &[AgentMessage],
    critiques: &[AgentMessage],
    rule: &GroupingRule,
    mode: MergeMode,
) -> Option<MergeOutcome> {
    let winners: Vec<FocusWinner<'_>> = partition_by_focus(candidates)
        .iter()
        .filter_map(|partition| merge_focus(partition, critiques, rule, mode))
        .collect();
    let first = winners.first()?;

    let summary = ConsensusSummary {
        method: mode.into(),
        disagreements: winners.iter().map(|w| w.groups - 1).sum(),
        groups: winners.iter().map(|w| w.groups).sum(),
        winner_size: winners.iter().map(|w| w.members.len()).sum(),
        candidates: winners.iter().map(|w| w.competing).sum(),
        critiques_considered: critiques.len(),
        subtasks: winners.len(),
    };

    let mut contents: Vec<&str> = Vec::with_capacity(winners.len());
    for winner in &winners {
        let content = winner.representative.content.as_str();
        if !contents.contains(&content) {
            contents.push(content);
        }
    }
    let members: Vec<&AgentMessage> = winners
        .iter()
        .flat_map(|w| w.members.iter().copied())
        .collect();
    let confidence =
        winners.iter().map(|w| w.confidence).sum::<f64>() / winners.len() as f64;

    let mut final_message = AgentMessage::new(
        MessageType::Final,
        AgentRole::Synthesizer,
        contents.join("\n"),
    )
    .with_evidence(union_evidence(&members))
    .in_reply_to(&first.representative.id);
    final_message.meta.confidence = Some(confidence);
    final_message.meta.consensus = Some(summary.clone());

    Some(MergeOutcome {
        final_message,
        summary,
    })
}

/// Candidates grouped by sub-task, partitions in first-emission order.
fn partition_by_focus(candidates: &[AgentMessage]) -> Vec<Vec<&AgentMessage>> {
    let mut partitions: Vec<(Option<&str>, Vec<&AgentMessage>)> = Vec::new();
    for candidate in candidates {
        let focus = candidate.meta.focus.as_deref();
        match partitions.iter_mut().find(|(f, _)| *f == focus) {
            Some((_, members)) => members.push(candidate),
            None => partitions.push((focus, vec![candidate])),
        }
    }
    partitions.into_iter().map(|(_, members)| members).collect()
}

fn merge_focus<'a>(
    partition: &[&'a AgentMessage],
    critiques: &[AgentMessage],
    rule: &GroupingRule,
    mode: MergeMode,
) -> Option<FocusWinner<'a>> {
    let competing = select_candidates(partition, critiques, mode);
    let groups = group_candidates(&competing, rule);
    let winner = groups.iter().min_by(|a, b| rank(a, b))?;

    let total_score: f64 = groups.iter().map(|g| g.evidence_score).sum();
    let confidence = if total_score > 0.0 {
        winner.evidence_score / total_score
    } else {
        0.0
    };

    Some(FocusWinner {
        representative: competing[winner.first()],
        members: winner.members.iter().map(|&i| competing[i]).collect(),
        confidence,
        groups: groups.len(),
        competing: competing.len(),
    })
}

/// Ordering where the preferred group sorts first: higher evidence, then
/// lower aggregate latency, then earlier emission.
fn rank(a: &HypothesisGroup, b: &HypothesisGroup) -> Ordering {
    const EPSILON: f64 = 1e-9;
    let diff = b.evidence_score - a.evidence_score;
    if diff.abs() > EPSILON {
        return if diff > 0.0 {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    a.aggregate_latency_ms
        .cmp(&b.aggregate_latency_ms)
        .then(a.first().cmp(&b.first()))
}

fn select_candidates<'a>(
    candidates: &[&'a AgentMessage],
    critiques: &[AgentMessage],
    mode: MergeMode,
) -> Vec<&'a AgentMessage> {
    let all: Vec<&'a AgentMessage> = candidates.to_vec();
    if mode == MergeMode::Standard {
        return all;
    }

    let rejected: HashSet<_> = critiques
        .iter()
        .filter(|c| c.meta.critique.as_ref().is_some_and(|v| !v.supported))
        .filter_map(|c| c.meta.in_reply_to.as_ref())
        .collect();

    let kept: Vec<&'a AgentMessage> = all
        .iter()
        .copied()
        .filter(|m| !rejected.contains(&m.id))
        .collect();

    if kept.is_empty() { all } else { kept }
}

/// Citations of all members, one per document (highest score kept),
/// ordered by descending score then document id.
fn union_evidence(members: &[&AgentMessage]) -> Vec<Citation> {
    let mut by_doc: BTreeMap<&str, &Citation> = BTreeMap::new();
    for citation in members.iter().flat_map(|m| m.evidence.iter()) {
        by_doc
            .entry(citation.doc_id.as_str())
            .and_modify(|existing| {
                if citation.score > existing.score {
                    *existing = citation;
                }
            })
            .or_insert(citation);
    }

    let mut evidence: Vec<Citation> = by_doc.into_values().cloned().collect();
    evidence.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    evidence
}
