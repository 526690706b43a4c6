//! Approximate-equivalence grouping of candidate answers.

use crate::core::string::{jaccard, keywords};
use crate::message::AgentMessage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Rule deciding when two candidates say the same thing.
///
/// The threshold is the minimum Jaccard similarity between the keyword sets
/// of two normalized contents. It is a tunable, not a derived constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupingRule {
    pub similarity_threshold: f64,
}

impl GroupingRule {
    pub fn new(similarity_threshold: f64) -> Self {
        Self {
            similarity_threshold: similarity_threshold.clamp(0.0, 1.0),
        }
    }

    pub fn is_equivalent(&self, a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
        jaccard(a, b) >= self.similarity_threshold
    }
}

impl Default for GroupingRule {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.6,
        }
    }
}

/// A set of candidates judged equivalent.
#[derive(Debug, Clone, PartialEq)]
pub struct HypothesisGroup {
    /// Indices into the candidate slice, in emission order
    pub members: Vec<usize>,
    /// Sum of citation scores over all members
    pub evidence_score: f64,
    /// Sum of producing-hop latencies over all members
    pub aggregate_latency_ms: u64,
    representative: BTreeSet<String>,
}

impl HypothesisGroup {
    fn start(index: usize, candidate: &AgentMessage, words: BTreeSet<String>) -> Self {
        Self {
            members: vec![index],
            evidence_score: candidate.evidence_score(),
            aggregate_latency_ms: candidate.meta.latency_ms.unwrap_or(0),
            representative: words,
        }
    }

    fn add(&mut self, index: usize, candidate: &AgentMessage) {
        self.members.push(index);
        self.evidence_score += candidate.evidence_score();
        self.aggregate_latency_ms += candidate.meta.latency_ms.unwrap_or(0);
    }

    /// Index of the first-emitted member.
    pub fn first(&self) -> usize {
        self.members[0]
    }
}

/// Greedy single pass: each candidate joins the first group whose
/// representative (its first member) it matches, or starts a new group.
pub fn group_candidates(candidates: &[&AgentMessage], rule: &GroupingRule) -> Vec<HypothesisGroup> {
    let mut groups: Vec<HypothesisGroup> = Vec::new();

    for (index, candidate) in candidates.iter().enumerate() {
        let words = keywords(&candidate.content);
        match groups
            .iter_mut()
            .find(|g| rule.is_equivalent(&g.representative, &words))
        {
            Some(group) => group.add(index, candidate),
            None => groups.push(HypothesisGroup::start(index, candidate, words)),
        }
    }

    groups
}
