//! Ranking weight adjustments from user feedback.
//!
//! Thumbs and outcomes on previously retrieved evidence nudge a
//! multiplicative weight per target (a cluster id or a snippet/doc id).
//! Weights start at 1.0 and stay within `[MIN_WEIGHT, MAX_WEIGHT]`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const MIN_WEIGHT: f64 = 0.5;
pub const MAX_WEIGHT: f64 = 1.5;

const THUMB_STEP: f64 = 0.10;
const OUTCOME_STEP: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Thumb {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

/// One feedback signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// Cluster id or snippet/doc id
    pub target: String,
    pub thumb: Thumb,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

impl Feedback {
    pub fn new(target: impl Into<String>, thumb: Thumb) -> Self {
        Self {
            target: target.into(),
            thumb,
            outcome: None,
        }
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    fn delta(&self) -> f64 {
        let thumb = match self.thumb {
            Thumb::Up => THUMB_STEP,
            Thumb::Down => -THUMB_STEP,
        };
        let outcome = match self.outcome {
            Some(Outcome::Success) => OUTCOME_STEP,
            Some(Outcome::Failure) => -OUTCOME_STEP,
            None => 0.0,
        };
        thumb + outcome
    }
}

/// Accumulated weights per feedback target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackWeights {
    weights: HashMap<String, f64>,
}

impl FeedbackWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, feedback: &Feedback) -> f64 {
        let entry = self.weights.entry(feedback.target.clone()).or_insert(1.0);
        *entry = (*entry + feedback.delta()).clamp(MIN_WEIGHT, MAX_WEIGHT);
        *entry
    }

    pub fn weight(&self, target: &str) -> f64 {
        self.weights.get(target).copied().unwrap_or(1.0)
    }

    /// Combined weight for a document inside an optional cluster.
    pub fn weight_for(&self, doc_id: &str, cluster_id: Option<&str>) -> f64 {
        let cluster = cluster_id.map(|c| self.weight(c)).unwrap_or(1.0);
        (self.weight(doc_id) * cluster).clamp(MIN_WEIGHT, MAX_WEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_move_and_clamp() {
        let mut w = FeedbackWeights::new();
        assert_eq!(w.weight("doc-1"), 1.0);

        let up = Feedback::new("doc-1", Thumb::Up).with_outcome(Outcome::Success);
        assert!((w.apply(&up) - 1.15).abs() < 1e-9);

        for _ in 0..20 {
            w.apply(&up);
        }
        assert_eq!(w.weight("doc-1"), MAX_WEIGHT);

        let down = Feedback::new("doc-1", Thumb::Down).with_outcome(Outcome::Failure);
        for _ in 0..40 {
            w.apply(&down);
        }
        assert_eq!(w.weight("doc-1"), MIN_WEIGHT);
    }

    #[test]
    fn test_weight_for_combines_cluster_and_doc() {
        let mut w = FeedbackWeights::new();
        w.apply(&Feedback::new("cluster-a", Thumb::Down));
        w.apply(&Feedback::new("doc-1", Thumb::Down));

        assert!((w.weight_for("doc-1", Some("cluster-a")) - 0.81).abs() < 1e-9);
        assert!((w.weight_for("doc-1", None) - 0.9).abs() < 1e-9);
        assert_eq!(w.weight_for("doc-2", Some("other")), 1.0);
    }
}
