//! Risk levels and the classification policy.

use super::action::ProposedAction;
use super::approval::ApprovalStatus;
use crate::core::string::normalize;
use serde::{Deserialize, Serialize};

/// Risk level of a proposed external action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Reversible, low-impact actions (e.g., drafting, tagging)
    Low,
    /// Actions with visible side effects (e.g., sending, publishing)
    Medium,
    /// Destructive or costly actions (e.g., deleting, deploying, paying)
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// One level up, saturating at `High`.
    pub fn raise(&self) -> RiskLevel {
        match self {
            RiskLevel::Low => RiskLevel::Medium,
            RiskLevel::Medium | RiskLevel::High => RiskLevel::High,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification rules and the auto-approve allow-list.
///
/// Action names are compared after normalization, and a list entry matches
/// when it equals the action name or any word of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskPolicy {
    pub high_risk_actions: Vec<String>,
    pub medium_risk_actions: Vec<String>,
    /// Low-risk actions that skip human review
    pub auto_approve: Vec<String>,
    /// Below this confidence a low-risk action is treated as medium
    pub min_confidence: f64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            high_risk_actions: ["delete", "deploy", "drop", "pay", "transfer", "purchase"]
                .map(String::from)
                .to_vec(),
            medium_risk_actions: ["send", "email", "publish", "post", "update", "notify"]
                .map(String::from)
                .to_vec(),
            auto_approve: ["tag", "draft", "bookmark"].map(String::from).to_vec(),
            min_confidence: 0.5,
        }
    }
}

impl RiskPolicy {
    pub fn classify(&self, action: &ProposedAction) -> RiskLevel {
        let name = normalize(&action.action);
        let base = if matches_any(&name, &self.high_risk_actions) {
            RiskLevel::High
        } else if matches_any(&name, &self.medium_risk_actions) {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        if base == RiskLevel::Low && action.confidence < self.min_confidence {
            base.raise()
        } else {
            base
        }
    }

    pub fn is_allow_listed(&self, action: &str) -> bool {
        let name = normalize(action);
        self.auto_approve.iter().any(|a| normalize(a) == name)
    }

    /// Status a new record starts in.
    pub fn initial_status(&self, action: &ProposedAction, risk: RiskLevel) -> ApprovalStatus {
        if risk == RiskLevel::Low && self.is_allow_listed(&action.action) {
            ApprovalStatus::AutoApproved
        } else {
            ApprovalStatus::Pending
        }
    }
}

fn matches_any(name: &str, list: &[String]) -> bool {
    list.iter().map(|entry| normalize(entry)).any(|entry| {
        !entry.is_empty() && (entry == name || name.split(' ').any(|word| word == entry))
    })
}
