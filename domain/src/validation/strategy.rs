//! Scoring strategies and their escalation order.

use serde::{Deserialize, Serialize};

/// How a FINAL message is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStrategy {
    /// Single-pass heuristic scoring
    #[default]
    Default,
    /// A critic pass reviews the FINAL and tempers the heuristic subscores
    Critic,
    /// Each subscore is the fraction of sampled candidates that pass it
    Majority,
}

impl ValidationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStrategy::Default => "default",
            ValidationStrategy::Critic => "critic",
            ValidationStrategy::Majority => "majority",
        }
    }

    /// Next strategy to try after a below-threshold result.
    pub fn escalate(&self) -> Option<ValidationStrategy> {
        match self {
            ValidationStrategy::Default => Some(ValidationStrategy::Critic),
            ValidationStrategy::Critic => Some(ValidationStrategy::Majority),
            ValidationStrategy::Majority => None,
        }
    }
}

impl std::fmt::Display for ValidationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ValidationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(ValidationStrategy::Default),
            "critic" => Ok(ValidationStrategy::Critic),
            "majority" => Ok(ValidationStrategy::Majority),
            _ => Err(format!(
                "Unknown validation strategy: {}. Valid: default, critic, majority",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalation_chain_terminates() {
        assert_eq!(
            ValidationStrategy::Default.escalate(),
            Some(ValidationStrategy::Critic)
        );
        assert_eq!(
            ValidationStrategy::Critic.escalate(),
            Some(ValidationStrategy::Majority)
        );
        assert_eq!(ValidationStrategy::Majority.escalate(), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            "MAJORITY".parse::<ValidationStrategy>().unwrap(),
            ValidationStrategy::Majority
        );
        assert!("vote".parse::<ValidationStrategy>().is_err());
    }
}
