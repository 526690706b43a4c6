//! Agent roles.

use serde::{Deserialize, Serialize};

/// The closed set of roles a mesh participant can play.
///
/// Dispatch goes through a role → handler table held by the bus, so adding a
/// role means extending this enum and registering a handler for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Decomposes a TASK into a PLAN
    Planner,
    /// Turns PLAN/TASK into FACT/HYPOTHESIS using retrieval
    Researcher,
    /// Merges hypotheses and critiques into FINAL
    Synthesizer,
    /// Emits CRITIQUE evaluating another message
    Critic,
}

impl AgentRole {
    pub const ALL: [AgentRole; 4] = [
        AgentRole::Planner,
        AgentRole::Researcher,
        AgentRole::Synthesizer,
        AgentRole::Critic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Planner => "planner",
            AgentRole::Researcher => "researcher",
            AgentRole::Synthesizer => "synthesizer",
            AgentRole::Critic => "critic",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planner" => Ok(AgentRole::Planner),
            "researcher" => Ok(AgentRole::Researcher),
            "synthesizer" => Ok(AgentRole::Synthesizer),
            "critic" => Ok(AgentRole::Critic),
            _ => Err(format!(
                "Unknown role: {}. Valid: planner, researcher, synthesizer, critic",
                s
            )),
        }
    }
}
