//! Mesh configuration sections.
//!
//! Every section deserializes with defaults for missing keys, so the file
//! loader in the infrastructure layer can embed them directly.

use mesh_domain::{
    ContextLimits, GroupingRule, RiskPolicy, ValidationStrategy, ValidationWeights,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default budget for contexts built without explicit limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub tokens: u64,
    pub latency_ms: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        let limits = ContextLimits::default();
        Self {
            tokens: limits.tokens,
            latency_ms: limits.latency_ms,
        }
    }
}

impl BudgetConfig {
    pub fn limits(&self) -> ContextLimits {
        ContextLimits::new(self.tokens, self.latency_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Hops dispatched concurrently in one batch.
    pub max_concurrent_hops: usize,
    /// Characters per token when estimating message cost.
    pub chars_per_token: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_concurrent_hops: 4,
            chars_per_token: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub k: usize,
    /// Citations scoring below this are dropped.
    pub min_relevance: f64,
    /// Per-call latency budget, independent of the context budget.
    pub latency_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 5,
            min_relevance: 0.2,
            latency_ms: 2_000,
        }
    }
}

impl RetrievalConfig {
    pub fn latency_budget(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_min_relevance(mut self, min_relevance: f64) -> Self {
        self.min_relevance = min_relevance;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub model_version: String,
    /// Strategy of the first attempt.
    pub strategy: ValidationStrategy,
    pub pass_threshold: f64,
    pub weights: ValidationWeights,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            model_version: "heuristic-v1".to_string(),
            strategy: ValidationStrategy::Default,
            pass_threshold: 0.5,
            weights: ValidationWeights::default(),
        }
    }
}

impl ValidationConfig {
    pub fn with_pass_threshold(mut self, threshold: f64) -> Self {
        self.pass_threshold = threshold;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    pub similarity_threshold: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: GroupingRule::default().similarity_threshold,
        }
    }
}

impl ConsensusConfig {
    pub fn rule(&self) -> GroupingRule {
        GroupingRule::new(self.similarity_threshold)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Upper bound on sub-tasks the planner emits.
    pub max_subtasks: usize,
    /// A researcher reports FACT when at least two citations reach this score.
    pub fact_threshold: f64,
    /// Mean citation score the critic needs to call a claim supported.
    pub support_threshold: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_subtasks: 4,
            fact_threshold: 0.85,
            support_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    #[serde(flatten)]
    pub policy: RiskPolicy,
    /// Pending records expire after this many seconds without review.
    pub review_window_secs: u64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            policy: RiskPolicy::default(),
            review_window_secs: 24 * 60 * 60,
        }
    }
}

/// Longest review window honored (100 years).
const MAX_REVIEW_WINDOW_SECS: u64 = 100 * 365 * 24 * 60 * 60;

impl SafetyConfig {
    pub fn review_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.review_window_secs.min(MAX_REVIEW_WINDOW_SECS) as i64)
    }
}

/// All mesh parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub budget: BudgetConfig,
    pub bus: BusConfig,
    pub retrieval: RetrievalConfig,
    pub validation: ValidationConfig,
    pub consensus: ConsensusConfig,
    pub agents: AgentConfig,
    pub safety: SafetyConfig,
}
