//! Cumulative budget accounting for one invocation.
//!
//! [`BudgetMeter`] is owned by the bus and charged once per appended hop.
//! The [`ContextHandle`](super::ContextHandle) itself is never touched.

use super::handle::ContextLimits;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which limit ran out first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BudgetExhaustion {
    Tokens { used: u64, limit: u64 },
    Latency { elapsed_ms: u64, limit_ms: u64 },
}

impl std::fmt::Display for BudgetExhaustion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetExhaustion::Tokens { used, limit } => {
                write!(f, "token budget exhausted ({}/{})", used, limit)
            }
            BudgetExhaustion::Latency {
                elapsed_ms,
                limit_ms,
            } => write!(f, "latency budget exhausted ({}ms/{}ms)", elapsed_ms, limit_ms),
        }
    }
}

/// Tracks consumption against [`ContextLimits`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetMeter {
    limits: ContextLimits,
    tokens_used: u64,
}

impl BudgetMeter {
    pub fn new(limits: ContextLimits) -> Self {
        Self {
            limits,
            tokens_used: 0,
        }
    }

    pub fn limits(&self) -> ContextLimits {
        self.limits
    }

    pub fn charge_tokens(&mut self, tokens: u64) {
        self.tokens_used = self.tokens_used.saturating_add(tokens);
    }

    pub fn tokens_used(&self) -> u64 {
        self.tokens_used
    }

    pub fn remaining_tokens(&self) -> u64 {
        self.limits.tokens.saturating_sub(self.tokens_used)
    }

    /// Wall-clock time left given how long the invocation has been running.
    pub fn remaining_latency(&self, elapsed: Duration) -> Duration {
        Duration::from_millis(self.limits.latency_ms).saturating_sub(elapsed)
    }

    /// Returns the exhausted limit, tokens checked first.
    pub fn exhausted(&self, elapsed: Duration) -> Option<BudgetExhaustion> {
        if self.tokens_used >= self.limits.tokens {
            return Some(BudgetExhaustion::Tokens {
                used: self.tokens_used,
                limit: self.limits.tokens,
            });
        }
        let elapsed_ms = elapsed.as_millis().min(u64::MAX as u128) as u64;
        if elapsed_ms >= self.limits.latency_ms {
            return Some(BudgetExhaustion::Latency {
                elapsed_ms,
                limit_ms: self.limits.latency_ms,
            });
        }
        None
    }
}
