//! Immutable context handle for one mesh invocation.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Resource limits for a whole invocation, applied cumulatively across hops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextLimits {
    /// Token budget across all emitted messages
    pub tokens: u64,
    /// Wall-clock budget in milliseconds
    pub latency_ms: u64,
}

impl ContextLimits {
    pub fn new(tokens: u64, latency_ms: u64) -> Self {
        Self { tokens, latency_ms }
    }

    /// Effectively unbounded limits, useful for comparison runs.
    pub fn unbounded() -> Self {
        Self {
            tokens: u64::MAX,
            latency_ms: u64::MAX,
        }
    }
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            tokens: 4_000,
            latency_ms: 30_000,
        }
    }
}

/// Request scope bound to a goal and a budget.
///
/// Fields are private: a handle is built once and then only read. Remaining
/// budget lives in [`BudgetMeter`](super::BudgetMeter), never in here.
///
/// # Example
///
/// ```
/// use mesh_domain::context::{ContextHandle, ContextLimits};
///
/// let ctx = ContextHandle::new("u-1", "s-1", "summarize document X", ContextLimits::new(1000, 5000))
///     .with_hints(vec!["focus on caching".to_string()]);
/// assert_eq!(ctx.goal(), "summarize document X");
/// assert_eq!(ctx.limits().tokens, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextHandle {
    user_id: String,
    session_id: String,
    goal: String,
    hints: Vec<String>,
    cluster_ids: Vec<String>,
    limits: ContextLimits,
    project_id: Option<String>,
}

impl ContextHandle {
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        goal: impl Into<String>,
        limits: ContextLimits,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            goal: goal.into(),
            hints: Vec::new(),
            cluster_ids: Vec::new(),
            limits,
            project_id: None,
        }
    }

    pub fn with_hints(mut self, hints: Vec<String>) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_cluster_ids(mut self, cluster_ids: Vec<String>) -> Self {
        self.cluster_ids = cluster_ids;
        self
    }

    /// Attach the project whose plan should record this invocation's decomposition.
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    // ==================== Accessors ====================

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    pub fn cluster_ids(&self) -> &[String] {
        &self.cluster_ids
    }

    pub fn limits(&self) -> ContextLimits {
        self.limits
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Validate the handle before an invocation starts.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.goal.trim().is_empty() {
            return Err(DomainError::InvalidContext("goal cannot be empty".into()));
        }
        if self.limits.tokens == 0 {
            return Err(DomainError::InvalidContext("token limit cannot be 0".into()));
        }
        if self.limits.latency_ms == 0 {
            return Err(DomainError::InvalidContext("latency limit cannot be 0".into()));
        }
        Ok(())
    }
}
