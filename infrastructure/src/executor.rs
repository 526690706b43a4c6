//! Action executor that records the hand-off instead of acting.
//!
//! Real side effects (sending mail, deploying) belong to deployment-specific
//! executors. This one logs the approved action and confirms it, which is
//! what the CLI wires in.

use async_trait::async_trait;
use mesh_application::{ActionExecutor, ExecutionReceipt, ExecutorError};
use mesh_domain::PendingAction;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct LoggingActionExecutor {
    /// Verbs this executor accepts. Empty accepts everything.
    supported: Vec<String>,
    reward: Option<f64>,
}

impl LoggingActionExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_supported(mut self, actions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.supported = actions.into_iter().map(|a| a.into().to_lowercase()).collect();
        self
    }

    /// Reward reported for every confirmed execution.
    pub fn with_reward(mut self, reward: f64) -> Self {
        self.reward = Some(reward.clamp(0.0, 1.0));
        self
    }
}

#[async_trait]
impl ActionExecutor for LoggingActionExecutor {
    async fn execute(&self, action: &PendingAction) -> Result<ExecutionReceipt, ExecutorError> {
        let verb = action.action.to_lowercase();
        if !self.supported.is_empty() && !self.supported.contains(&verb) {
            return Err(ExecutorError::Unsupported(action.action.clone()));
        }

        let target = action.target.as_deref().unwrap_or("-");
        info!(
            "Executing action {} ({} {}) risk={} status={}",
            action.id, action.action, target, action.risk, action.approval_status
        );

        Ok(ExecutionReceipt {
            reward: self.reward,
            detail: Some(format!("{} {}", action.action, target)),
        })
    }
}
