//! Port for carrying out approved actions.

use async_trait::async_trait;
use mesh_domain::PendingAction;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutorError {
    #[error("Action '{0}' is not supported by this executor")]
    Unsupported(String),

    #[error("Execution failed: {0}")]
    Failed(String),
}

/// What the executor reports back after a confirmed execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReceipt {
    /// Observed outcome, fed back as the record's reward.
    pub reward: Option<f64>,
    pub detail: Option<String>,
}

/// Port for executing an approved or auto-approved action.
///
/// The Safety Gate hands a record to the executor at most once; the
/// executor confirms by returning `Ok`.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, action: &PendingAction) -> Result<ExecutionReceipt, ExecutorError>;
}
