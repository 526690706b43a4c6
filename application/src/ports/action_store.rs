//! Port for the Plan/Action Store.
//!
//! Pending action records and plan phases live behind this port. The
//! store owns the conditional update that serializes competing approval
//! transitions on one record.
//!
//! # Consistency
//!
//! - [`PlanActionStore::update_approval_status`] is a check-and-set: it
//!   succeeds only if the stored status still equals `expected`, and the
//!   edge is valid in the approval state machine.
//! - [`PlanActionStore::mark_executed`] is the only way `executed` becomes
//!   true, and succeeds at most once per record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mesh_domain::{ActionId, ApprovalStatus, DomainError, PendingAction, Phase, TaskRef, TaskStatus};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Status of {id} changed concurrently: expected {expected}, found {actual}")]
    Conflict {
        id: ActionId,
        expected: ApprovalStatus,
        actual: ApprovalStatus,
    },

    #[error(transparent)]
    Rejected(#[from] DomainError),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl StoreError {
    /// The write lost a race or broke the state machine.
    pub fn is_invalid_transition(&self) -> bool {
        match self {
            StoreError::Conflict { .. } => true,
            StoreError::Rejected(e) => e.is_invalid_transition(),
            _ => false,
        }
    }
}

#[async_trait]
pub trait PlanActionStore: Send + Sync {
    async fn create_pending_action(&self, record: PendingAction) -> Result<ActionId, StoreError>;

    async fn get_pending_action(&self, id: &ActionId) -> Result<PendingAction, StoreError>;

    /// All records, oldest first.
    async fn list_pending_actions(&self) -> Result<Vec<PendingAction>, StoreError>;

    /// Conditional status update; returns the updated record.
    async fn update_approval_status(
        &self,
        id: &ActionId,
        expected: ApprovalStatus,
        next: ApprovalStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<PendingAction, StoreError>;

    /// Record the executor's confirmation; returns the updated record.
    async fn mark_executed(
        &self,
        id: &ActionId,
        actor: &str,
        at: DateTime<Utc>,
        reward: Option<f64>,
    ) -> Result<PendingAction, StoreError>;

    /// Phases recorded for a project, oldest first. Unknown projects have none.
    async fn get_plan(&self, project_id: &str) -> Result<Vec<Phase>, StoreError>;

    async fn record_phase(&self, project_id: &str, phase: Phase) -> Result<(), StoreError>;

    /// Update one task's status, optionally linking the action it produced.
    async fn update_task_status(
        &self,
        task: &TaskRef,
        status: TaskStatus,
        action_id: Option<&ActionId>,
    ) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_counts_as_invalid_transition() {
        let err = StoreError::Conflict {
            id: ActionId::new("a1"),
            expected: ApprovalStatus::Pending,
            actual: ApprovalStatus::Rejected,
        };
        assert!(err.is_invalid_transition());
        assert!(StoreError::Rejected(DomainError::AlreadyExecuted).is_invalid_transition());
        assert!(!StoreError::Storage("disk".into()).is_invalid_transition());
    }
}
