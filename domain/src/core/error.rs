//! Domain error types

use crate::message::AgentRole;
use crate::safety::ApprovalStatus;
use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: ApprovalStatus,
        to: ApprovalStatus,
    },

    #[error("Action already executed")]
    AlreadyExecuted,

    #[error("Action not executable in status {0}")]
    NotExecutable(ApprovalStatus),

    #[error("No agent registered for role: {0}")]
    UnknownRole(AgentRole),

    #[error("Invalid context: {0}")]
    InvalidContext(String),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),
}

impl DomainError {
    /// Check if this error is a rejected state-machine transition
    pub fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidTransition { .. }
                | DomainError::AlreadyExecuted
                | DomainError::NotExecutable(_)
        )
    }
}
