//! Proposed and pending actions.

use super::approval::ApprovalStatus;
use super::risk::RiskLevel;
use crate::core::error::DomainError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a pending action record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(String);

impl ActionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An external action implied by an answer, before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedAction {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub expected_gain: f64,
    pub confidence: f64,
    pub explanation: String,
}

impl ProposedAction {
    pub fn new(action: impl Into<String>, confidence: f64, explanation: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            target: None,
            expected_gain: 0.0,
            confidence: confidence.clamp(0.0, 1.0),
            explanation: explanation.into(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_expected_gain(mut self, gain: f64) -> Self {
        self.expected_gain = gain;
        self
    }
}

/// Plan task an action belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub project_id: String,
    pub task_id: String,
}

/// One step of a record's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: ApprovalStatus,
    /// Set on the step that confirmed execution
    #[serde(default)]
    pub executed: bool,
    pub actor: String,
    pub at: DateTime<Utc>,
}

/// Persisted record of an action awaiting or having received approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: ActionId,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub risk: RiskLevel,
    pub approval_status: ApprovalStatus,
    pub expected_gain: f64,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<f64>,
    pub explanation: String,
    pub executed: bool,
    pub session_id: String,
    /// User whose invocation proposed the action
    #[serde(default)]
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    /// End of the review window
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_ref: Option<TaskRef>,
    pub history: Vec<StatusChange>,
}

/// Actor recorded for transitions the gate performs on its own.
pub const SYSTEM_ACTOR: &str = "safety-gate";

impl PendingAction {
    pub fn create(
        proposed: ProposedAction,
        risk: RiskLevel,
        status: ApprovalStatus,
        session_id: impl Into<String>,
        now: DateTime<Utc>,
        review_window: Duration,
    ) -> Self {
        Self {
            id: ActionId::generate(),
            action: proposed.action,
            target: proposed.target,
            risk,
            approval_status: status,
            expected_gain: proposed.expected_gain,
            confidence: proposed.confidence,
            reward: None,
            explanation: proposed.explanation,
            executed: false,
            session_id: session_id.into(),
            user_id: String::new(),
            created_at: now,
            expires_at: now + review_window,
            task_ref: None,
            history: vec![StatusChange {
                status,
                executed: false,
                actor: SYSTEM_ACTOR.to_string(),
                at: now,
            }],
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_task_ref(mut self, task_ref: TaskRef) -> Self {
        self.task_ref = Some(task_ref);
        self
    }

    /// Move to `next`, recording who did it and when.
    ///
    /// Fails without changing anything if the edge is not in the state
    /// machine or the action has already executed.
    pub fn transition(
        &mut self,
        next: ApprovalStatus,
        actor: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.executed || !self.approval_status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.approval_status,
                to: next,
            });
        }
        self.approval_status = next;
        self.history.push(StatusChange {
            status: next,
            executed: false,
            actor: actor.into(),
            at,
        });
        Ok(())
    }

    /// Record the executor's confirmation. The only path that sets `executed`.
    pub fn mark_executed(
        &mut self,
        actor: impl Into<String>,
        at: DateTime<Utc>,
        reward: Option<f64>,
    ) -> Result<(), DomainError> {
        if self.executed {
            return Err(DomainError::AlreadyExecuted);
        }
        if !self.approval_status.is_executable() {
            return Err(DomainError::NotExecutable(self.approval_status));
        }
        self.executed = true;
        self.reward = reward;
        self.history.push(StatusChange {
            status: self.approval_status,
            executed: true,
            actor: actor.into(),
            at,
        });
        Ok(())
    }

    /// Pending past the end of its review window.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.approval_status == ApprovalStatus::Pending && now >= self.expires_at
    }

    /// No further change is possible.
    pub fn is_final(&self) -> bool {
        self.executed || self.approval_status.is_terminal()
    }

    /// Observed status sequence, oldest first.
    pub fn status_path(&self) -> Vec<ApprovalStatus> {
        self.history.iter().map(|h| h.status).collect()
    }
}
