//! Review Action use case
//!
//! The approval surface for pending actions: list, review, expire and
//! execute. Reviewers are identified by an actor name that is recorded on
//! every transition they cause.

use crate::ports::action_store::{PlanActionStore, StoreError};
use crate::services::safety_gate::{GateError, SafetyGate};
use chrono::{DateTime, Utc};
use mesh_domain::{ActionId, ApprovalStatus, PendingAction, ReviewDecision};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewActionError {
    #[error("A reviewer name is required")]
    MissingActor,

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReviewActionError {
    pub fn is_invalid_transition(&self) -> bool {
        match self {
            ReviewActionError::Gate(e) => e.is_invalid_transition(),
            ReviewActionError::Store(e) => e.is_invalid_transition(),
            ReviewActionError::MissingActor => false,
        }
    }
}

/// Input for the ReviewAction use case
#[derive(Debug, Clone)]
pub struct ReviewActionInput {
    pub id: ActionId,
    pub decision: ReviewDecision,
    pub actor: String,
    /// Hand an approved action to the executor right away.
    pub execute: bool,
    pub at: DateTime<Utc>,
}

impl ReviewActionInput {
    pub fn new(id: ActionId, decision: ReviewDecision, actor: impl Into<String>) -> Self {
        Self {
            id,
            decision,
            actor: actor.into(),
            execute: false,
            at: Utc::now(),
        }
    }

    pub fn and_execute(mut self) -> Self {
        self.execute = true;
        self
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = at;
        self
    }
}

#[derive(Clone)]
pub struct ReviewActionUseCase {
    gate: Arc<SafetyGate>,
    store: Arc<dyn PlanActionStore>,
}

impl ReviewActionUseCase {
    pub fn new(gate: Arc<SafetyGate>, store: Arc<dyn PlanActionStore>) -> Self {
        Self { gate, store }
    }

    /// Apply a decision, optionally executing an approval.
    pub async fn execute(&self, input: ReviewActionInput) -> Result<PendingAction, ReviewActionError> {
        let actor = input.actor.trim();
        if actor.is_empty() {
            return Err(ReviewActionError::MissingActor);
        }
        let record = self
            .gate
            .review(&input.id, input.decision, actor, input.at)
            .await?;
        if input.execute && record.approval_status == ApprovalStatus::Approved {
            return Ok(self.gate.execute(&input.id, input.at).await?);
        }
        Ok(record)
    }

    /// Records, optionally only those in `status`.
    pub async fn list(
        &self,
        status: Option<ApprovalStatus>,
    ) -> Result<Vec<PendingAction>, ReviewActionError> {
        let records = self.store.list_pending_actions().await?;
        Ok(records
            .into_iter()
            .filter(|r| status.is_none_or(|s| r.approval_status == s))
            .collect())
    }

    pub async fn get(&self, id: &ActionId) -> Result<PendingAction, ReviewActionError> {
        Ok(self.store.get_pending_action(id).await?)
    }

    pub async fn expire_stale(&self, now: DateTime<Utc>) -> Result<Vec<ActionId>, ReviewActionError> {
        Ok(self.gate.expire_stale(now).await?)
    }

    pub async fn execute_action(
        &self,
        id: &ActionId,
        now: DateTime<Utc>,
    ) -> Result<PendingAction, ReviewActionError> {
        Ok(self.gate.execute(id, now).await?)
    }
}
