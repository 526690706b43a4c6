//! Process-local plan/action store.

use super::state::StoreState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mesh_application::{PlanActionStore, StoreError};
use mesh_domain::{ActionId, ApprovalStatus, PendingAction, Phase, TaskRef, TaskStatus};
use std::sync::{Mutex, MutexGuard};

/// Keeps records in memory; every update holds one lock, so each
/// check-and-set is atomic.
#[derive(Default)]
pub struct InMemoryActionStore {
    state: Mutex<StoreState>,
}

impl InMemoryActionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Storage("store lock poisoned".to_string()))
    }
}

#[async_trait]
impl PlanActionStore for InMemoryActionStore {
    async fn create_pending_action(&self, record: PendingAction) -> Result<ActionId, StoreError> {
        self.lock()?.create(record)
    }

    async fn get_pending_action(&self, id: &ActionId) -> Result<PendingAction, StoreError> {
        self.lock()?.get(id)
    }

    async fn list_pending_actions(&self) -> Result<Vec<PendingAction>, StoreError> {
        Ok(self.lock()?.actions.clone())
    }

    async fn update_approval_status(
        &self,
        id: &ActionId,
        expected: ApprovalStatus,
        next: ApprovalStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<PendingAction, StoreError> {
        self.lock()?.update_status(id, expected, next, actor, at)
    }

    async fn mark_executed(
        &self,
        id: &ActionId,
        actor: &str,
        at: DateTime<Utc>,
        reward: Option<f64>,
    ) -> Result<PendingAction, StoreError> {
        self.lock()?.mark_executed(id, actor, at, reward)
    }

    async fn get_plan(&self, project_id: &str) -> Result<Vec<Phase>, StoreError> {
        Ok(self.lock()?.plan(project_id))
    }

    async fn record_phase(&self, project_id: &str, phase: Phase) -> Result<(), StoreError> {
        self.lock()?.record_phase(project_id, phase);
        Ok(())
    }

    async fn update_task_status(
        &self,
        task: &TaskRef,
        status: TaskStatus,
        action_id: Option<&ActionId>,
    ) -> Result<(), StoreError> {
        self.lock()?.update_task(task, status, action_id)
    }
}
