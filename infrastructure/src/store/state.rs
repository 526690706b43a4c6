//! Store contents and the update rules shared by every store adapter.

use chrono::{DateTime, Utc};
use mesh_application::StoreError;
use mesh_domain::{ActionId, ApprovalStatus, PendingAction, Phase, TaskRef, TaskStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct StoreState {
    /// Oldest first.
    pub actions: Vec<PendingAction>,
    pub plans: BTreeMap<String, Vec<Phase>>,
}

impl StoreState {
    pub fn create(&mut self, record: PendingAction) -> Result<ActionId, StoreError> {
        if self.actions.iter().any(|a| a.id == record.id) {
            return Err(StoreError::Storage(format!(
                "action {} already exists",
                record.id
            )));
        }
        let id = record.id.clone();
        self.actions.push(record);
        Ok(id)
    }

    pub fn get(&self, id: &ActionId) -> Result<PendingAction, StoreError> {
        self.actions
            .iter()
            .find(|a| &a.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Apply `f` to a copy and commit only on success, so a failed update
    /// leaves the stored record untouched.
    fn update(
        &mut self,
        id: &ActionId,
        f: impl FnOnce(&mut PendingAction) -> Result<(), StoreError>,
    ) -> Result<PendingAction, StoreError> {
        let slot = self
            .actions
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let mut next = slot.clone();
        f(&mut next)?;
        *slot = next.clone();
        Ok(next)
    }

    pub fn update_status(
        &mut self,
        id: &ActionId,
        expected: ApprovalStatus,
        next: ApprovalStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<PendingAction, StoreError> {
        self.update(id, |record| {
            if record.approval_status != expected {
                return Err(StoreError::Conflict {
                    id: id.clone(),
                    expected,
                    actual: record.approval_status,
                });
            }
            record.transition(next, actor, at)?;
            Ok(())
        })
    }

    pub fn mark_executed(
        &mut self,
        id: &ActionId,
        actor: &str,
        at: DateTime<Utc>,
        reward: Option<f64>,
    ) -> Result<PendingAction, StoreError> {
        self.update(id, |record| {
            record.mark_executed(actor, at, reward)?;
            Ok(())
        })
    }

    pub fn plan(&self, project_id: &str) -> Vec<Phase> {
        self.plans.get(project_id).cloned().unwrap_or_default()
    }

    pub fn record_phase(&mut self, project_id: &str, phase: Phase) {
        self.plans
            .entry(project_id.to_string())
            .or_default()
            .push(phase);
    }

    pub fn update_task(
        &mut self,
        task: &TaskRef,
        status: TaskStatus,
        action_id: Option<&ActionId>,
    ) -> Result<(), StoreError> {
        let entry = self
            .plans
            .get_mut(&task.project_id)
            .and_then(|phases| {
                phases
                    .iter_mut()
                    .flat_map(|p| p.tasks.iter_mut())
                    .find(|t| t.id.as_str() == task.task_id)
            })
            .ok_or_else(|| {
                StoreError::NotFound(format!("{}/{}", task.project_id, task.task_id))
            })?;
        entry.status = status;
        if let Some(id) = action_id {
            entry.action_id = Some(id.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use mesh_domain::{ProposedAction, RiskLevel};

    fn pending() -> PendingAction {
        PendingAction::create(
            ProposedAction::new("send", 0.8, "send the report"),
            RiskLevel::Medium,
            ApprovalStatus::Pending,
            "s-1",
            Utc::now(),
            Duration::hours(1),
        )
    }

    #[test]
    fn test_failed_update_leaves_record_untouched() {
        let mut state = StoreState::default();
        let id = state.create(pending()).unwrap();
        state
            .update_status(&id, ApprovalStatus::Pending, ApprovalStatus::Approved, "alice", Utc::now())
            .unwrap();
        let before = state.get(&id).unwrap();

        let err = state
            .update_status(&id, ApprovalStatus::Approved, ApprovalStatus::Rejected, "bob", Utc::now())
            .unwrap_err();
        assert!(err.is_invalid_transition());
        assert_eq!(state.get(&id).unwrap(), before);
    }

    #[test]
    fn test_duplicate_create_is_rejected() {
        let mut state = StoreState::default();
        let record = pending();
        state.create(record.clone()).unwrap();
        assert!(matches!(state.create(record), Err(StoreError::Storage(_))));
    }

    #[test]
    fn test_unknown_task_is_not_found() {
        let mut state = StoreState::default();
        let task = TaskRef {
            project_id: "p".into(),
            task_id: "1".into(),
        };
        assert!(matches!(
            state.update_task(&task, TaskStatus::Done, None),
            Err(StoreError::NotFound(_))
        ));
    }
}
