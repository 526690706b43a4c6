//! Plan/action store persisted as a single JSON document.
//!
//! Every operation re-reads the file under an in-process lock, applies the
//! change, and writes the result through a temporary file plus rename.
//! Successive CLI invocations therefore see each other's writes, and a
//! crash mid-write leaves the previous document intact. There is no
//! cross-process lock: two processes writing at the same instant can
//! still lose an update.

use super::state::StoreState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mesh_application::{PlanActionStore, StoreError};
use mesh_domain::{ActionId, ApprovalStatus, PendingAction, Phase, TaskRef, TaskStatus};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

pub struct JsonFileActionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileActionStore {
    /// The file is created on first write; parent directories are created
    /// eagerly.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Storage(format!("could not create {}: {}", parent.display(), e))
            })?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<StoreState, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(StoreState::default()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                StoreError::Storage(format!("corrupt store {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreState::default()),
            Err(e) => Err(StoreError::Storage(format!(
                "could not read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn save(&self, state: &StoreState) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::Storage(format!("could not write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            StoreError::Storage(format!("could not replace {}: {}", self.path.display(), e))
        })?;
        debug!("Persisted {} actions to {}", state.actions.len(), self.path.display());
        Ok(())
    }

    async fn read<T>(
        &self,
        f: impl FnOnce(&StoreState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.lock.lock().await;
        let state = self.load().await?;
        f(&state)
    }

    /// Nothing is written when `f` fails.
    async fn write<T>(
        &self,
        f: impl FnOnce(&mut StoreState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.lock.lock().await;
        let mut state = self.load().await?;
        let out = f(&mut state)?;
        self.save(&state).await?;
        Ok(out)
    }
}

#[async_trait]
impl PlanActionStore for JsonFileActionStore {
    async fn create_pending_action(&self, record: PendingAction) -> Result<ActionId, StoreError> {
        self.write(|s| s.create(record)).await
    }

    async fn get_pending_action(&self, id: &ActionId) -> Result<PendingAction, StoreError> {
        self.read(|s| s.get(id)).await
    }

    async fn list_pending_actions(&self) -> Result<Vec<PendingAction>, StoreError> {
        self.read(|s| Ok(s.actions.clone())).await
    }

    async fn update_approval_status(
        &self,
        id: &ActionId,
        expected: ApprovalStatus,
        next: ApprovalStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<PendingAction, StoreError> {
        self.write(|s| s.update_status(id, expected, next, actor, at))
            .await
    }

    async fn mark_executed(
        &self,
        id: &ActionId,
        actor: &str,
        at: DateTime<Utc>,
        reward: Option<f64>,
    ) -> Result<PendingAction, StoreError> {
        self.write(|s| s.mark_executed(id, actor, at, reward)).await
    }

    async fn get_plan(&self, project_id: &str) -> Result<Vec<Phase>, StoreError> {
        self.read(|s| Ok(s.plan(project_id))).await
    }

    async fn record_phase(&self, project_id: &str, phase: Phase) -> Result<(), StoreError> {
        self.write(|s| {
            s.record_phase(project_id, phase);
            Ok(())
        })
        .await
    }

    async fn update_task_status(
        &self,
        task: &TaskRef,
        status: TaskStatus,
        action_id: Option<&ActionId>,
    ) -> Result<(), StoreError> {
        self.write(|s| s.update_task(task, status, action_id)).await
    }
}
