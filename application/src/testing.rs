//! Scripted port implementations shared by the unit tests.

use crate::ports::action_executor::{ActionExecutor, ExecutionReceipt, ExecutorError};
use crate::ports::action_store::{PlanActionStore, StoreError};
use crate::ports::embedding_index::{EmbeddingIndex, IndexError, IndexHit, IndexQuery};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use mesh_domain::core::string::keywords;
use mesh_domain::{
    ActionId, ApprovalStatus, ContextHandle, ContextLimits, PendingAction, Phase, TaskRef,
    TaskStatus,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) fn context(goal: &str) -> ContextHandle {
    ContextHandle::new("user-1", "session-1", goal, ContextLimits::new(1_000, 30_000))
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub(crate) fn hit(doc_id: &str, similarity: f64, snippet: &str) -> IndexHit {
    IndexHit::new(doc_id, similarity, base_time()).with_snippet(snippet)
}

/// Hit updated `minutes` after a fixed base time.
pub(crate) fn hit_at(doc_id: &str, similarity: f64, minutes: i64) -> IndexHit {
    IndexHit::new(doc_id, similarity, base_time() + chrono::Duration::minutes(minutes))
}

/// Index that answers every query with the same hits, or with the hits
/// whose snippet shares a keyword with the query once `matching_query` is set.
pub(crate) struct StaticIndex {
    hits: Vec<IndexHit>,
    failure: Option<IndexError>,
    delay: Option<Duration>,
    matching: bool,
    calls: AtomicUsize,
}

impl StaticIndex {
    pub(crate) fn new(hits: Vec<IndexHit>) -> Self {
        Self {
            hits,
            failure: None,
            delay: None,
            matching: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing(error: IndexError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new(vec![])
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn matching_query(mut self) -> Self {
        self.matching = true;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingIndex for StaticIndex {
    async fn search(&self, query: &IndexQuery) -> Result<Vec<IndexHit>, IndexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let query_words = keywords(&query.text);
        Ok(self
            .hits
            .iter()
            .filter(|h| {
                query.cluster_ids.is_empty()
                    || h.cluster_id
                        .as_ref()
                        .is_some_and(|c| query.cluster_ids.contains(c))
            })
            .filter(|h| {
                !self.matching
                    || h.snippet
                        .as_deref()
                        .is_some_and(|s| !keywords(s).is_disjoint(&query_words))
            })
            .cloned()
            .collect())
    }
}

/// Store keeping everything in process memory.
#[derive(Default)]
pub(crate) struct MemoryStore {
    actions: Mutex<Vec<PendingAction>>,
    plans: Mutex<HashMap<String, Vec<Phase>>>,
}

impl MemoryStore {
    fn with_action<T>(
        &self,
        id: &ActionId,
        f: impl FnOnce(&mut PendingAction) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut actions = self.actions.lock().unwrap();
        let record = actions
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        f(record)
    }
}

#[async_trait]
impl PlanActionStore for MemoryStore {
    async fn create_pending_action(&self, record: PendingAction) -> Result<ActionId, StoreError> {
        let id = record.id.clone();
        self.actions.lock().unwrap().push(record);
        Ok(id)
    }

    async fn get_pending_action(&self, id: &ActionId) -> Result<PendingAction, StoreError> {
        self.with_action(id, |r| Ok(r.clone()))
    }

    async fn list_pending_actions(&self) -> Result<Vec<PendingAction>, StoreError> {
        Ok(self.actions.lock().unwrap().clone())
    }

    async fn update_approval_status(
        &self,
        id: &ActionId,
        expected: ApprovalStatus,
        next: ApprovalStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<PendingAction, StoreError> {
        self.with_action(id, |r| {
            if r.approval_status != expected {
                return Err(StoreError::Conflict {
                    id: id.clone(),
                    expected,
                    actual: r.approval_status,
                });
            }
            r.transition(next, actor, at)?;
            Ok(r.clone())
        })
    }

    async fn mark_executed(
        &self,
        id: &ActionId,
        actor: &str,
        at: DateTime<Utc>,
        reward: Option<f64>,
    ) -> Result<PendingAction, StoreError> {
        self.with_action(id, |r| {
            r.mark_executed(actor, at, reward)?;
            Ok(r.clone())
        })
    }

    async fn get_plan(&self, project_id: &str) -> Result<Vec<Phase>, StoreError> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .get(project_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn record_phase(&self, project_id: &str, phase: Phase) -> Result<(), StoreError> {
        self.plans
            .lock()
            .unwrap()
            .entry(project_id.to_string())
            .or_default()
            .push(phase);
        Ok(())
    }

    async fn update_task_status(
        &self,
        task: &TaskRef,
        status: TaskStatus,
        action_id: Option<&ActionId>,
    ) -> Result<(), StoreError> {
        let mut plans = self.plans.lock().unwrap();
        let entry = plans
            .get_mut(&task.project_id)
            .and_then(|phases| {
                phases
                    .iter_mut()
                    .flat_map(|p| p.tasks.iter_mut())
                    .find(|t| t.id.as_str() == task.task_id)
            })
            .ok_or_else(|| StoreError::NotFound(task.task_id.clone()))?;
        entry.status = status;
        if let Some(id) = action_id {
            entry.action_id = Some(id.clone());
        }
        Ok(())
    }
}

/// Executor that counts calls and can be told to fail or stall.
#[derive(Default)]
pub(crate) struct RecordingExecutor {
    calls: AtomicUsize,
    fail: bool,
    delay: Option<Duration>,
    matching: bool,
}

impl RecordingExecutor {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub(crate) fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub(crate) fn matching_query(mut self) -> Self {
        self.matching = true;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActionExecutor for RecordingExecutor {
    async fn execute(&self, action: &PendingAction) -> Result<ExecutionReceipt, ExecutorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ExecutorError::Failed(format!("{} refused", action.action)));
        }
        Ok(ExecutionReceipt {
            reward: Some(1.0),
            detail: None,
        })
    }
}
