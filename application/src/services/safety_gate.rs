//! Safety Gate: classification, approval and execution of actions.
//!
//! ```text
//!                 ┌──▶ approved ──┐
//! pending ────────┼──▶ rejected   ├──▶ executed (flag, via executor only)
//!   │             └──▶ expired    │
//!   └ (low risk + allow-listed) auto_approved
//! ```
//!
//! All status writes go through the store's conditional update, so two
//! reviewers racing on one record cannot both win. Execution is claimed
//! in-process before the executor is called and confirmed through
//! [`PlanActionStore::mark_executed`], which succeeds at most once.

use crate::ports::action_executor::{ActionExecutor, ExecutorError};
use crate::ports::action_store::{PlanActionStore, StoreError};
use crate::ports::telemetry::TelemetrySink;
use chrono::{DateTime, Duration, Utc};
use mesh_domain::{
    ActionId, ApprovalStatus, ContextHandle, DomainError, OpsEvent, OpsEventKind, PendingAction,
    ProposedAction, ReviewDecision, RiskLevel, RiskPolicy, SYSTEM_ACTOR, TaskRef, TaskStatus,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Actor recorded when the executor confirms an action.
pub const EXECUTOR_ACTOR: &str = "executor";

#[derive(Error, Debug)]
pub enum GateError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transition(#[from] DomainError),

    #[error("Executor failed: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Action {0} is already being executed")]
    InFlight(ActionId),
}

impl GateError {
    /// The request lost a race or asked for an edge the state machine
    /// does not have.
    pub fn is_invalid_transition(&self) -> bool {
        match self {
            GateError::Store(e) => e.is_invalid_transition(),
            GateError::Transition(e) => e.is_invalid_transition(),
            GateError::InFlight(_) => true,
            GateError::Executor(_) => false,
        }
    }
}

/// Removes the execution claim when dropped.
struct Claim<'a> {
    claims: &'a Mutex<HashSet<ActionId>>,
    id: ActionId,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if let Ok(mut claims) = self.claims.lock() {
            claims.remove(&self.id);
        }
    }
}

pub struct SafetyGate {
    policy: RiskPolicy,
    review_window: Duration,
    store: Arc<dyn PlanActionStore>,
    executor: Arc<dyn ActionExecutor>,
    telemetry: Arc<dyn TelemetrySink>,
    claims: Mutex<HashSet<ActionId>>,
}

impl SafetyGate {
    pub fn new(
        policy: RiskPolicy,
        review_window: Duration,
        store: Arc<dyn PlanActionStore>,
        executor: Arc<dyn ActionExecutor>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            policy,
            review_window,
            store,
            executor,
            telemetry,
            claims: Mutex::new(HashSet::new()),
        }
    }

    pub fn classify(&self, action: &ProposedAction) -> RiskLevel {
        self.policy.classify(action)
    }

    /// Classify and record a proposed action.
    ///
    /// Low-risk allow-listed actions are auto-approved and handed to the
    /// executor right away; everything else waits as `pending`. Returns the
    /// record as it stands afterwards.
    pub async fn propose(
        &self,
        proposed: ProposedAction,
        ctx: &ContextHandle,
        task: Option<TaskRef>,
        now: DateTime<Utc>,
    ) -> Result<PendingAction, GateError> {
        let risk = self.policy.classify(&proposed);
        let status = self.policy.initial_status(&proposed, risk);
        let mut record = PendingAction::create(
            proposed,
            risk,
            status,
            ctx.session_id(),
            now,
            self.review_window,
        )
        .with_user(ctx.user_id());
        if let Some(task) = task {
            record = record.with_task_ref(task);
        }

        let id = self.store.create_pending_action(record.clone()).await?;
        info!(
            "Action '{}' classified {} -> {}",
            record.action, risk, status
        );
        self.telemetry.record(OpsEvent::new(
            ctx,
            OpsEventKind::SafetyClassify {
                action_id: id.to_string(),
                action: record.action.clone(),
                risk,
                status,
            },
        ));

        let task_status = if status.is_executable() {
            TaskStatus::InProgress
        } else {
            TaskStatus::Pending
        };
        self.update_task(&record, task_status).await;

        if status != ApprovalStatus::AutoApproved {
            return Ok(record);
        }
        match self.execute(&id, now).await {
            Ok(executed) => Ok(executed),
            Err(e) => {
                warn!("Auto-approved action {} was not executed: {}", id, e);
                Ok(self.store.get_pending_action(&id).await?)
            }
        }
    }

    /// Apply a reviewer's decision.
    ///
    /// A decision arriving after the review window expires the record and
    /// fails with an invalid transition.
    pub async fn review(
        &self,
        id: &ActionId,
        decision: ReviewDecision,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<PendingAction, GateError> {
        let record = self.store.get_pending_action(id).await?;
        let next: ApprovalStatus = decision.into();

        if record.is_overdue(now) {
            self.expire(&record, now).await?;
            return Err(GateError::Transition(DomainError::InvalidTransition {
                from: ApprovalStatus::Expired,
                to: next,
            }));
        }

        let updated = self
            .store
            .update_approval_status(id, record.approval_status, next, actor, now)
            .await?;
        self.record_transition(&updated, record.approval_status, actor);

        if next == ApprovalStatus::Approved {
            self.update_task(&updated, TaskStatus::InProgress).await;
        }
        Ok(updated)
    }

    /// Expire every pending record whose review window has passed.
    pub async fn expire_stale(&self, now: DateTime<Utc>) -> Result<Vec<ActionId>, GateError> {
        let mut expired = Vec::new();
        for record in self.store.list_pending_actions().await? {
            if !record.is_overdue(now) {
                continue;
            }
            match self.expire(&record, now).await {
                Ok(()) => expired.push(record.id),
                Err(e) if e.is_invalid_transition() => {
                    debug!("Record {} changed before it could expire: {}", record.id, e);
                }
                Err(e) => return Err(e),
            }
        }
        if !expired.is_empty() {
            info!("Expired {} stale action(s)", expired.len());
        }
        Ok(expired)
    }

    /// Hand an approved or auto-approved record to the executor.
    ///
    /// At most one call per record reaches the executor concurrently, and
    /// a confirmed record can never be executed again.
    pub async fn execute(
        &self,
        id: &ActionId,
        now: DateTime<Utc>,
    ) -> Result<PendingAction, GateError> {
        let _claim = self.claim(id)?;

        let record = self.store.get_pending_action(id).await?;
        if record.executed {
            return Err(DomainError::AlreadyExecuted.into());
        }
        if !record.approval_status.is_executable() {
            return Err(DomainError::NotExecutable(record.approval_status).into());
        }

        let receipt = self.executor.execute(&record).await?;
        let updated = self
            .store
            .mark_executed(id, EXECUTOR_ACTOR, now, receipt.reward)
            .await?;
        info!("Action {} ('{}') executed", id, updated.action);
        self.record_transition(&updated, record.approval_status, EXECUTOR_ACTOR);
        self.update_task(&updated, TaskStatus::Done).await;
        Ok(updated)
    }

    fn claim(&self, id: &ActionId) -> Result<Claim<'_>, GateError> {
        let mut claims = self
            .claims
            .lock()
            .map_err(|_| GateError::InFlight(id.clone()))?;
        if !claims.insert(id.clone()) {
            return Err(GateError::InFlight(id.clone()));
        }
        Ok(Claim {
            claims: &self.claims,
            id: id.clone(),
        })
    }

    async fn expire(&self, record: &PendingAction, now: DateTime<Utc>) -> Result<(), GateError> {
        let updated = self
            .store
            .update_approval_status(
                &record.id,
                ApprovalStatus::Pending,
                ApprovalStatus::Expired,
                SYSTEM_ACTOR,
                now,
            )
            .await?;
        self.record_transition(&updated, ApprovalStatus::Pending, SYSTEM_ACTOR);
        Ok(())
    }

    fn record_transition(&self, record: &PendingAction, from: ApprovalStatus, actor: &str) {
        self.telemetry.record(OpsEvent::for_session(
            record.session_id.clone(),
            record.user_id.clone(),
            OpsEventKind::SafetyTransition {
                action_id: record.id.to_string(),
                from,
                to: record.approval_status,
                actor: actor.to_string(),
                executed: record.executed,
            },
        ));
    }

    /// Plan bookkeeping never fails the action itself.
    async fn update_task(&self, record: &PendingAction, status: TaskStatus) {
        let Some(task) = &record.task_ref else {
            return;
        };
        if let Err(e) = self
            .store
            .update_task_status(task, status, Some(&record.id))
            .await
        {
            warn!("Failed to update task {}: {}", task.task_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::telemetry::MemoryTelemetry;
    use crate::testing::{MemoryStore, RecordingExecutor, context};
    use mesh_domain::Phase;

    struct Fixture {
        gate: Arc<SafetyGate>,
        store: Arc<MemoryStore>,
        executor: Arc<RecordingExecutor>,
        telemetry: Arc<MemoryTelemetry>,
    }

    fn fixture_with(executor: RecordingExecutor) -> Fixture {
        let store = Arc::new(MemoryStore::default());
        let executor = Arc::new(executor);
        let telemetry = Arc::new(MemoryTelemetry::new());
        let gate = Arc::new(SafetyGate::new(
            RiskPolicy::default(),
            Duration::hours(1),
            store.clone(),
            executor.clone(),
            telemetry.clone(),
        ));
        Fixture {
            gate,
            store,
            executor,
            telemetry,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingExecutor::default())
    }

    fn action(name: &str, confidence: f64) -> ProposedAction {
        ProposedAction::new(name, confidence, "test")
    }

    #[tokio::test]
    async fn test_high_risk_is_never_auto_approved() {
        let f = fixture();
        let record = f
            .gate
            .propose(action("deploy", 0.99), &context("deploy it"), None, Utc::now())
            .await
            .unwrap();

        assert_eq!(record.risk, RiskLevel::High);
        assert_eq!(record.approval_status, ApprovalStatus::Pending);
        assert!(!record.executed);
        assert_eq!(f.executor.calls(), 0);
        assert_eq!(f.telemetry.names(), vec!["safety.classify"]);
    }

    #[tokio::test]
    async fn test_allow_listed_low_risk_runs_immediately() {
        let f = fixture();
        let record = f
            .gate
            .propose(action("tag", 0.9), &context("tag it"), None, Utc::now())
            .await
            .unwrap();

        assert_eq!(record.approval_status, ApprovalStatus::AutoApproved);
        assert!(record.executed);
        assert_eq!(record.reward, Some(1.0));
        assert_eq!(f.executor.calls(), 1);
        assert_eq!(
            f.telemetry.names(),
            vec!["safety.classify", "safety.transition"]
        );
    }

    #[tokio::test]
    async fn test_low_confidence_allow_listed_action_waits() {
        let f = fixture();
        let record = f
            .gate
            .propose(action("tag", 0.2), &context("tag it"), None, Utc::now())
            .await
            .unwrap();
        assert_eq!(record.risk, RiskLevel::Medium);
        assert_eq!(record.approval_status, ApprovalStatus::Pending);
        assert_eq!(f.executor.calls(), 0);
    }

    #[tokio::test]
    async fn test_approve_then_execute_once() {
        let f = fixture();
        let now = Utc::now();
        let record = f
            .gate
            .propose(action("send", 0.8), &context("send it"), None, now)
            .await
            .unwrap();

        let approved = f
            .gate
            .review(&record.id, ReviewDecision::Approved, "alice", now)
            .await
            .unwrap();
        assert_eq!(approved.approval_status, ApprovalStatus::Approved);

        let executed = f.gate.execute(&record.id, now).await.unwrap();
        assert!(executed.executed);

        let again = f.gate.execute(&record.id, now).await.unwrap_err();
        assert!(again.is_invalid_transition());
        assert_eq!(f.executor.calls(), 1);
        assert_eq!(
            executed.status_path(),
            vec![
                ApprovalStatus::Pending,
                ApprovalStatus::Approved,
                ApprovalStatus::Approved
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_action_cannot_execute() {
        let f = fixture();
        let now = Utc::now();
        let record = f
            .gate
            .propose(action("send", 0.8), &context("send it"), None, now)
            .await
            .unwrap();
        f.gate
            .review(&record.id, ReviewDecision::Rejected, "bob", now)
            .await
            .unwrap();

        let err = f.gate.execute(&record.id, now).await.unwrap_err();
        assert!(matches!(
            err,
            GateError::Transition(DomainError::NotExecutable(ApprovalStatus::Rejected))
        ));
        let err = f
            .gate
            .review(&record.id, ReviewDecision::Approved, "alice", now)
            .await
            .unwrap_err();
        assert!(err.is_invalid_transition());
        assert_eq!(f.executor.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_reviews_have_one_winner() {
        let f = fixture();
        let now = Utc::now();
        let record = f
            .gate
            .propose(action("publish", 0.8), &context("publish"), None, now)
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            f.gate.review(&record.id, ReviewDecision::Approved, "alice", now),
            f.gate.review(&record.id, ReviewDecision::Rejected, "bob", now),
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let loser = a.err().or(b.err()).unwrap();
        assert!(loser.is_invalid_transition());

        let stored = f.store.get_pending_action(&record.id).await.unwrap();
        assert_eq!(stored.history.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_executions_reach_executor_once() {
        let f = fixture_with(RecordingExecutor::slow(std::time::Duration::from_millis(20)));
        let now = Utc::now();
        let record = f
            .gate
            .propose(action("send", 0.8), &context("send"), None, now)
            .await
            .unwrap();
        f.gate
            .review(&record.id, ReviewDecision::Approved, "alice", now)
            .await
            .unwrap();

        let gate_a = f.gate.clone();
        let gate_b = f.gate.clone();
        let (id_a, id_b) = (record.id.clone(), record.id.clone());
        let (a, b) = tokio::join!(
            tokio::spawn(async move { gate_a.execute(&id_a, now).await }),
            tokio::spawn(async move { gate_b.execute(&id_b, now).await }),
        );
        let results = [a.unwrap(), b.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(f.executor.calls(), 1);
    }

    #[tokio::test]
    async fn test_late_review_expires_record() {
        let f = fixture();
        let created = Utc::now();
        let record = f
            .gate
            .propose(action("send", 0.8), &context("send"), None, created)
            .await
            .unwrap();

        let late = created + Duration::hours(2);
        let err = f
            .gate
            .review(&record.id, ReviewDecision::Approved, "alice", late)
            .await
            .unwrap_err();
        assert!(err.is_invalid_transition());

        let stored = f.store.get_pending_action(&record.id).await.unwrap();
        assert_eq!(stored.approval_status, ApprovalStatus::Expired);
        assert_eq!(stored.history.last().unwrap().actor, SYSTEM_ACTOR);
    }

    #[tokio::test]
    async fn test_expire_stale_only_touches_overdue_pending() {
        let f = fixture();
        let old = Utc::now() - Duration::hours(3);
        let stale = f
            .gate
            .propose(action("send", 0.8), &context("send"), None, old)
            .await
            .unwrap();
        let fresh = f
            .gate
            .propose(action("notify", 0.8), &context("notify"), None, Utc::now())
            .await
            .unwrap();
        let done = f
            .gate
            .propose(action("tag", 0.9), &context("tag"), None, old)
            .await
            .unwrap();

        let expired = f.gate.expire_stale(Utc::now()).await.unwrap();
        assert_eq!(expired, vec![stale.id.clone()]);

        let fresh = f.store.get_pending_action(&fresh.id).await.unwrap();
        assert_eq!(fresh.approval_status, ApprovalStatus::Pending);
        let done = f.store.get_pending_action(&done.id).await.unwrap();
        assert_eq!(done.approval_status, ApprovalStatus::AutoApproved);
    }

    #[tokio::test]
    async fn test_executor_failure_leaves_record_retryable() {
        let f = fixture_with(RecordingExecutor::failing());
        let record = f
            .gate
            .propose(action("bookmark", 0.9), &context("bookmark"), None, Utc::now())
            .await
            .unwrap();
        assert_eq!(record.approval_status, ApprovalStatus::AutoApproved);
        assert!(!record.executed);

        let err = f.gate.execute(&record.id, Utc::now()).await.unwrap_err();
        assert!(matches!(err, GateError::Executor(_)));
        assert_eq!(f.executor.calls(), 2);
    }

    #[tokio::test]
    async fn test_execution_completes_linked_task() {
        let f = fixture();
        let now = Utc::now();
        let phase = Phase::from_subtasks("tagging", &["tag the doc".to_string()], now);
        let task = TaskRef {
            project_id: "p1".to_string(),
            task_id: phase.tasks[0].id.to_string(),
        };
        f.store.record_phase("p1", phase).await.unwrap();

        let record = f
            .gate
            .propose(action("tag", 0.9), &context("tag"), Some(task), now)
            .await
            .unwrap();
        assert!(record.executed);

        let plan = f.store.get_plan("p1").await.unwrap();
        assert_eq!(plan[0].tasks[0].status, TaskStatus::Done);
        assert_eq!(plan[0].tasks[0].action_id.as_ref(), Some(&record.id));
    }

    #[tokio::test]
    async fn test_transition_events_report_proposing_user() {
        let f = fixture();
        let now = Utc::now();
        let record = f
            .gate
            .propose(action("send", 0.8), &context("send it"), None, now)
            .await
            .unwrap();
        assert_eq!(record.user_id, "user-1");

        f.gate
            .review(&record.id, ReviewDecision::Approved, "alice", now)
            .await
            .unwrap();
        f.gate.execute(&record.id, now).await.unwrap();

        let transitions = f.telemetry.named("safety.transition");
        assert_eq!(transitions.len(), 2);
        assert!(transitions.iter().all(|e| e.user_id == "user-1"));
        match &transitions[0].kind {
            OpsEventKind::SafetyTransition { actor, .. } => assert_eq!(actor, "alice"),
            other => panic!("unexpected event {:?}", other),
        }
        let stored = f.store.get_pending_action(&record.id).await.unwrap();
        assert_eq!(stored.user_id, "user-1");
    }
}
