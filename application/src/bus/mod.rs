//! Agent Bus: routes messages between agents for one invocation.
//!
//! The bus owns the [`MeshTrace`] and the budget meter. Hops are
//! dispatched in batches of up to `max_concurrent_hops`; results are
//! appended in dispatch order, so hop numbers are gapless no matter which
//! agent finishes first.
//!
//! # Flow
//!
//! ```text
//! initial TASK ─▶ route ─▶ batch ─▶ append + route ─▶ ... queue drained
//!                                                         │
//!          candidates but no FINAL? ─▶ synthesizer hop ◀──┘
//!                                                         │
//!   validate FINAL ─▶ below threshold? ─▶ strict synthesizer hop,
//!                                         escalated strategy (once)
//! ```
//!
//! Before each batch the budget is checked; once it is exhausted nothing
//! new is dispatched and the trace is returned truncated. Hops already in
//! flight run to completion.

mod session;

use crate::agents::{AgentInput, AgentRegistry};
use crate::config::BusConfig;
use crate::ports::telemetry::TelemetrySink;
use crate::services::validation::{ValidationRequest, ValidationService};
use futures::Stream;
use mesh_domain::{
    AgentMessage, AgentRole, BudgetExhaustion, ContextHandle, DomainError, MergeMode, MeshTrace,
    OpsEvent, OpsEventKind, ValidationReport, ValidationStrategy,
};
use session::{BusSession, Delivery};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why an invocation ended without a validated FINAL, or what went wrong
/// along the way. Collected on [`MeshRun::errors`]; the trace is always
/// returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("Invalid context: {0}")]
    InvalidContext(DomainError),

    #[error("Budget exceeded: {0}")]
    BudgetExceeded(BudgetExhaustion),

    #[error("No agent registered for role: {0}")]
    UnknownRole(AgentRole),

    #[error("Validation score {score:.3} below threshold {threshold:.3} ({strategy})")]
    ValidationBelowThreshold {
        score: f64,
        threshold: f64,
        strategy: ValidationStrategy,
    },

    #[error("Unresolved: {0}")]
    Unresolved(String),

    #[error("Cancelled by caller")]
    Cancelled,

    #[error("Mesh task aborted: {0}")]
    Aborted(String),
}

/// Result of one invocation.
#[derive(Debug, Clone)]
pub struct MeshRun {
    pub trace: MeshTrace,
    /// Validation attempts in order (at most two).
    pub validations: Vec<ValidationReport>,
    pub errors: Vec<MeshError>,
}

impl MeshRun {
    /// The last FINAL message, if any.
    pub fn final_message(&self) -> Option<&AgentMessage> {
        self.trace.final_message()
    }

    /// The deciding validation report.
    pub fn validation(&self) -> Option<&ValidationReport> {
        self.validations.last()
    }

    /// A FINAL exists and its last validation passed.
    pub fn is_resolved(&self) -> bool {
        self.final_message().is_some() && self.validation().is_some_and(|r| r.passed)
    }

    pub fn budget_exceeded(&self) -> bool {
        self.trace.is_truncated()
    }

    pub fn was_cancelled(&self) -> bool {
        self.errors.contains(&MeshError::Cancelled)
    }
}

/// Live view of a streaming invocation.
pub struct MeshStream {
    messages: UnboundedReceiver<AgentMessage>,
    cancel: CancellationToken,
    handle: JoinHandle<MeshRun>,
}

impl MeshStream {
    /// Next trace message, in append order. `None` once the run is over.
    pub async fn next(&mut self) -> Option<AgentMessage> {
        self.messages.recv().await
    }

    /// Trace messages as a [`Stream`].
    pub fn messages(&mut self) -> impl Stream<Item = AgentMessage> + '_ {
        futures::stream::poll_fn(move |cx| self.messages.poll_recv(cx))
    }

    /// Stop dispatching new hops. Hops in flight still finish.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the run to finish.
    pub async fn finish(self) -> Result<MeshRun, MeshError> {
        self.handle
            .await
            .map_err(|e| MeshError::Aborted(e.to_string()))
    }
}

pub struct AgentBus {
    registry: AgentRegistry,
    validation: Arc<ValidationService>,
    telemetry: Arc<dyn TelemetrySink>,
    config: BusConfig,
}

impl AgentBus {
    pub fn new(
        registry: AgentRegistry,
        validation: Arc<ValidationService>,
        telemetry: Arc<dyn TelemetrySink>,
        config: BusConfig,
    ) -> Self {
        Self {
            registry,
            validation,
            telemetry,
            config,
        }
    }

    /// Run one invocation to completion.
    pub async fn dispatch(&self, initial: AgentMessage, ctx: ContextHandle) -> MeshRun {
        self.run(initial, Arc::new(ctx), None, CancellationToken::new())
            .await
    }

    /// Run one invocation in the background, streaming trace messages as
    /// they are appended.
    pub fn dispatch_streaming(self: &Arc<Self>, initial: AgentMessage, ctx: ContextHandle) -> MeshStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let bus = Arc::clone(self);
        let token = cancel.clone();
        let handle =
            tokio::spawn(async move { bus.run(initial, Arc::new(ctx), Some(tx), token).await });
        MeshStream {
            messages: rx,
            cancel,
            handle,
        }
    }

    async fn run(
        &self,
        initial: AgentMessage,
        ctx: Arc<ContextHandle>,
        stream: Option<mpsc::UnboundedSender<AgentMessage>>,
        cancel: CancellationToken,
    ) -> MeshRun {
        let mut session = BusSession::new(Arc::clone(&ctx), self.config.chars_per_token, stream);

        if let Err(e) = ctx.validate() {
            warn!("Rejected invocation: {}", e);
            session.errors.push(MeshError::InvalidContext(e));
            return self.finish(session, Vec::new());
        }

        info!("Mesh {} started: {}", session.trace.id, ctx.goal());
        self.telemetry.record(OpsEvent::new(
            &ctx,
            OpsEventKind::MeshStart {
                trace_id: session.trace.id.clone(),
                goal: ctx.goal().to_string(),
                tokens_limit: ctx.limits().tokens,
                latency_limit_ms: ctx.limits().latency_ms,
            },
        ));

        session.record(initial.clone());
        session.route(&initial);
        self.drive(&mut session, &cancel).await;

        let mut reports = Vec::new();
        if !session.is_stopped() {
            self.validate_final(&mut session, &cancel, &mut reports)
                .await;
        }
        self.finish(session, reports)
    }

    /// Dispatch batches until the queue drains, adding one finalizer hop if
    /// candidates exist but nobody produced a FINAL.
    async fn drive(&self, session: &mut BusSession, cancel: &CancellationToken) {
        let mut finalizer_sent = false;
        loop {
            if !session.has_pending() {
                if finalizer_sent || session.has_final() {
                    break;
                }
                let Some(trigger) = session.last_candidate() else {
                    break;
                };
                session.enqueue(Delivery::finalizer(trigger, MergeMode::Standard));
                finalizer_sent = true;
            }
            if !self.may_dispatch(session, cancel) {
                break;
            }
            let batch = session.next_batch(self.config.max_concurrent_hops);
            self.run_batch(session, batch).await;
        }
    }

    /// Check cancellation and budget before dispatching anything new.
    fn may_dispatch(&self, session: &mut BusSession, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            info!("Mesh {} cancelled by caller", session.trace.id);
            session.cancel();
            return false;
        }
        if let Some(exhaustion) = session.exhausted() {
            warn!("Mesh {} stopped: {}", session.trace.id, exhaustion);
            session.truncate(exhaustion);
            return false;
        }
        true
    }

    async fn run_batch(&self, session: &mut BusSession, batch: Vec<Delivery>) {
        let history = session.history();
        let deadline = session.remaining_latency();
        let mut join_set = JoinSet::new();
        let mut slots: Vec<Option<(AgentMessage, u64)>> = vec![None; batch.len()];
        let mut dispatched = Vec::with_capacity(batch.len());

        for (index, delivery) in batch.into_iter().enumerate() {
            let Some(agent) = self.registry.get(delivery.role) else {
                warn!("No agent registered for role {}", delivery.role);
                session.fail_hop(delivery.role, &delivery.message, "no agent registered");
                session.errors.push(MeshError::UnknownRole(delivery.role));
                continue;
            };
            debug!(
                "Dispatching {} to {}{}",
                delivery.message.kind,
                delivery.role,
                delivery
                    .focus
                    .as_deref()
                    .map(|f| format!(" (focus: {})", f))
                    .unwrap_or_default()
            );
            dispatched.push((index, delivery.role, delivery.message.clone()));

            let input = AgentInput {
                message: delivery.message,
                history: Arc::clone(&history),
                focus: delivery.focus,
                mode: delivery.mode,
                deadline: Some(deadline),
            };
            let ctx = Arc::clone(&session.ctx);
            join_set.spawn(async move {
                let start = Instant::now();
                let output = agent.handle(&input, &ctx).await;
                (index, output, start.elapsed().as_millis() as u64)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, output, ms)) => slots[index] = Some((output, ms)),
                Err(e) => warn!("Hop task failed: {}", e),
            }
        }

        for (index, role, delivered) in dispatched {
            match slots[index].take() {
                Some((output, ms)) => self.commit(session, role, output, ms),
                None => session.fail_hop(role, &delivered, "agent task failed"),
            }
        }
    }

    fn commit(&self, session: &mut BusSession, role: AgentRole, mut message: AgentMessage, ms: u64) {
        message.meta.latency_ms.get_or_insert(ms);
        let message_type = message.kind;
        session.route(&message);
        let (hop, tokens) = session.record(message);
        self.telemetry.record(OpsEvent::new(
            &session.ctx,
            OpsEventKind::MeshHop {
                hop,
                role,
                message_type,
                ms,
                tokens,
            },
        ));
    }

    /// Validate the FINAL; on failure retry once with a strict merge and an
    /// escalated strategy.
    async fn validate_final(
        &self,
        session: &mut BusSession,
        cancel: &CancellationToken,
        reports: &mut Vec<ValidationReport>,
    ) {
        let Some(first) = session.trace.final_message().cloned() else {
            session
                .errors
                .push(MeshError::Unresolved("no FINAL message".to_string()));
            return;
        };

        let strategy = self.validation.default_strategy();
        let report = self.score(session, &first, strategy, 1).await;
        let passed = report.passed;
        reports.push(report);
        if passed {
            return;
        }

        let Some(escalated) = strategy.escalate() else {
            session.errors.push(MeshError::Unresolved(format!(
                "no strategy beyond {}",
                strategy
            )));
            return;
        };
        if !self.may_dispatch(session, cancel) {
            return;
        }

        info!("Retrying consensus with {} validation", escalated);
        self.run_batch(session, vec![Delivery::finalizer(first.clone(), MergeMode::Strict)])
            .await;

        let retried = session
            .trace
            .final_message()
            .filter(|m| m.id != first.id)
            .cloned();
        let Some(retried) = retried else {
            session
                .errors
                .push(MeshError::Unresolved("retry produced no FINAL".to_string()));
            return;
        };

        let report = self.score(session, &retried, escalated, 2).await;
        let (passed, score) = (report.passed, report.score);
        reports.push(report);
        if !passed {
            session.errors.push(MeshError::Unresolved(format!(
                "score {:.3} still below threshold after retry",
                score
            )));
        }
    }

    async fn score(
        &self,
        session: &mut BusSession,
        final_message: &AgentMessage,
        strategy: ValidationStrategy,
        attempt: u8,
    ) -> ValidationReport {
        let samples = session.candidates();
        let report = self
            .validation
            .validate(
                ValidationRequest {
                    final_message,
                    samples: &samples,
                    strategy,
                    attempt,
                },
                &session.ctx,
            )
            .await;
        if !report.passed {
            session.errors.push(MeshError::ValidationBelowThreshold {
                score: report.score,
                threshold: self.validation.pass_threshold(),
                strategy,
            });
        }
        report
    }

    fn finish(&self, mut session: BusSession, validations: Vec<ValidationReport>) -> MeshRun {
        let ms = session.elapsed_ms();
        session.trace.finish(ms);

        let run = MeshRun {
            trace: session.trace,
            validations,
            errors: session.errors,
        };
        let citations_count = run.final_message().map(|m| m.evidence.len()).unwrap_or(0);
        info!(
            "Mesh {} finished: {} hop(s), {} token(s), {}ms, {}",
            run.trace.id,
            run.trace.stats.hops,
            run.trace.stats.tokens,
            run.trace.stats.ms,
            if run.is_resolved() { "resolved" } else { "unresolved" }
        );
        self.telemetry.record(OpsEvent::new(
            &session.ctx,
            OpsEventKind::MeshFinal {
                trace_id: run.trace.id.clone(),
                tokens: run.trace.stats.tokens,
                ms: run.trace.stats.ms,
                citations_count,
                hops: run.trace.stats.hops,
                resolved: run.is_resolved(),
                budget_exceeded: run.budget_exceeded(),
            },
        ));
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::CriticAgent;
    use crate::config::MeshConfig;
    use crate::ports::telemetry::MemoryTelemetry;
    use crate::services::consensus::ConsensusService;
    use crate::services::retrieval::RetrievalService;
    use crate::testing::{StaticIndex, hit};
    use mesh_domain::{ContextLimits, MessageType};
    use std::time::Duration;

    struct Fixture {
        bus: Arc<AgentBus>,
        telemetry: Arc<MemoryTelemetry>,
    }

    fn fixture_with(index: StaticIndex, config: MeshConfig, registry: Option<AgentRegistry>) -> Fixture {
        let telemetry = Arc::new(MemoryTelemetry::new());
        let retrieval = Arc::new(RetrievalService::new(
            Arc::new(index),
            config.retrieval.clone(),
            telemetry.clone(),
        ));
        let consensus = Arc::new(ConsensusService::new(
            config.consensus.rule(),
            telemetry.clone(),
        ));
        let critic = Arc::new(CriticAgent::new(config.agents.support_threshold));
        let registry = registry.unwrap_or_else(|| {
            AgentRegistry::standard(&config, retrieval, consensus, critic.clone())
        });
        let validation = Arc::new(ValidationService::new(
            config.validation.clone(),
            critic,
            telemetry.clone(),
        ));
        let bus = Arc::new(AgentBus::new(
            registry,
            validation,
            telemetry.clone(),
            config.bus.clone(),
        ));
        Fixture { bus, telemetry }
    }

    fn fixture(index: StaticIndex) -> Fixture {
        fixture_with(index, MeshConfig::default(), None)
    }

    fn document_x_index() -> StaticIndex {
        StaticIndex::new(vec![
            hit("d1", 0.9, "document X summary: it covers the caching layer"),
            hit("d2", 0.7, "document X explains eviction"),
            hit("d3", 0.4, "summary of the caching layer"),
        ])
    }

    fn ctx(goal: &str, limits: ContextLimits) -> ContextHandle {
        ContextHandle::new("user-1", "session-1", goal, limits)
    }

    fn kinds(run: &MeshRun) -> Vec<MessageType> {
        run.trace.messages().map(|m| m.kind).collect()
    }

    #[tokio::test]
    async fn test_grounded_summary_resolves() {
        let f = fixture(document_x_index());
        let goal = "summarize document X";
        let run = f
            .bus
            .dispatch(AgentMessage::task(goal), ctx(goal, ContextLimits::new(1_000, 30_000)))
            .await;

        assert_eq!(
            kinds(&run),
            vec![
                MessageType::Task,
                MessageType::Plan,
                MessageType::Hypothesis,
                MessageType::Critique,
                MessageType::Final,
            ]
        );
        assert!(run.trace.hops_are_gapless());
        assert!(run.is_resolved(), "errors: {:?}", run.errors);
        assert!(run.errors.is_empty());

        let final_message = run.final_message().unwrap();
        assert_eq!(final_message.evidence.len(), 3);
        assert!(final_message.meta.consensus.is_some());

        let finals = f.telemetry.named("mesh.final");
        assert_eq!(finals.len(), 1);
        match &finals[0].kind {
            OpsEventKind::MeshFinal {
                citations_count,
                resolved,
                budget_exceeded,
                hops,
                ..
            } => {
                assert_eq!(*citations_count, 3);
                assert!(*resolved);
                assert!(!*budget_exceeded);
                assert_eq!(*hops, 5);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(run.trace.stats.tokens <= 1_000);
    }

    #[tokio::test]
    async fn test_event_order_for_one_invocation() {
        let f = fixture(document_x_index());
        let goal = "summarize document X";
        f.bus
            .dispatch(AgentMessage::task(goal), ctx(goal, ContextLimits::default()))
            .await;

        let names = f.telemetry.names();
        assert_eq!(names.first(), Some(&"mesh.start"));
        assert_eq!(names.last(), Some(&"mesh.final"));
        let position = |name: &str| names.iter().position(|n| *n == name).unwrap();
        assert!(position("rag.retrieve") < position("mesh.consensus"));
        assert!(position("mesh.consensus") < position("rag.validate"));
        assert_eq!(f.telemetry.named("mesh.hop").len(), 4);
    }

    #[tokio::test]
    async fn test_no_evidence_stays_ungrounded() {
        let f = fixture(StaticIndex::new(vec![]));
        let goal = "summarize document Y";
        let run = f
            .bus
            .dispatch(AgentMessage::task(goal), ctx(goal, ContextLimits::default()))
            .await;

        let hypothesis = run.trace.of_type(MessageType::Hypothesis)[0];
        assert!(hypothesis.evidence.is_empty());

        let first = &f.telemetry.named("rag.validate")[0];
        match &first.kind {
            OpsEventKind::RagValidate { citation, .. } => assert!(*citation <= 0.1),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(!run.is_resolved());
    }

    #[tokio::test]
    async fn test_failed_validation_retries_once_with_escalation() {
        let f = fixture(StaticIndex::new(vec![]));
        let goal = "summarize document Y";
        let run = f
            .bus
            .dispatch(AgentMessage::task(goal), ctx(goal, ContextLimits::default()))
            .await;

        let strategies: Vec<_> = run.validations.iter().map(|r| (r.strategy, r.attempt)).collect();
        assert_eq!(
            strategies,
            vec![(ValidationStrategy::Default, 1), (ValidationStrategy::Critic, 2)]
        );
        let finals = run.trace.of_type(MessageType::Final);
        assert_eq!(finals.len(), 2);
        let retry_method = finals[1].meta.consensus.as_ref().unwrap().method;
        assert_eq!(retry_method, mesh_domain::ConsensusMethod::EvidenceWeightedStrict);
        assert!(matches!(run.errors.last(), Some(MeshError::Unresolved(_))));
        assert!(run.trace.hops_are_gapless());
    }

    #[tokio::test]
    async fn test_plan_fans_out_to_researchers() {
        let f = fixture(document_x_index());
        let goal = "summarize document X. explain the eviction policy";
        let run = f
            .bus
            .dispatch(AgentMessage::task(goal), ctx(goal, ContextLimits::default()))
            .await;

        assert_eq!(run.trace.of_type(MessageType::Hypothesis).len(), 2);
        assert_eq!(run.trace.of_type(MessageType::Critique).len(), 2);
        assert!(run.trace.hops_are_gapless());
        let focuses: Vec<_> = run
            .trace
            .of_type(MessageType::Hypothesis)
            .iter()
            .map(|m| m.meta.focus.clone().unwrap())
            .collect();
        assert_eq!(focuses, vec!["summarize document X", "explain the eviction policy"]);
    }

    #[tokio::test]
    async fn test_latency_budget_truncates_trace() {
        let slow = || document_x_index().with_delay(Duration::from_millis(30));
        let goal = "summarize document X";

        let unbounded = fixture(slow())
            .bus
            .dispatch(AgentMessage::task(goal), ctx(goal, ContextLimits::unbounded()))
            .await;

        let f = fixture(slow());
        let bounded = f
            .bus
            .dispatch(AgentMessage::task(goal), ctx(goal, ContextLimits::new(1_000, 1)))
            .await;

        assert!(bounded.budget_exceeded());
        assert!(matches!(
            bounded.trace.truncated,
            Some(BudgetExhaustion::Latency { .. })
        ));
        assert!(bounded.trace.len() < unbounded.trace.len());
        assert!(bounded.final_message().is_none());
        assert!(
            bounded
                .errors
                .iter()
                .any(|e| matches!(e, MeshError::BudgetExceeded(_)))
        );
        match &f.telemetry.named("mesh.final")[0].kind {
            OpsEventKind::MeshFinal { budget_exceeded, .. } => assert!(*budget_exceeded),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_token_budget_truncates_trace() {
        let f = fixture(document_x_index());
        let goal = "summarize document X";
        let run = f
            .bus
            .dispatch(AgentMessage::task(goal), ctx(goal, ContextLimits::new(8, 30_000)))
            .await;

        assert!(matches!(
            run.trace.truncated,
            Some(BudgetExhaustion::Tokens { .. })
        ));
        assert_eq!(kinds(&run), vec![MessageType::Task, MessageType::Plan]);
    }

    #[tokio::test]
    async fn test_invalid_context_returns_empty_trace() {
        let f = fixture(document_x_index());
        let run = f
            .bus
            .dispatch(AgentMessage::task(""), ctx("  ", ContextLimits::default()))
            .await;
        assert!(run.trace.is_empty());
        assert!(matches!(run.errors[0], MeshError::InvalidContext(_)));
        assert_eq!(f.telemetry.names(), vec!["mesh.final"]);
    }

    #[tokio::test]
    async fn test_missing_role_is_recorded_not_fatal() {
        let config = MeshConfig::default();
        let telemetry = Arc::new(MemoryTelemetry::new());
        let retrieval = Arc::new(RetrievalService::new(
            Arc::new(document_x_index()),
            config.retrieval.clone(),
            telemetry.clone(),
        ));
        let consensus = Arc::new(ConsensusService::new(config.consensus.rule(), telemetry));
        let registry = AgentRegistry::new()
            .register(Arc::new(crate::agents::PlannerAgent::new(4)))
            .register(Arc::new(crate::agents::ResearcherAgent::new(retrieval, 5, 0.85)))
            .register(Arc::new(crate::agents::SynthesizerAgent::new(consensus)));
        let f = fixture_with(StaticIndex::new(vec![]), config, Some(registry));

        let goal = "summarize document X";
        let run = f
            .bus
            .dispatch(AgentMessage::task(goal), ctx(goal, ContextLimits::default()))
            .await;

        assert!(run.errors.contains(&MeshError::UnknownRole(AgentRole::Critic)));
        assert_eq!(run.trace.failures.len(), 1);
        assert!(run.final_message().is_some());
        assert!(run.trace.hops_are_gapless());
    }

    #[tokio::test]
    async fn test_streaming_matches_trace_order() {
        let f = fixture(document_x_index());
        let goal = "summarize document X";
        let mut stream = f
            .bus
            .dispatch_streaming(AgentMessage::task(goal), ctx(goal, ContextLimits::default()));

        let mut streamed = Vec::new();
        while let Some(message) = stream.next().await {
            streamed.push(message.id);
        }
        let run = stream.finish().await.unwrap();
        let traced: Vec<_> = run.trace.messages().map(|m| m.id.clone()).collect();
        assert_eq!(streamed, traced);
    }

    #[tokio::test]
    async fn test_cancel_stops_dispatching() {
        let f = fixture(document_x_index().with_delay(Duration::from_millis(50)));
        let goal = "summarize document X";
        let mut stream = f
            .bus
            .dispatch_streaming(AgentMessage::task(goal), ctx(goal, ContextLimits::default()));

        let first = stream.next().await.unwrap();
        assert_eq!(first.kind, MessageType::Task);
        stream.cancel();

        let run = stream.finish().await.unwrap();
        assert!(run.was_cancelled());
        assert!(run.final_message().is_none());
        assert!(!run.budget_exceeded());
    }

    #[tokio::test]
    async fn test_slow_retrieval_is_cut_at_context_latency() {
        let f = fixture(document_x_index().with_delay(Duration::from_millis(1_500)));
        let goal = "summarize document X";
        let start = Instant::now();
        let run = f
            .bus
            .dispatch(AgentMessage::task(goal), ctx(goal, ContextLimits::new(1_000, 100)))
            .await;

        assert!(start.elapsed() < Duration::from_millis(1_000));
        assert!(matches!(
            run.trace.truncated,
            Some(BudgetExhaustion::Latency { .. })
        ));
        let hypothesis = run.trace.of_type(MessageType::Hypothesis)[0];
        assert!(hypothesis.meta.degraded.as_deref().unwrap().contains("timed out"));
        assert!(run.trace.stats.ms < 1_000);
    }

    #[tokio::test]
    async fn test_each_subtask_contributes_to_final() {
        let index = StaticIndex::new(vec![
            hit("d1", 0.9, "document X summary covers caching layer"),
            hit("d2", 0.9, "eviction policy removes least recently used entries"),
        ])
        .matching_query();
        let f = fixture(index);
        let goal = "summarize document X. explain the eviction policy";
        let run = f
            .bus
            .dispatch(AgentMessage::task(goal), ctx(goal, ContextLimits::default()))
            .await;

        let final_message = run.trace.of_type(MessageType::Final)[0];
        let mut ids: Vec<_> = final_message
            .evidence
            .iter()
            .map(|c| c.doc_id.as_str())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["d1", "d2"]);
        assert!(final_message.content.contains("document X summary"));
        assert!(final_message.content.contains("eviction policy"));

        let summary = final_message.meta.consensus.as_ref().unwrap();
        assert_eq!(summary.disagreements, 0);
        assert_eq!(summary.subtasks, 2);
        match &f.telemetry.named("mesh.consensus")[0].kind {
            OpsEventKind::MeshConsensus { disagreements, .. } => assert_eq!(*disagreements, 0),
            other => panic!("unexpected event {:?}", other),
        }
    }
}
