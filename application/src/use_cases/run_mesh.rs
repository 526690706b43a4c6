//! Run Mesh use case
//!
//! Entry point for one invocation: dispatches the initial TASK through the
//! bus, then settles the outcome. Settling records the planner's
//! decomposition as a plan phase (when the context names a project) and
//! hands any action implied by a resolved FINAL to the Safety Gate.

use crate::bus::{AgentBus, MeshRun, MeshStream};
use crate::ports::action_store::{PlanActionStore, StoreError};
use crate::services::safety_gate::{GateError, SafetyGate};
use chrono::Utc;
use mesh_domain::core::string::normalize;
use mesh_domain::{
    AgentMessage, ContextHandle, MessageType, PendingAction, Phase, ProposedAction, TaskRef,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Follow-up failures after the mesh itself finished. They never discard
/// the trace.
#[derive(Error, Debug)]
pub enum RunMeshError {
    #[error("Failed to record plan: {0}")]
    Plan(#[from] StoreError),

    #[error("Safety gate failed: {0}")]
    Gate(#[from] GateError),
}

/// Input for the RunMesh use case
#[derive(Debug, Clone)]
pub struct RunMeshInput {
    pub context: ContextHandle,
    /// Defaults to a TASK carrying the goal.
    pub initial: Option<AgentMessage>,
}

impl RunMeshInput {
    pub fn new(context: ContextHandle) -> Self {
        Self {
            context,
            initial: None,
        }
    }

    pub fn with_initial(mut self, message: AgentMessage) -> Self {
        self.initial = Some(message);
        self
    }

    fn initial_message(&self) -> AgentMessage {
        self.initial
            .clone()
            .unwrap_or_else(|| AgentMessage::task(self.context.goal()))
    }
}

#[derive(Debug)]
pub struct RunMeshOutput {
    pub run: MeshRun,
    /// Phase recorded for the context's project.
    pub phase: Option<Phase>,
    /// Record created for the action the FINAL implied.
    pub action: Option<PendingAction>,
    pub warnings: Vec<RunMeshError>,
}

/// Use case for running one mesh invocation
#[derive(Clone)]
pub struct RunMeshUseCase {
    bus: Arc<AgentBus>,
    gate: Arc<SafetyGate>,
    store: Arc<dyn PlanActionStore>,
}

impl RunMeshUseCase {
    pub fn new(bus: Arc<AgentBus>, gate: Arc<SafetyGate>, store: Arc<dyn PlanActionStore>) -> Self {
        Self { bus, gate, store }
    }

    pub async fn execute(&self, input: RunMeshInput) -> RunMeshOutput {
        let initial = input.initial_message();
        let run = self.bus.dispatch(initial, input.context.clone()).await;
        self.settle(run, &input.context).await
    }

    /// Start the invocation in the background. Pass the finished run to
    /// [`settle`](Self::settle).
    pub fn start_streaming(&self, input: &RunMeshInput) -> MeshStream {
        self.bus
            .dispatch_streaming(input.initial_message(), input.context.clone())
    }

    /// Record the plan and route any implied action through the gate.
    pub async fn settle(&self, run: MeshRun, ctx: &ContextHandle) -> RunMeshOutput {
        let mut warnings = Vec::new();

        let mut phase = match self.record_plan(&run, ctx).await {
            Ok(phase) => phase,
            Err(e) => {
                warn!("{}", e);
                warnings.push(e);
                None
            }
        };

        let proposed = run.final_message().and_then(|m| m.meta.action.clone());
        let action = match proposed {
            Some(proposed) if run.is_resolved() => {
                let task = phase.as_ref().zip(ctx.project_id()).and_then(|(p, project)| {
                    task_for_action(p, &proposed).map(|task_id| TaskRef {
                        project_id: project.to_string(),
                        task_id,
                    })
                });
                match self.gate.propose(proposed, ctx, task, Utc::now()).await {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!("Safety gate failed: {}", e);
                        warnings.push(RunMeshError::Gate(e));
                        None
                    }
                }
            }
            Some(proposed) => {
                info!(
                    "Not proposing '{}': the answer is unresolved",
                    proposed.action
                );
                None
            }
            None => None,
        };

        // The gate may have linked or completed a task since it was recorded.
        let recorded = phase.as_ref().map(|p| p.id.clone());
        if action.is_some()
            && let (Some(project), Some(id)) = (ctx.project_id(), recorded)
        {
            match self.store.get_plan(project).await {
                Ok(plan) => phase = plan.into_iter().find(|p| p.id == id).or(phase),
                Err(e) => warnings.push(RunMeshError::Plan(e)),
            }
        }

        RunMeshOutput {
            run,
            phase,
            action,
            warnings,
        }
    }

    async fn record_plan(&self, run: &MeshRun, ctx: &ContextHandle) -> Result<Option<Phase>, RunMeshError> {
        let Some(project) = ctx.project_id() else {
            return Ok(None);
        };
        let Some(plan) = run.trace.of_type(MessageType::Plan).into_iter().next() else {
            return Ok(None);
        };
        let phase = Phase::from_subtasks(ctx.goal(), &plan.meta.subtasks, Utc::now());
        self.store.record_phase(project, phase.clone()).await?;
        info!(
            "Recorded phase {} with {} task(s) for project {}",
            phase.id,
            phase.tasks.len(),
            project
        );
        Ok(Some(phase))
    }
}

/// The task whose description starts with the action's verb.
fn task_for_action(phase: &Phase, action: &ProposedAction) -> Option<String> {
    let verb = normalize(&action.action);
    phase
        .tasks
        .iter()
        .find(|t| normalize(&t.description).split(' ').next() == Some(verb.as_str()))
        .map(|t| t.id.to_string())
}
