//! Wiring of services, agents and use cases from configuration and ports.

use crate::agents::{AgentRegistry, CriticAgent};
use crate::bus::AgentBus;
use crate::config::MeshConfig;
use crate::ports::action_executor::ActionExecutor;
use crate::ports::action_store::PlanActionStore;
use crate::ports::embedding_index::EmbeddingIndex;
use crate::ports::telemetry::TelemetrySink;
use crate::services::consensus::ConsensusService;
use crate::services::retrieval::RetrievalService;
use crate::services::safety_gate::SafetyGate;
use crate::services::validation::ValidationService;
use crate::use_cases::review_action::ReviewActionUseCase;
use crate::use_cases::run_mesh::RunMeshUseCase;
use std::sync::Arc;

/// Adapters the mesh runs against.
pub struct MeshPorts {
    pub index: Arc<dyn EmbeddingIndex>,
    pub store: Arc<dyn PlanActionStore>,
    pub executor: Arc<dyn ActionExecutor>,
    pub telemetry: Arc<dyn TelemetrySink>,
}

/// A fully wired mesh.
pub struct Mesh {
    pub retrieval: Arc<RetrievalService>,
    pub bus: Arc<AgentBus>,
    pub gate: Arc<SafetyGate>,
    store: Arc<dyn PlanActionStore>,
}

impl Mesh {
    pub fn build(config: &MeshConfig, ports: MeshPorts) -> Self {
        let MeshPorts {
            index,
            store,
            executor,
            telemetry,
        } = ports;

        let retrieval = Arc::new(RetrievalService::new(
            index,
            config.retrieval.clone(),
            Arc::clone(&telemetry),
        ));
        let consensus = Arc::new(ConsensusService::new(
            config.consensus.rule(),
            Arc::clone(&telemetry),
        ));
        let critic = Arc::new(CriticAgent::new(config.agents.support_threshold));
        let validation = Arc::new(ValidationService::new(
            config.validation.clone(),
            Arc::clone(&critic),
            Arc::clone(&telemetry),
        ));
        let registry =
            AgentRegistry::standard(config, Arc::clone(&retrieval), consensus, critic);
        let bus = Arc::new(AgentBus::new(
            registry,
            validation,
            Arc::clone(&telemetry),
            config.bus.clone(),
        ));
        let gate = Arc::new(SafetyGate::new(
            config.safety.policy.clone(),
            config.safety.review_window(),
            Arc::clone(&store),
            executor,
            telemetry,
        ));

        Self {
            retrieval,
            bus,
            gate,
            store,
        }
    }

    pub fn run_mesh(&self) -> RunMeshUseCase {
        RunMeshUseCase::new(
            Arc::clone(&self.bus),
            Arc::clone(&self.gate),
            Arc::clone(&self.store),
        )
    }

    pub fn review_action(&self) -> ReviewActionUseCase {
        ReviewActionUseCase::new(Arc::clone(&self.gate), Arc::clone(&self.store))
    }
}
