//! Capability table: which agent handles which role.

use super::{Agent, CriticAgent, PlannerAgent, ResearcherAgent, SynthesizerAgent};
use crate::config::MeshConfig;
use crate::services::consensus::ConsensusService;
use crate::services::retrieval::RetrievalService;
use mesh_domain::AgentRole;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default, Clone)]
pub struct AgentRegistry {
    agents: HashMap<AgentRole, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `agent` under its own role, replacing any previous one.
    pub fn register(mut self, agent: Arc<dyn Agent>) -> Self {
        self.agents.insert(agent.role(), agent);
        self
    }

    /// The four standard agents.
    pub fn standard(
        config: &MeshConfig,
        retrieval: Arc<RetrievalService>,
        consensus: Arc<ConsensusService>,
        critic: Arc<CriticAgent>,
    ) -> Self {
        Self::new()
            .register(Arc::new(
                PlannerAgent::new(config.agents.max_subtasks)
                    .with_policy_actions(&config.safety.policy),
            ))
            .register(Arc::new(ResearcherAgent::new(
                retrieval,
                config.retrieval.k,
                config.agents.fact_threshold,
            )))
            .register(critic)
            .register(Arc::new(SynthesizerAgent::new(consensus)))
    }

    pub fn get(&self, role: AgentRole) -> Option<Arc<dyn Agent>> {
        self.agents.get(&role).cloned()
    }

    pub fn contains(&self, role: AgentRole) -> bool {
        self.agents.contains_key(&role)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::telemetry::NoTelemetry;
    use crate::testing::StaticIndex;

    #[test]
    fn test_standard_registry_covers_every_role() {
        let config = MeshConfig::default();
        let telemetry = Arc::new(NoTelemetry);
        let retrieval = Arc::new(RetrievalService::new(
            Arc::new(StaticIndex::new(vec![])),
            config.retrieval.clone(),
            telemetry.clone(),
        ));
        let consensus = Arc::new(ConsensusService::new(config.consensus.rule(), telemetry));
        let registry = AgentRegistry::standard(
            &config,
            retrieval,
            consensus,
            Arc::new(CriticAgent::new(0.5)),
        );

        assert_eq!(registry.len(), AgentRole::ALL.len());
        for role in AgentRole::ALL {
            assert_eq!(registry.get(role).map(|a| a.role()), Some(role));
        }
    }

    #[test]
    fn test_register_replaces_same_role() {
        let registry = AgentRegistry::new()
            .register(Arc::new(CriticAgent::new(0.5)))
            .register(Arc::new(CriticAgent::new(0.9)));
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains(AgentRole::Planner));
    }
}
