//! Application layer for reasoning-mesh
//!
//! This crate contains the agents, the agent bus, the services they share,
//! port definitions and use cases. It depends only on the domain layer.

pub mod agents;
pub mod bus;
pub mod config;
pub mod mesh;
pub mod ports;
pub mod services;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use agents::{Agent, AgentInput, AgentRegistry};
pub use bus::{AgentBus, MeshError, MeshRun, MeshStream};
pub use config::MeshConfig;
pub use mesh::{Mesh, MeshPorts};
pub use ports::{
    action_executor::{ActionExecutor, ExecutionReceipt, ExecutorError},
    action_store::{PlanActionStore, StoreError},
    embedding_index::{EmbeddingIndex, IndexError, IndexHit, IndexQuery},
    telemetry::{MemoryTelemetry, NoTelemetry, TelemetrySink},
};
pub use services::{
    consensus::ConsensusService,
    retrieval::{RetrievalError, RetrievalRequest, RetrievalService},
    safety_gate::{GateError, SafetyGate},
    validation::{ValidationRequest, ValidationService},
};
pub use use_cases::review_action::{ReviewActionError, ReviewActionInput, ReviewActionUseCase};
pub use use_cases::run_mesh::{RunMeshError, RunMeshInput, RunMeshOutput, RunMeshUseCase};
