//! Application-level configuration.
//!
//! [`MeshConfig`] groups the parameters that control one mesh:
//!
//! - [`BudgetConfig`]: default token and latency limits for new contexts
//! - [`BusConfig`]: hop concurrency and token estimation
//! - [`RetrievalConfig`]: `k`, relevance floor and retrieval latency budget
//! - [`ValidationConfig`]: model version, strategy, pass threshold, weights
//! - [`ConsensusConfig`]: grouping threshold
//! - [`AgentConfig`]: planner and researcher tuning
//! - [`SafetyConfig`]: risk policy and review window

pub mod mesh_config;

pub use mesh_config::{
    AgentConfig, BudgetConfig, BusConfig, ConsensusConfig, MeshConfig, RetrievalConfig,
    SafetyConfig, ValidationConfig,
};
