//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Mesh sections reuse the application's config types directly; the rest
//! are read by the adapters and the CLI.

mod sections;

pub use sections::{
    APP_DIR, FileCorpusConfig, FileLogConfig, FileStorageConfig, FileTelemetryConfig, expand_home,
};

use mesh_application::MeshConfig;
use mesh_application::config::{
    AgentConfig, BudgetConfig, BusConfig, ConsensusConfig, RetrievalConfig, SafetyConfig,
    ValidationConfig,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A configuration value the mesh cannot run with.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    #[error("{0} cannot be 0")]
    Zero(&'static str),

    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("validation.weights: {0}")]
    InvalidWeights(String),

    #[error("{0} cannot be empty")]
    Empty(&'static str),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Default budget for new contexts
    pub budget: BudgetConfig,
    pub bus: BusConfig,
    pub retrieval: RetrievalConfig,
    pub validation: ValidationConfig,
    pub consensus: ConsensusConfig,
    pub agents: AgentConfig,
    /// Risk lists, confidence floor and review window
    pub safety: SafetyConfig,
    pub storage: FileStorageConfig,
    pub telemetry: FileTelemetryConfig,
    pub corpus: FileCorpusConfig,
    pub log: FileLogConfig,
}

impl FileConfig {
    /// The sections the application layer consumes.
    pub fn mesh_config(&self) -> MeshConfig {
        MeshConfig {
            budget: self.budget,
            bus: self.bus.clone(),
            retrieval: self.retrieval.clone(),
            validation: self.validation.clone(),
            consensus: self.consensus.clone(),
            agents: self.agents.clone(),
            safety: self.safety.clone(),
        }
    }

    /// Validate the entire configuration, returning every problem found.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        let counts = [
            ("budget.tokens", self.budget.tokens as usize),
            ("budget.latency_ms", self.budget.latency_ms as usize),
            ("bus.max_concurrent_hops", self.bus.max_concurrent_hops),
            ("bus.chars_per_token", self.bus.chars_per_token),
            ("retrieval.k", self.retrieval.k),
            ("retrieval.latency_ms", self.retrieval.latency_ms as usize),
            ("agents.max_subtasks", self.agents.max_subtasks),
            ("safety.review_window_secs", self.safety.review_window_secs as usize),
            ("corpus.dimensions", self.corpus.dimensions),
        ];
        for (field, value) in counts {
            if value == 0 {
                errors.push(ConfigValidationError::Zero(field));
            }
        }

        let fractions = [
            ("retrieval.min_relevance", self.retrieval.min_relevance),
            ("validation.pass_threshold", self.validation.pass_threshold),
            ("consensus.similarity_threshold", self.consensus.similarity_threshold),
            ("agents.fact_threshold", self.agents.fact_threshold),
            ("agents.support_threshold", self.agents.support_threshold),
            ("safety.min_confidence", self.safety.policy.min_confidence),
        ];
        for (field, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                errors.push(ConfigValidationError::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: 1.0,
                });
            }
        }
        if self.consensus.similarity_threshold == 0.0 {
            errors.push(ConfigValidationError::Zero("consensus.similarity_threshold"));
        }

        if let Err(e) = self.validation.weights.validate() {
            errors.push(ConfigValidationError::InvalidWeights(e.to_string()));
        }
        if self.validation.model_version.trim().is_empty() {
            errors.push(ConfigValidationError::Empty("validation.model_version"));
        }

        errors
    }
}
