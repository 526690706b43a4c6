//! Validation results.

use super::strategy::ValidationStrategy;
use crate::message::entities::clamp_unit;
use serde::{Deserialize, Serialize};

/// The four independent subscores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscores {
    pub citation: f64,
    pub context: f64,
    pub source: f64,
    pub relevance: f64,
}

impl Subscores {
    pub fn new(citation: f64, context: f64, source: f64, relevance: f64) -> Self {
        Self {
            citation: clamp_unit(citation),
            context: clamp_unit(context),
            source: clamp_unit(source),
            relevance: clamp_unit(relevance),
        }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.citation, self.context, self.source, self.relevance]
    }
}

/// Score of one FINAL message under one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub score: f64,
    pub subscores: Subscores,
    pub strategy: ValidationStrategy,
    pub model_version: String,
    pub weights_version: String,
    /// Whether `score` cleared the pass threshold
    pub passed: bool,
    /// 1 for the first pass, 2 for the escalated retry
    pub attempt: u8,
}
