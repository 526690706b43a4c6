//! Versioned subscore weights.

use super::report::Subscores;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Fixed weight set used to combine subscores.
///
/// Weights come from configuration and carry a version so that a recorded
/// `rag.validate` event can be reproduced later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationWeights {
    pub version: String,
    pub citation: f64,
    pub context: f64,
    pub source: f64,
    pub relevance: f64,
}

impl Default for ValidationWeights {
    fn default() -> Self {
        Self {
            version: "v1".to_string(),
            citation: 0.35,
            context: 0.25,
            source: 0.15,
            relevance: 0.25,
        }
    }
}

impl ValidationWeights {
    pub fn total(&self) -> f64 {
        self.citation + self.context + self.source + self.relevance
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let all = [self.citation, self.context, self.source, self.relevance];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DomainError::InvalidWeights(
                "weights must be finite and non-negative".into(),
            ));
        }
        if self.total() <= 0.0 {
            return Err(DomainError::InvalidWeights(
                "at least one weight must be positive".into(),
            ));
        }
        if self.version.trim().is_empty() {
            return Err(DomainError::InvalidWeights("version cannot be empty".into()));
        }
        Ok(())
    }

    /// Weighted mean of the subscores, in `[0, 1]`.
    pub fn combine(&self, s: &Subscores) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            return 0.0;
        }
        let sum = self.citation * s.citation
            + self.context * s.context
            + self.source * s.source
            + self.relevance * s.relevance;
        (sum / total).clamp(0.0, 1.0)
    }
}
