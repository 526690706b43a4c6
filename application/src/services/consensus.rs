//! Consensus Engine service.
//!
//! Wraps [`mesh_domain::merge`] and records the `mesh.consensus` event.

use crate::ports::telemetry::TelemetrySink;
use mesh_domain::{
    AgentMessage, ContextHandle, GroupingRule, MergeMode, MergeOutcome, OpsEvent, OpsEventKind,
    merge,
};
use std::sync::Arc;
use tracing::debug;

pub struct ConsensusService {
    rule: GroupingRule,
    telemetry: Arc<dyn TelemetrySink>,
}

impl ConsensusService {
    pub fn new(rule: GroupingRule, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self { rule, telemetry }
    }

    pub fn rule(&self) -> &GroupingRule {
        &self.rule
    }

    /// Merge candidate FACT/HYPOTHESIS messages into one FINAL.
    ///
    /// Returns `None` when there is nothing to merge.
    pub fn merge(
        &self,
        candidates: &[AgentMessage],
        critiques: &[AgentMessage],
        mode: MergeMode,
        ctx: &ContextHandle,
    ) -> Option<MergeOutcome> {
        let outcome = merge(candidates, critiques, &self.rule, mode)?;
        debug!(
            "Consensus over {} candidate(s): {} group(s), winner of size {}",
            outcome.summary.candidates, outcome.summary.groups, outcome.summary.winner_size
        );
        self.telemetry.record(OpsEvent::new(
            ctx,
            OpsEventKind::MeshConsensus {
                method: outcome.summary.method,
                disagreements: outcome.summary.disagreements,
            },
        ));
        Some(outcome)
    }
}
