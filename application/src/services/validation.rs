//! Validation Service: scores a FINAL answer for groundedness.
//!
//! The score is the weighted combination of four subscores (see
//! [`mesh_domain::validation`]). How subscores are produced depends on the
//! strategy:
//!
//! | Strategy   | Subscores                                                 |
//! |------------|-----------------------------------------------------------|
//! | `default`  | heuristic scoring of the FINAL                            |
//! | `critic`   | heuristic, tempered by a second critic pass on the FINAL  |
//! | `majority` | fraction of sampled candidates (plus FINAL) that pass     |

use crate::agents::{Agent, AgentInput, CriticAgent};
use crate::config::ValidationConfig;
use crate::ports::telemetry::TelemetrySink;
use mesh_domain::validation::{apply_critique, heuristic_subscores, majority_subscores};
use mesh_domain::{
    AgentMessage, ContextHandle, OpsEvent, OpsEventKind, Subscores, ValidationReport,
    ValidationStrategy,
};
use std::sync::Arc;
use tracing::info;

/// One scoring attempt.
#[derive(Debug, Clone, Copy)]
pub struct ValidationRequest<'a> {
    pub final_message: &'a AgentMessage,
    /// Candidate messages the FINAL was merged from.
    pub samples: &'a [AgentMessage],
    pub strategy: ValidationStrategy,
    /// 1 for the first attempt, 2 for the retry.
    pub attempt: u8,
}

pub struct ValidationService {
    config: ValidationConfig,
    critic: Arc<CriticAgent>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl ValidationService {
    pub fn new(
        config: ValidationConfig,
        critic: Arc<CriticAgent>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            config,
            critic,
            telemetry,
        }
    }

    pub fn default_strategy(&self) -> ValidationStrategy {
        self.config.strategy
    }

    pub fn pass_threshold(&self) -> f64 {
        self.config.pass_threshold
    }

    /// Score a FINAL message and record a `rag.validate` event.
    pub async fn validate(
        &self,
        request: ValidationRequest<'_>,
        ctx: &ContextHandle,
    ) -> ValidationReport {
        let subscores = self.subscores(&request, ctx).await;
        let weights = &self.config.weights;
        let score = weights.combine(&subscores);

        let report = ValidationReport {
            score,
            subscores,
            strategy: request.strategy,
            model_version: self.config.model_version.clone(),
            weights_version: weights.version.clone(),
            passed: score >= self.config.pass_threshold,
            attempt: request.attempt,
        };
        info!(
            "Validation attempt {} ({}): score {:.3}, {}",
            report.attempt,
            report.strategy,
            report.score,
            if report.passed { "passed" } else { "below threshold" }
        );
        self.telemetry
            .record(OpsEvent::new(ctx, OpsEventKind::from_validation(&report)));
        report
    }

    async fn subscores(&self, request: &ValidationRequest<'_>, ctx: &ContextHandle) -> Subscores {
        let base = heuristic_subscores(request.final_message, ctx.goal(), ctx.hints());
        match request.strategy {
            ValidationStrategy::Default => base,
            ValidationStrategy::Critic => {
                let input = AgentInput::new(request.final_message.clone());
                let critique = self.critic.handle(&input, ctx).await;
                match &critique.meta.critique {
                    Some(verdict) => apply_critique(base, verdict),
                    None => base,
                }
            }
            ValidationStrategy::Majority => {
                let mut samples: Vec<Subscores> = request
                    .samples
                    .iter()
                    .map(|m| heuristic_subscores(m, ctx.goal(), ctx.hints()))
                    .collect();
                samples.push(base);
                majority_subscores(&samples, self.config.pass_threshold)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::telemetry::MemoryTelemetry;
    use crate::testing::context;
    use mesh_domain::{AgentRole, Citation, MessageType};

    fn service() -> (ValidationService, Arc<MemoryTelemetry>) {
        let telemetry = Arc::new(MemoryTelemetry::new());
        let service = ValidationService::new(
            ValidationConfig::default(),
            Arc::new(CriticAgent::new(0.5)),
            telemetry.clone(),
        );
        (service, telemetry)
    }

    fn final_message(evidence: Vec<Citation>) -> AgentMessage {
        AgentMessage::new(
            MessageType::Final,
            AgentRole::Synthesizer,
            "document X summary: caching and eviction",
        )
        .with_evidence(evidence)
    }

    fn grounded() -> AgentMessage {
        final_message(vec![
            Citation::new("d1", 0.9).with_snippet("summary of document X"),
            Citation::new("d2", 0.7).with_snippet("document X caching"),
            Citation::new("d3", 0.4).with_snippet("eviction policy"),
        ])
    }

    fn request<'a>(
        msg: &'a AgentMessage,
        samples: &'a [AgentMessage],
        strategy: ValidationStrategy,
    ) -> ValidationRequest<'a> {
        ValidationRequest {
            final_message: msg,
            samples,
            strategy,
            attempt: 1,
        }
    }

    #[tokio::test]
    async fn test_grounded_final_passes_and_is_logged() {
        let (service, telemetry) = service();
        let msg = grounded();
        let report = service
            .validate(
                request(&msg, &[], ValidationStrategy::Default),
                &context("summarize document X"),
            )
            .await;

        assert!(report.passed, "score was {}", report.score);
        assert_eq!(report.model_version, "heuristic-v1");
        assert_eq!(report.weights_version, "v1");

        let events = telemetry.named("rag.validate");
        assert_eq!(events.len(), 1);
        match &events[0].kind {
            OpsEventKind::RagValidate { score, strategy, attempt, .. } => {
                assert_eq!(*score, report.score);
                assert_eq!(*strategy, ValidationStrategy::Default);
                assert_eq!(*attempt, 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_evidence_scores_zero_citation() {
        let (service, _) = service();
        let msg = final_message(vec![]);
        let report = service
            .validate(
                request(&msg, &[], ValidationStrategy::Default),
                &context("summarize document X"),
            )
            .await;
        assert_eq!(report.subscores.citation, 0.0);
        assert!(!report.passed);
    }

    #[tokio::test]
    async fn test_critic_strategy_penalizes_weak_evidence() {
        let (service, _) = service();
        let msg = final_message(vec![Citation::new("d1", 0.3)]);
        let ctx = context("summarize document X");

        let plain = service
            .validate(request(&msg, &[], ValidationStrategy::Default), &ctx)
            .await;
        let critic = service
            .validate(request(&msg, &[], ValidationStrategy::Critic), &ctx)
            .await;
        assert!(critic.subscores.citation < plain.subscores.citation);
        assert_eq!(critic.subscores.context, plain.subscores.context);
    }

    #[tokio::test]
    async fn test_majority_strategy_counts_passing_samples() {
        let (service, _) = service();
        let msg = grounded();
        let samples = vec![grounded(), final_message(vec![])];
        let report = service
            .validate(
                request(&msg, &samples, ValidationStrategy::Majority),
                &context("summarize document X"),
            )
            .await;
        // two of three samples carry evidence
        assert!((report.subscores.source - 2.0 / 3.0).abs() < 1e-9);
    }
}
