//! Per-invocation bus state: trace, budget meter and delivery queue.

use super::MeshError;
use mesh_domain::{
    AgentMessage, AgentRole, BudgetExhaustion, BudgetMeter, ContextHandle, HopFailure, MergeMode,
    MeshTrace, MessageType,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

/// One pending hop: a message delivered to a role.
#[derive(Debug, Clone)]
pub(crate) struct Delivery {
    pub role: AgentRole,
    pub message: AgentMessage,
    pub focus: Option<String>,
    pub mode: MergeMode,
}

impl Delivery {
    pub fn new(role: AgentRole, message: AgentMessage) -> Self {
        Self {
            role,
            message,
            focus: None,
            mode: MergeMode::Standard,
        }
    }

    /// Synthesizer hop merging everything emitted so far.
    pub fn finalizer(trigger: AgentMessage, mode: MergeMode) -> Self {
        Self {
            mode,
            ..Self::new(AgentRole::Synthesizer, trigger)
        }
    }
}

pub(crate) struct BusSession {
    pub ctx: Arc<ContextHandle>,
    pub trace: MeshTrace,
    pub errors: Vec<MeshError>,
    meter: BudgetMeter,
    started: Instant,
    queue: VecDeque<Delivery>,
    chars_per_token: usize,
    stream: Option<UnboundedSender<AgentMessage>>,
    stopped: bool,
}

impl BusSession {
    pub fn new(
        ctx: Arc<ContextHandle>,
        chars_per_token: usize,
        stream: Option<UnboundedSender<AgentMessage>>,
    ) -> Self {
        Self {
            meter: BudgetMeter::new(ctx.limits()),
            ctx,
            trace: MeshTrace::new(),
            errors: Vec::new(),
            started: Instant::now(),
            queue: VecDeque::new(),
            chars_per_token,
            stream,
            stopped: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    /// Latency the context has left.
    pub fn remaining_latency(&self) -> Duration {
        self.meter.remaining_latency(self.elapsed())
    }

    pub fn exhausted(&self) -> Option<BudgetExhaustion> {
        self.meter.exhausted(self.elapsed())
    }

    /// Append to the trace, charge the budget and forward to the stream.
    /// Returns the hop number and the token cost.
    pub fn record(&mut self, message: AgentMessage) -> (u32, u64) {
        let tokens = message.estimated_tokens(self.chars_per_token);
        self.meter.charge_tokens(tokens);
        if let Some(stream) = &self.stream {
            // A dropped receiver only means nobody is watching.
            let _ = stream.send(message.clone());
        }
        let hop = self.trace.append(message, self.elapsed_ms(), tokens);
        (hop, tokens)
    }

    /// Queue deliveries for every recipient of `message`. A PLAN addressed
    /// to researchers fans out into one hop per sub-task.
    pub fn route(&mut self, message: &AgentMessage) {
        for &role in &message.to {
            let fan_out = message.is(MessageType::Plan)
                && role == AgentRole::Researcher
                && !message.meta.subtasks.is_empty();
            if fan_out {
                for subtask in &message.meta.subtasks {
                    let mut delivery = Delivery::new(role, message.clone());
                    delivery.focus = Some(subtask.clone());
                    self.queue.push_back(delivery);
                }
            } else {
                self.queue.push_back(Delivery::new(role, message.clone()));
            }
        }
    }

    pub fn enqueue(&mut self, delivery: Delivery) {
        self.queue.push_back(delivery);
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn next_batch(&mut self, max: usize) -> Vec<Delivery> {
        let n = max.max(1).min(self.queue.len());
        self.queue.drain(..n).collect()
    }

    /// Snapshot of the trace for agents in the next batch.
    pub fn history(&self) -> Arc<Vec<AgentMessage>> {
        Arc::new(self.trace.messages().cloned().collect())
    }

    pub fn candidates(&self) -> Vec<AgentMessage> {
        self.trace
            .messages()
            .filter(|m| m.kind.is_candidate())
            .cloned()
            .collect()
    }

    pub fn last_candidate(&self) -> Option<AgentMessage> {
        self.trace
            .entries()
            .iter()
            .rev()
            .map(|e| &e.message)
            .find(|m| m.kind.is_candidate())
            .cloned()
    }

    pub fn has_final(&self) -> bool {
        self.trace.final_message().is_some()
    }

    pub fn fail_hop(&mut self, role: AgentRole, message: &AgentMessage, reason: impl Into<String>) {
        self.trace.record_failure(HopFailure {
            role,
            message_id: message.id.clone(),
            reason: reason.into(),
        });
    }

    /// Stop dispatching because the budget ran out.
    pub fn truncate(&mut self, exhaustion: BudgetExhaustion) {
        let ms = self.elapsed_ms();
        self.trace.mark_truncated(exhaustion, ms);
        self.errors.push(MeshError::BudgetExceeded(exhaustion));
        self.queue.clear();
        self.stopped = true;
    }

    /// Stop dispatching because the caller asked.
    pub fn cancel(&mut self) {
        self.errors.push(MeshError::Cancelled);
        self.queue.clear();
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}
