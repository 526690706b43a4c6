//! Planner: decomposes a goal into sub-tasks.

use super::{Agent, AgentInput};
use async_trait::async_trait;
use mesh_domain::core::string::normalize;
use mesh_domain::{
    AgentMessage, AgentRole, ContextHandle, MessageType, ProposedAction, RiskPolicy,
};
use tracing::debug;

/// Verbs that start a new sub-task when they follow "and".
const TASK_VERBS: &[&str] = &[
    "analyze", "check", "compare", "describe", "explain", "find", "identify", "list", "research",
    "review", "summarize",
];

/// Confidence of a freshly detected action; the synthesizer replaces it.
const DETECTED_ACTION_CONFIDENCE: f64 = 0.5;

pub struct PlannerAgent {
    max_subtasks: usize,
    action_verbs: Vec<String>,
}

impl PlannerAgent {
    pub fn new(max_subtasks: usize) -> Self {
        Self {
            max_subtasks: max_subtasks.max(1),
            action_verbs: Vec::new(),
        }
    }

    /// Recognize every action the risk policy knows about.
    pub fn with_policy_actions(mut self, policy: &RiskPolicy) -> Self {
        let lists = [
            &policy.high_risk_actions,
            &policy.medium_risk_actions,
            &policy.auto_approve,
        ];
        self.action_verbs = lists
            .into_iter()
            .flatten()
            .map(|a| normalize(a))
            .filter(|a| !a.is_empty())
            .collect();
        self
    }

    /// Split a goal into ordered sub-tasks, at most `max_subtasks`.
    ///
    /// Sentences and clauses become sub-tasks; "and" splits only in front
    /// of a verb, so "pros and cons" stays together. Overflow is folded
    /// into the last sub-task.
    pub fn decompose(&self, goal: &str) -> Vec<String> {
        let mut subtasks: Vec<String> = Vec::new();
        for sentence in goal.split(['.', ';', '?', '!', '\n']) {
            for clause in sentence.split(", then ").flat_map(|c| c.split(" then ")) {
                subtasks.extend(self.split_on_and(clause));
            }
        }

        let mut cleaned: Vec<String> = Vec::new();
        for task in subtasks {
            let task = task
                .trim()
                .trim_start_matches("and ")
                .trim_end_matches(',')
                .trim()
                .to_string();
            if !task.is_empty() && !cleaned.contains(&task) {
                cleaned.push(task);
            }
        }

        if cleaned.is_empty() {
            return vec![goal.trim().to_string()];
        }
        if cleaned.len() > self.max_subtasks {
            let overflow = cleaned.split_off(self.max_subtasks - 1);
            cleaned.push(overflow.join("; "));
        }
        cleaned
    }

    fn split_on_and(&self, clause: &str) -> Vec<String> {
        let mut parts: Vec<String> = Vec::new();
        let mut current = String::new();
        for piece in clause.split(" and ") {
            if current.is_empty() {
                current = piece.to_string();
            } else if self.starts_with_verb(piece) {
                parts.push(std::mem::take(&mut current));
                current = piece.to_string();
            } else {
                current = format!("{} and {}", current, piece);
            }
        }
        parts.push(current);
        parts
    }

    fn starts_with_verb(&self, text: &str) -> bool {
        let first = first_word(text);
        TASK_VERBS.contains(&first.as_str()) || self.action_verbs.contains(&first)
    }

    /// First sub-task that starts with a known action verb.
    pub fn detect_action(&self, subtasks: &[String]) -> Option<ProposedAction> {
        subtasks.iter().enumerate().find_map(|(i, task)| {
            let normalized = normalize(task);
            let (verb, rest) = normalized.split_once(' ').unwrap_or((normalized.as_str(), ""));
            if !self.action_verbs.iter().any(|v| v == verb) {
                return None;
            }
            let action = ProposedAction::new(
                verb,
                DETECTED_ACTION_CONFIDENCE,
                format!("Plan step {}: {}", i + 1, task),
            );
            Some(if rest.is_empty() {
                action
            } else {
                action.with_target(rest)
            })
        })
    }
}

fn first_word(text: &str) -> String {
    normalize(text)
        .split(' ')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl Agent for PlannerAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Planner
    }

    async fn handle(&self, input: &AgentInput, _ctx: &ContextHandle) -> AgentMessage {
        let subtasks = self.decompose(&input.message.content);
        let action = self.detect_action(&subtasks);
        debug!(
            "Planned {} sub-task(s){}",
            subtasks.len(),
            action
                .as_ref()
                .map(|a| format!(", action '{}'", a.action))
                .unwrap_or_default()
        );

        let content = subtasks
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}. {}", i + 1, s))
            .collect::<Vec<_>>()
            .join("\n");

        let mut plan = AgentMessage::new(MessageType::Plan, AgentRole::Planner, content)
            .to(vec![AgentRole::Researcher])
            .in_reply_to(&input.message.id);
        plan.meta.subtasks = subtasks;
        plan.meta.action = action;
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::context;

    fn planner() -> PlannerAgent {
        PlannerAgent::new(4).with_policy_actions(&RiskPolicy::default())
    }

    #[test]
    fn test_single_goal_is_one_subtask() {
        assert_eq!(
            planner().decompose("summarize document X"),
            vec!["summarize document X".to_string()]
        );
    }

    #[test]
    fn test_splits_sentences_and_verb_clauses() {
        let subtasks =
            planner().decompose("Compare the pros and cons of caching. Summarize and send it to the team");
        assert_eq!(
            subtasks,
            vec![
                "Compare the pros and cons of caching".to_string(),
                "Summarize".to_string(),
                "send it to the team".to_string(),
            ]
        );
    }

    #[test]
    fn test_overflow_folds_into_last_subtask() {
        let planner = PlannerAgent::new(2);
        let subtasks = planner.decompose("a. b. c");
        assert_eq!(subtasks, vec!["a".to_string(), "b; c".to_string()]);
    }

    #[test]
    fn test_blank_goal_still_yields_a_subtask() {
        assert_eq!(planner().decompose("  "), vec!["".to_string()]);
    }

    #[test]
    fn test_detects_leading_action_verb() {
        let planner = planner();
        let subtasks = planner.decompose("summarize the release notes and send them to the team");
        let action = planner.detect_action(&subtasks).unwrap();
        assert_eq!(action.action, "send");
        assert_eq!(action.target.as_deref(), Some("them to the team"));
        assert!(action.explanation.starts_with("Plan step 2"));
    }

    #[test]
    fn test_verb_inside_a_sentence_is_not_an_action() {
        let planner = planner();
        let subtasks = planner.decompose("summarize the deploy checklist");
        assert!(planner.detect_action(&subtasks).is_none());
    }

    #[tokio::test]
    async fn test_handle_emits_plan_for_researchers() {
        let planner = planner();
        let task = AgentMessage::task("explain the cache. tag the doc");
        let plan = planner
            .handle(&AgentInput::new(task.clone()), &context("explain the cache"))
            .await;

        assert_eq!(plan.kind, MessageType::Plan);
        assert_eq!(plan.to, vec![AgentRole::Researcher]);
        assert_eq!(plan.meta.subtasks.len(), 2);
        assert_eq!(plan.meta.in_reply_to.as_ref(), Some(&task.id));
        assert_eq!(plan.meta.action.as_ref().map(|a| a.action.as_str()), Some("tag"));
        assert!(plan.content.starts_with("1. explain the cache"));
    }
}
