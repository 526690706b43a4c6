//! Plan phase and task entities.

use crate::safety::ActionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a task within a project plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for TaskId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is waiting to be worked on
    #[default]
    Pending,
    /// An action for the task is approved or awaiting execution
    InProgress,
    /// Task completed
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single task within a phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTask {
    pub id: TaskId,
    pub description: String,
    pub status: TaskStatus,
    /// Pending action created for this task, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<ActionId>,
}

impl PlanTask {
    pub fn new(id: impl Into<TaskId>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            status: TaskStatus::Pending,
            action_id: None,
        }
    }
}

/// A group of tasks produced by one decomposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub id: String,
    pub name: String,
    pub tasks: Vec<PlanTask>,
    pub created_at: DateTime<Utc>,
}

impl Phase {
    /// Build a phase with one pending task per sub-task, ids `<phase>-<n>`.
    pub fn from_subtasks(name: impl Into<String>, subtasks: &[String], now: DateTime<Utc>) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let tasks = subtasks
            .iter()
            .enumerate()
            .map(|(i, s)| PlanTask::new(format!("{}-{}", id, i + 1), s.clone()))
            .collect();
        Self {
            id,
            name: name.into(),
            tasks,
            created_at: now,
        }
    }

    pub fn task_mut(&mut self, id: &TaskId) -> Option<&mut PlanTask> {
        self.tasks.iter_mut().find(|t| &t.id == id)
    }

    pub fn is_complete(&self) -> bool {
        self.tasks.iter().all(|t| t.status == TaskStatus::Done)
    }

    /// Get completion progress (done / total)
    pub fn progress(&self) -> (usize, usize) {
        let done = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Done)
            .count();
        (done, self.tasks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_from_subtasks() {
        let subtasks = vec!["find sources".to_string(), "send summary".to_string()];
        let mut phase = Phase::from_subtasks("goal", &subtasks, Utc::now());

        assert_eq!(phase.tasks.len(), 2);
        assert_eq!(phase.progress(), (0, 2));
        assert!(phase.tasks[1].id.as_str().ends_with("-2"));

        let id = phase.tasks[0].id.clone();
        phase.task_mut(&id).unwrap().status = TaskStatus::Done;
        assert_eq!(phase.progress(), (1, 2));
        assert!(!phase.is_complete());
    }
}
