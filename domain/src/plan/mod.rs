//! Project plans: phases of tasks recorded per project.

pub mod entities;

pub use entities::{Phase, PlanTask, TaskId, TaskStatus};
