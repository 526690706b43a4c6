//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod review_action;
pub mod run_mesh;
