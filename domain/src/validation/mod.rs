//! Answer quality scoring.
//!
//! A FINAL message is scored on four independent subscores in `[0, 1]`:
//!
//! | Subscore    | Measures                                           |
//! |-------------|----------------------------------------------------|
//! | `citation`  | how much evidence backs the answer, and how strong |
//! | `context`   | how much of the goal and hints the answer covers   |
//! | `source`    | distinct, traceable sources                        |
//! | `relevance` | how closely the top evidence matches the goal      |
//!
//! The overall score is their weighted mean under a versioned
//! [`ValidationWeights`] set.

pub mod report;
pub mod scoring;
pub mod strategy;
pub mod weights;

pub use report::{Subscores, ValidationReport};
pub use scoring::{apply_critique, heuristic_subscores, majority_subscores};
pub use strategy::ValidationStrategy;
pub use weights::ValidationWeights;
