//! Retrieval ranking rules.

pub mod feedback;

pub use feedback::{Feedback, FeedbackWeights, Outcome, Thumb};
