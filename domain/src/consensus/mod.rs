//! Consensus over competing agent answers.
//!
//! Candidates (FACT/HYPOTHESIS messages) are first partitioned by the
//! sub-task they answer, then grouped by approximate equivalence of their
//! normalized content. Within each sub-task the group backed by the most
//! evidence wins and every other group counts as one disagreement. The
//! winners together become the FINAL answer.
//!
//! ```text
//! candidates ──group──▶ [G1: 1.6] [G2: 1.6] [G3: 0.4]
//!                          │ tie → lower aggregate latency
//!                          ▼
//!                        winner  disagreements = 3 - 1  (per sub-task)
//! ```

pub mod grouping;
pub mod merge;

pub use grouping::{GroupingRule, HypothesisGroup, group_candidates};
pub use merge::{ConsensusMethod, ConsensusSummary, MergeMode, MergeOutcome, merge};
