//! Per-invocation scope.
//!
//! A [`ContextHandle`] is created once per mesh invocation and shared
//! read-only by every agent. Consumption is tracked alongside it by a
//! [`BudgetMeter`] owned by the bus.

pub mod context_budget;
pub mod handle;

pub use context_budget::{BudgetExhaustion, BudgetMeter};
pub use handle::{ContextHandle, ContextLimits};
