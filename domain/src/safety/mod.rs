//! Safety gate rules: risk classification and the approval lifecycle.
//!
//! ```text
//!            ┌──────────────▶ approved ──────┐
//!            │                               ▼
//! pending ───┼──────────────▶ auto_approved ──▶ executed
//!            ├──────────────▶ rejected   (terminal)
//!            └──────────────▶ expired    (terminal)
//! ```
//!
//! A record is created `auto_approved` only when its risk is `low` and its
//! action is on the allow-list; everything else starts `pending`.

pub mod action;
pub mod approval;
pub mod risk;

pub use action::{ActionId, PendingAction, ProposedAction, SYSTEM_ACTOR, StatusChange, TaskRef};
pub use approval::{ApprovalStatus, ReviewDecision, is_valid_status_path};
pub use risk::{RiskLevel, RiskPolicy};
