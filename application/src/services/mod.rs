//! Services shared by agents and the bus.
//!
//! Each service wraps a port (or a domain rule) and emits its own ops
//! events, so callers never have to remember to log them.

pub mod consensus;
pub mod retrieval;
pub mod safety_gate;
pub mod validation;
