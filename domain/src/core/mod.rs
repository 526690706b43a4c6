//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`]: domain-level errors
//! - [`string`]: text normalization used for grouping and scoring

pub mod error;
pub mod string;
