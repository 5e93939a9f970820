//! Modgate Core
//!
//! Core types and error handling shared across Modgate components.
//!
//! This crate provides:
//! - The closed `Region` and `RuleKind` sets
//! - Request, outcome, result, and audit record types
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    AuditRecord, AuditTag, ModerationRequest, ModerationResult, Region, RuleKind, RuleOutcome,
};
