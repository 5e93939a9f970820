//! Modgate Engine
//!
//! Orchestrates one moderation pass per generated reply: fetch the active
//! rule snapshot for the request's region, run detectors per rule, compose
//! the verdict through the decision policy, substitute a fallback when
//! blocked, and emit metrics plus exactly one audit record.

pub mod config;
pub mod decision;
pub mod engine;

pub use config::EngineConfig;
pub use decision::{
    blocks_on_trigger, decide, fallback_message, is_hate_keyword_rule, Verdict,
    DEFAULT_FALLBACK_MESSAGE, FALLBACK_PRIORITY,
};
pub use engine::ModerationEngine;
