//! Modgate Rules
//!
//! The authoritative rule model and its path to the engine:
//! - `RuleRecord` as stored and administered, with validation
//! - `CompiledRule`/`RuleCheck`: one strongly-typed variant per kind,
//!   decoded (and matchers compiled) once per rule version at load time
//! - `RuleStore`: the single read operation the core consumes
//! - `SnapshotCache`: copy-on-write snapshots with interval-based refresh

pub mod rule;
pub mod snapshot;
pub mod store;

pub use rule::{CompiledRule, RuleCheck, RuleDraft, RuleRecord, RuleUpdate, DEFAULT_TOXICITY_THRESHOLD};
pub use snapshot::{RuleSnapshot, SnapshotCache, DEFAULT_REFRESH_INTERVAL};
pub use store::{MemoryRuleStore, RuleStore};
