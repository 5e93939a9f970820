//! Rule records and their decoded, engine-facing form

use chrono::{DateTime, Utc};
use modgate_core::{Error, Region, Result, RuleKind};
use modgate_detectors::{KeywordMatcher, PatternSet};
use serde::{Deserialize, Serialize};

/// Default toxicity threshold when a rule omits one
pub const DEFAULT_TOXICITY_THRESHOLD: f32 = 0.7;

/// Authoritative rule record as stored and administered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRecord {
    /// Stable identifier, assigned by the store
    pub id: u64,

    /// Rule name
    pub name: String,

    /// Description of what this rule enforces
    #[serde(default)]
    pub description: String,

    /// Kind; determines the backing detector. Immutable after creation.
    pub kind: RuleKind,

    /// Region this rule applies to
    #[serde(default)]
    pub region: Region,

    /// Keyword or regex patterns; consulted only for those kinds
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Confidence threshold in [0, 1]; consulted only by toxicity rules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,

    /// Higher priority rules are evaluated first; ties break by id
    #[serde(default)]
    pub priority: u32,

    /// Inactive rules are invisible to the engine
    #[serde(default = "default_true")]
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl RuleRecord {
    /// Validate the administrative invariants on this record
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::rule("rule name must not be empty"));
        }
        if let Some(threshold) = self.threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(Error::rule(format!(
                    "threshold {threshold} outside [0, 1] for rule {:?}",
                    self.name
                )));
            }
        }
        if self.kind.uses_patterns() && self.patterns.iter().all(|p| p.trim().is_empty()) {
            return Err(Error::rule(format!(
                "{} rule {:?} has no patterns",
                self.kind, self.name
            )));
        }
        Ok(())
    }
}

/// Payload for creating a rule; the store assigns id and timestamps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: RuleKind,
    #[serde(default)]
    pub region: Region,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub threshold: Option<f32>,
    #[serde(default)]
    pub priority: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl RuleDraft {
    /// Minimal draft for a patternless rule kind
    pub fn new(name: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind,
            region: Region::Global,
            patterns: Vec::new(),
            threshold: None,
            priority: 0,
            is_active: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

/// Partial update to a rule; `id` and `kind` are immutable (a kind change
/// is modeled as delete-plus-create by the administrative layer)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub region: Option<Region>,
    pub patterns: Option<Vec<String>>,
    pub threshold: Option<f32>,
    pub priority: Option<u32>,
    pub is_active: Option<bool>,
}

/// A rule decoded for evaluation, with per-version compiled matchers
pub struct CompiledRule {
    pub id: u64,
    pub name: String,
    pub kind: RuleKind,
    pub region: Region,
    pub priority: u32,
    pub check: RuleCheck,
}

/// The strongly-typed check behind a rule; one variant per kind, carrying
/// exactly the parameters that kind needs
pub enum RuleCheck {
    Pii,
    Toxicity { threshold: f32 },
    Keyword { matcher: KeywordMatcher },
    Regex { patterns: PatternSet },
    Financial,
    Medical,
}

impl CompiledRule {
    /// Decode a stored record into its evaluated form
    ///
    /// Matchers are compiled here, once per rule version; records that fail
    /// to decode are skipped by the snapshot loader, never by the engine.
    pub fn compile(record: &RuleRecord) -> Result<Self> {
        record.validate()?;

        let check = match record.kind {
            RuleKind::Pii => RuleCheck::Pii,
            RuleKind::Toxicity => RuleCheck::Toxicity {
                threshold: record.threshold.unwrap_or(DEFAULT_TOXICITY_THRESHOLD),
            },
            RuleKind::Keyword => RuleCheck::Keyword {
                matcher: KeywordMatcher::build(&record.patterns)?,
            },
            RuleKind::Regex => RuleCheck::Regex {
                patterns: PatternSet::compile(&record.patterns)?,
            },
            RuleKind::Financial => RuleCheck::Financial,
            RuleKind::Medical => RuleCheck::Medical,
        };

        Ok(Self {
            id: record.id,
            name: record.name.clone(),
            kind: record.kind,
            region: record.region,
            priority: record.priority,
            check,
        })
    }
}
