//! Core types for the moderation pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Jurisdiction tag selecting which non-global rules apply to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// Applies to every request
    #[default]
    Global,
    Us,
    Eu,
    Uk,
    Apac,
}

impl Region {
    /// Static label used for metrics and audit records
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Us => "us",
            Self::Eu => "eu",
            Self::Uk => "uk",
            Self::Apac => "apac",
        }
    }

    /// Whether a rule tagged with this region applies to a request from `request_region`
    pub fn applies_to(&self, request_region: Region) -> bool {
        *self == Region::Global || *self == request_region
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of rule kinds; determines which detector drives a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Pii,
    Toxicity,
    Keyword,
    Regex,
    Financial,
    Medical,
}

impl RuleKind {
    /// Static label used for metrics and audit records
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pii => "pii",
            Self::Toxicity => "toxicity",
            Self::Keyword => "keyword",
            Self::Regex => "regex",
            Self::Financial => "financial",
            Self::Medical => "medical",
        }
    }

    /// Whether this kind consults the rule's `patterns` field
    pub fn uses_patterns(&self) -> bool {
        matches!(self, Self::Keyword | Self::Regex)
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single reply submitted for moderation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationRequest {
    /// The user message that produced the reply (audit context only)
    pub user_message: String,

    /// The candidate reply; treated as opaque text, no safety assumed
    pub bot_response: String,

    /// Jurisdiction tag for rule selection
    #[serde(default)]
    pub region: Region,

    /// Session identifier, passed through unchanged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ModerationRequest {
    /// Create a new request with the global region
    pub fn new(user_message: impl Into<String>, bot_response: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            bot_response: bot_response.into(),
            region: Region::Global,
            session_id: None,
        }
    }

    /// Set the request region
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// Set the session id
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Per-rule evaluation result for one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleOutcome {
    /// Id of the rule that was evaluated
    pub rule_id: u64,

    /// Rule name at evaluation time
    pub rule_name: String,

    /// Kind of the rule
    pub kind: RuleKind,

    /// Whether the backing detector fired
    pub triggered: bool,

    /// Whether a trigger on this rule blocks the response
    pub should_block: bool,

    /// Detector score, where applicable (toxicity max-label score)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,

    /// Opaque structured details for audit (matched types, tokens, patterns)
    #[serde(default)]
    pub details: serde_json::Value,
}

/// Final moderation verdict returned to the caller and persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationResult {
    /// Freshly minted unique identifier for this invocation
    pub request_id: String,

    /// The string actually delivered (original reply or a fallback)
    pub final_response: String,

    /// Any rule triggered
    pub is_flagged: bool,

    /// At least one blocking rule triggered
    pub is_blocked: bool,

    /// Outcomes that fired, in priority-descending order
    pub triggered: Vec<RuleOutcome>,

    /// Compact kind-to-score map for scored detectors
    #[serde(default)]
    pub scores: BTreeMap<RuleKind, f32>,

    /// Wall-clock span from engine entry to just before sink emission
    pub latency_ns: u64,

    /// Region the request was evaluated under
    pub region: Region,

    /// Session identifier, passed through unchanged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ModerationResult {
    /// Latency in fractional milliseconds, for display surfaces
    pub fn latency_ms(&self) -> f64 {
        self.latency_ns as f64 / 1_000_000.0
    }
}

/// Classification of an audit record's provenance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditTag {
    /// Normal engine decision
    Decision,
    /// Caller abandoned the request mid-evaluation
    Cancelled,
    /// Failsafe path: the engine caught an unexpected panic
    EngineError,
}

/// Write-once record of one moderation invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub user_message: String,
    pub bot_response: String,
    pub final_response: String,
    pub is_flagged: bool,
    pub is_blocked: bool,
    pub triggered: Vec<RuleOutcome>,
    #[serde(default)]
    pub scores: BTreeMap<RuleKind, f32>,
    pub latency_ns: u64,
    pub region: Region,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub tag: AuditTag,
}

impl AuditRecord {
    /// Build the audit record for a completed moderation result
    pub fn from_result(request: &ModerationRequest, result: &ModerationResult, tag: AuditTag) -> Self {
        Self {
            request_id: result.request_id.clone(),
            timestamp: Utc::now(),
            user_message: request.user_message.clone(),
            bot_response: request.bot_response.clone(),
            final_response: result.final_response.clone(),
            is_flagged: result.is_flagged,
            is_blocked: result.is_blocked,
            triggered: result.triggered.clone(),
            scores: result.scores.clone(),
            latency_ns: result.latency_ns,
            region: result.region,
            session_id: result.session_id.clone(),
            tag,
        }
    }
}
