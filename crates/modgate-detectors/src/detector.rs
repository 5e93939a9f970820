//! Detector traits and common types

use async_trait::async_trait;
use modgate_core::Result;
use std::sync::Arc;

/// Trait for parameterless content detectors (PII, financial, medical)
///
/// Detectors are pure over the input text: deterministic, safe to invoke
/// concurrently, and free of mutable state after construction.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Analyze the given text
    async fn detect(&self, text: &str) -> Result<Detection>;

    /// Get the detector name
    fn name(&self) -> &str;
}

/// Trait for the scored toxicity detector
///
/// Separated from [`Detector`] because the rule's threshold is applied by
/// the caller against the full score map, not inside the detector.
#[async_trait]
pub trait ToxicityScorer: Send + Sync {
    /// Score the given text across all toxicity labels
    async fn score(&self, text: &str) -> Result<ToxicityScores>;

    /// Get the detector name
    fn name(&self) -> &str;
}

/// Result of running a detector over a text
#[derive(Debug, Clone)]
pub struct Detection {
    /// Whether the detector fired
    pub triggered: bool,

    /// Structured match details for audit
    pub details: serde_json::Value,

    /// Detector latency in microseconds
    pub latency_us: u64,
}

impl Detection {
    /// A non-triggering detection with empty details
    pub fn clear(latency_us: u64) -> Self {
        Self {
            triggered: false,
            details: serde_json::Value::Null,
            latency_us,
        }
    }
}

/// Score map over the six toxicity labels, each in [0, 1]
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct ToxicityScores {
    pub toxicity: f32,
    pub severe_toxicity: f32,
    pub obscene: f32,
    pub threat: f32,
    pub insult: f32,
    pub identity_hate: f32,
}

impl ToxicityScores {
    /// Maximum score across all labels
    pub fn max(&self) -> f32 {
        [
            self.toxicity,
            self.severe_toxicity,
            self.obscene,
            self.threat,
            self.insult,
            self.identity_hate,
        ]
        .into_iter()
        .fold(0.0, f32::max)
    }

    /// Label/score pairs, for audit details
    pub fn entries(&self) -> [(&'static str, f32); 6] {
        [
            ("toxicity", self.toxicity),
            ("severe_toxicity", self.severe_toxicity),
            ("obscene", self.obscene),
            ("threat", self.threat),
            ("insult", self.insult),
            ("identity_hate", self.identity_hate),
        ]
    }
}

/// The detectors shared across all rules of a process
///
/// Constructed once at process init and passed by reference into the engine.
/// Trait objects keep the seam open for test doubles.
#[derive(Clone)]
pub struct DetectorSet {
    pub pii: Arc<dyn Detector>,
    pub toxicity: Arc<dyn ToxicityScorer>,
    pub financial: Arc<dyn Detector>,
    pub medical: Arc<dyn Detector>,
}

impl DetectorSet {
    /// Build the standard production detector set
    pub fn standard() -> Result<Self> {
        Ok(Self {
            pii: Arc::new(crate::pii::PiiDetector::new()?),
            toxicity: Arc::new(crate::toxicity::ToxicityModel::new()?),
            financial: Arc::new(crate::financial::FinancialTermDetector::new()?),
            medical: Arc::new(crate::medical::MedicalTermDetector::new()?),
        })
    }
}
