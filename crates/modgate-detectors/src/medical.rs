//! Medical term detection

use crate::detector::{Detection, Detector};
use aho_corasick::AhoCorasick;
use modgate_core::{Error, Result};
use serde_json::json;
use std::time::Instant;

/// Built-in vocabulary: diagnosis, treatment, prescription, record, and
/// insurance terms.
const MEDICAL_TERMS: &[&str] = &[
    // Diagnosis
    "diagnosis",
    "diagnosed with",
    "medical condition",
    "symptom",
    "prognosis",
    // Treatment
    "treatment plan",
    "chemotherapy",
    "dosage",
    "milligrams per day",
    "take this medication",
    // Prescription
    "prescription",
    "prescribe",
    "refill",
    "pharmacy pickup",
    // Records
    "medical record",
    "patient record",
    "lab results",
    "icd-10",
    // Insurance
    "health insurance",
    "insurance claim",
    "copay",
    "prior authorization",
];

/// Detector for medical terms
pub struct MedicalTermDetector {
    matcher: AhoCorasick,
}

impl MedicalTermDetector {
    /// Create a new detector with the built-in vocabulary compiled
    pub fn new() -> Result<Self> {
        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(MEDICAL_TERMS)
            .map_err(|e| Error::detector(format!("failed to build medical matcher: {e}")))?;
        Ok(Self { matcher })
    }
}

#[async_trait::async_trait]
impl Detector for MedicalTermDetector {
    async fn detect(&self, text: &str) -> Result<Detection> {
        let start = Instant::now();

        let mut seen = vec![false; MEDICAL_TERMS.len()];
        for m in self.matcher.find_iter(text) {
            seen[m.pattern().as_usize()] = true;
        }
        let found: Vec<&str> = MEDICAL_TERMS
            .iter()
            .zip(&seen)
            .filter(|(_, hit)| **hit)
            .map(|(t, _)| *t)
            .collect();

        if found.is_empty() {
            return Ok(Detection::clear(start.elapsed().as_micros() as u64));
        }

        let count = found.len();
        Ok(Detection {
            triggered: true,
            details: json!({ "found_terms": found, "count": count }),
            latency_us: start.elapsed().as_micros() as u64,
        })
    }

    fn name(&self) -> &str {
        "medical"
    }
}
