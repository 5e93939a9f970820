//! Restricted financial term detection

use crate::detector::{Detection, Detector};
use aho_corasick::AhoCorasick;
use modgate_core::{Error, Result};
use serde_json::json;
use std::time::Instant;

/// Built-in vocabulary: banking identifiers, card brands, investment and
/// scam idioms, crypto wallet/seed phrasing.
const FINANCIAL_TERMS: &[&str] = &[
    // Banking identifiers
    "routing number",
    "account number",
    "sort code",
    "iban",
    "swift code",
    "wire transfer",
    // Card brands
    "visa card",
    "mastercard",
    "american express",
    "card number",
    "cvv",
    // Investment and scam idioms
    "guaranteed return",
    "risk-free investment",
    "insider trading",
    "pump and dump",
    "get rich quick",
    "investment guarantee",
    "double your money",
    "ponzi",
    "pyramid scheme",
    // Crypto wallet and seed phrasing
    "seed phrase",
    "private key",
    "crypto wallet",
    "wallet address",
    "send bitcoin",
    "send btc",
    "crypto giveaway",
];

/// Detector for restricted financial terms
pub struct FinancialTermDetector {
    matcher: AhoCorasick,
}

impl FinancialTermDetector {
    /// Create a new detector with the built-in vocabulary compiled
    pub fn new() -> Result<Self> {
        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(FINANCIAL_TERMS)
            .map_err(|e| Error::detector(format!("failed to build financial matcher: {e}")))?;
        Ok(Self { matcher })
    }
}

#[async_trait::async_trait]
impl Detector for FinancialTermDetector {
    async fn detect(&self, text: &str) -> Result<Detection> {
        let start = Instant::now();

        let mut seen = vec![false; FINANCIAL_TERMS.len()];
        for m in self.matcher.find_iter(text) {
            seen[m.pattern().as_usize()] = true;
        }
        let found: Vec<&str> = FINANCIAL_TERMS
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
        "financial"
    }
}
