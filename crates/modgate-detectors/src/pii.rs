//! PII detection over a fixed family of recognizers

use crate::detector::{Detection, Detector};
use modgate_core::{Error, Result};
use regex::Regex;
use serde_json::json;
use std::time::Instant;

/// PII detector using pre-compiled regex recognizers
///
/// Recognizes emails, North-American phone numbers, US SSNs, credit card
/// numbers, and IPv4 addresses. Patterns are word-boundary anchored so
/// inline PII is caught regardless of surrounding whitespace.
pub struct PiiDetector {
    recognizers: Vec<(&'static str, Regex)>,
}

const PII_PATTERNS: &[(&str, &str)] = &[
    ("email", r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b"),
    ("phone", r"\b(\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b"),
    ("ssn", r"\b\d{3}-\d{2}-\d{4}\b"),
    ("credit_card", r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b"),
    ("ip_address", r"\b(?:\d{1,3}\.){3}\d{1,3}\b"),
];

impl PiiDetector {
    /// Create a new PII detector with all recognizers compiled
    pub fn new() -> Result<Self> {
        let mut recognizers = Vec::with_capacity(PII_PATTERNS.len());
        for (pii_type, pattern) in PII_PATTERNS {
            let regex = Regex::new(pattern).map_err(|e| {
                Error::detector(format!("failed to compile {pii_type} recognizer: {e}"))
            })?;
            recognizers.push((*pii_type, regex));
        }
        Ok(Self { recognizers })
    }
}

#[async_trait::async_trait]
impl Detector for PiiDetector {
    async fn detect(&self, text: &str) -> Result<Detection> {
        let start = Instant::now();

        let mut by_type = serde_json::Map::new();
        let mut total: u64 = 0;

        for (pii_type, regex) in &self.recognizers {
            let count = regex.find_iter(text).count() as u64;
            if count > 0 {
                by_type.insert(pii_type.to_string(), json!(count));
                total += count;
            }
        }

        if total == 0 {
            return Ok(Detection::clear(start.elapsed().as_micros() as u64));
        }

        Ok(Detection {
            triggered: true,
            details: json!({
                "has_pii": true,
                "by_type": by_type,
                "total_matches": total,
            }),
            latency_us: start.elapsed().as_micros() as u64,
        })
    }

    fn name(&self) -> &str {
        "pii"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_email_detection() {
        let detector = PiiDetector::new().unwrap();

        let result = detector
            .detect("Contact me at alice@example.com")
            .await
            .unwrap();
        assert!(result.triggered);
        assert_eq!(result.details["by_type"]["email"], 1);
    }

    #[tokio::test]
    async fn test_no_pii() {
        let detector = PiiDetector::new().unwrap();

        let result = detector.detect("This is clean text").await.unwrap();
        assert!(!result.triggered);
    }

    #[tokio::test]
    async fn test_phone_detection() {
        let detector = PiiDetector::new().unwrap();

        let result = detector.detect("Call me at 555-123-4567").await.unwrap();
        assert!(result.triggered);
        assert_eq!(result.details["by_type"]["phone"], 1);
    }

    #[tokio::test]
    async fn test_ssn_detection() {
        let detector = PiiDetector::new().unwrap();

        let result = detector.detect("SSN: 123-45-6789").await.unwrap();
        assert!(result.triggered);
        assert!(result.details["by_type"].get("ssn").is_some());
    }

    #[tokio::test]
    async fn test_credit_card_with_separators() {
        let detector = PiiDetector::new().unwrap();

        for text in ["4111 1111 1111 1111", "4111-1111-1111-1111", "4111111111111111"] {
            let result = detector.detect(text).await.unwrap();
            assert!(result.triggered, "missed card number in {text:?}");
        }
    }

    #[tokio::test]
    async fn test_ipv4_detection() {
        let detector = PiiDetector::new().unwrap();

        let result = detector.detect("server at 192.168.1.42").await.unwrap();
        assert!(result.triggered);
        assert_eq!(result.details["by_type"]["ip_address"], 1);
    }

    #[tokio::test]
    async fn test_inline_pii_without_whitespace_padding() {
        let detector = PiiDetector::new().unwrap();

        let result = detector
            .detect("reach me:(bob@corp.io)right away")
            .await
            .unwrap();
        assert!(result.triggered);
    }

    #[tokio::test]
    async fn test_multiple_types_counted() {
        let detector = PiiDetector::new().unwrap();

        let result = detector
            .detect("Email bob@corp.io or call 555-123-4567")
            .await
            .unwrap();
        assert!(result.triggered);
        assert!(result.details["total_matches"].as_u64().unwrap() >= 2);
    }
}
