//! Regex pattern matching for REGEX rules

use modgate_core::{Error, Result};
use regex::RegexBuilder;
use serde_json::json;

/// Cap on matched substrings reported per pattern in audit details
const MAX_REPORTED_MATCHES: usize = 8;

/// A rule's regex patterns, compiled once per rule version
///
/// The `regex` crate's linear-time engine is the guard against
/// catastrophic backtracking: patterns that would require backtracking
/// are rejected at compile time.
#[derive(Debug)]
pub struct PatternSet {
    patterns: Vec<(String, regex::Regex)>,
}

impl PatternSet {
    /// Compile a rule's regex patterns
    ///
    /// Any invalid pattern fails the whole set; the caller skips the rule
    /// and records an error metric.
    pub fn compile(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Err(Error::rule("regex rule has no patterns"));
        }

        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| Error::rule(format!("invalid regex pattern {pattern:?}: {e}")))?;
            compiled.push((pattern.clone(), regex));
        }

        Ok(Self { patterns: compiled })
    }

    /// Match all patterns against `text`, returning audit details per hit
    pub fn find_matches(&self, text: &str) -> Vec<serde_json::Value> {
        let mut found = Vec::new();
        for (source, regex) in &self.patterns {
            let matches: Vec<&str> = regex
                .find_iter(text)
                .take(MAX_REPORTED_MATCHES)
                .map(|m| m.as_str())
                .collect();
            if !matches.is_empty() {
                found.push(json!({ "pattern": source, "matches": matches }));
            }
        }
        found
    }

    /// Number of compiled patterns
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}
