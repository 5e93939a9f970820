//! Keyword matching for KEYWORD rules

use aho_corasick::AhoCorasick;
use modgate_core::{Error, Result};

/// Case-insensitive substring matcher over a rule's patterns
///
/// Built once per rule version when the rule snapshot is decoded.
pub struct KeywordMatcher {
    matcher: AhoCorasick,
    patterns: Vec<String>,
}

impl KeywordMatcher {
    /// Build a matcher from a rule's keyword patterns
    pub fn build(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Err(Error::rule("keyword rule has no patterns"));
        }

        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(patterns)
            .map_err(|e| Error::rule(format!("failed to build keyword matcher: {e}")))?;

        Ok(Self {
            matcher,
            patterns: patterns.to_vec(),
        })
    }

    /// Return the distinct patterns found in `text`, in pattern order
    pub fn find_matches(&self, text: &str) -> Vec<&str> {
        let mut seen = vec![false; self.patterns.len()];
        for m in self.matcher.find_iter(text) {
            seen[m.pattern().as_usize()] = true;
        }

        self.patterns
            .iter()
            .zip(&seen)
            .filter(|(_, hit)| **hit)
            .map(|(p, _)| p.as_str())
            .collect()
    }

    /// Number of patterns in this matcher
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}
