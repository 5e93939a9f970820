//! Engine configuration

use serde::{Deserialize, Serialize};

/// Tunables for the moderation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Latency ceiling in milliseconds; crossings increment the SLA counter
    #[serde(default = "default_sla_ms")]
    pub sla_ms: u64,

    /// Soft timeout for one toxicity inference, in milliseconds.
    /// A timeout never triggers the rule.
    #[serde(default = "default_toxicity_timeout_ms")]
    pub toxicity_timeout_ms: u64,

    /// Toxicity model error policy: fail-open treats the reply as
    /// non-toxic, fail-closed blocks it. Either way the error is counted.
    #[serde(default = "default_true")]
    pub toxicity_fail_open: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sla_ms: default_sla_ms(),
            toxicity_timeout_ms: default_toxicity_timeout_ms(),
            toxicity_fail_open: default_true(),
        }
    }
}

fn default_sla_ms() -> u64 {
    100
}

fn default_toxicity_timeout_ms() -> u64 {
    25
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_config() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.sla_ms, 100);
        assert_eq!(config.toxicity_timeout_ms, 25);
        assert!(config.toxicity_fail_open);
    }
}
