//! Server configuration

use crate::generator::GeneratorMode;
use modgate_engine::EngineConfig;
use modgate_telemetry::AuditWriterConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Gateway server configuration, loaded from YAML with CLI overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Rule snapshot freshness bound in milliseconds
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// Bound on the audit queue; beyond it records drop with a metric
    #[serde(default = "default_audit_queue_capacity")]
    pub audit_queue_capacity: usize,

    /// Moderation engine tunables
    #[serde(default)]
    pub engine: EngineConfig,

    /// Audit persistence settings
    #[serde(default)]
    pub audit: AuditWriterConfig,

    /// Mock generator mode
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Install the default rule set when the store starts empty
    #[serde(default = "default_true")]
    pub seed_rules: bool,
}

impl ServerConfig {
    /// Load configuration from a file, or fall back to defaults
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_yaml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            refresh_interval_ms: default_refresh_interval_ms(),
            audit_queue_capacity: default_audit_queue_capacity(),
            engine: EngineConfig::default(),
            audit: AuditWriterConfig::default(),
            generator: GeneratorConfig::default(),
            seed_rules: default_true(),
        }
    }
}

/// Generator settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub mode: GeneratorMode,
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_refresh_interval_ms() -> u64 {
    1000
}

fn default_audit_queue_capacity() -> usize {
    modgate_telemetry::DEFAULT_AUDIT_QUEUE_CAPACITY
}

fn default_true() -> bool {
    true
}
