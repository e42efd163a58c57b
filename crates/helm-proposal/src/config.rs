// config.rs — Engine configuration loaded from an optional `helm.toml`.
//
// Example:
// ```toml
// max_event_page_size = 250
// ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use helm_audit::AuditConfig;

/// Tunable limits for the engine and its audit queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound for an audit query's page size.
    pub max_event_page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_event_page_size: 100,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read engine config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl EngineConfig {
    /// Load config from a TOML file. Returns the default config if the file
    /// doesn't exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// The audit-query limits this config implies.
    pub fn audit_config(&self) -> AuditConfig {
        AuditConfig {
            max_page_size: self.max_event_page_size,
        }
    }
}
