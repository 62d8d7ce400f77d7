use crate::error::{Result, TrackerError};
use crate::identity::DEFAULT_HASH_CHUNK_SIZE;
use lineage_store::DEFAULT_RELATIONSHIP;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const RELATIONSHIP_ENV: &str = "LINEAGE_RELATIONSHIP";
pub const UNKNOWN_FUNCTION_ENV: &str = "LINEAGE_UNKNOWN_FUNCTION";

/// Configuration for lineage tracking behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Relationship label written on every edge
    pub relationship: String,

    /// Attribution used when an event carries no calling context
    pub unknown_function: String,

    /// Read size when streaming files through the hasher
    pub hash_chunk_size: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            relationship: DEFAULT_RELATIONSHIP.to_string(),
            unknown_function: "unknown".to_string(),
            hash_chunk_size: DEFAULT_HASH_CHUNK_SIZE,
        }
    }
}

impl TrackerConfig {
    /// Defaults overlaid with `LINEAGE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(value) = non_empty_env(RELATIONSHIP_ENV) {
            self.relationship = value;
        }
        if let Some(value) = non_empty_env(UNKNOWN_FUNCTION_ENV) {
            self.unknown_function = value;
        }
        self
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
            .map_err(|err| TrackerError::Config(format!("{}: {err}", path.display())))
    }

    pub fn from_toml_str(raw: &str) -> std::result::Result<Self, String> {
        let config: Self = toml::from_str(raw).map_err(|err| err.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.relationship.trim().is_empty() {
            return Err("relationship must not be empty".to_string());
        }
        if self.unknown_function.trim().is_empty() {
            return Err("unknown_function must not be empty".to_string());
        }
        if self.hash_chunk_size == 0 {
            return Err("hash_chunk_size must be positive".to_string());
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
