//! YAML configuration for the lead pipeline.
//!
//! Everything here has a default, so a service can run without a file. When
//! one is supplied it is validated on load.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "production"
//!
//! idempotency:
//!   retention_secs: 300
//!   sweep_interval_secs: 60
//!
//! tenant:
//!   lookup_failure: route_unowned   # or: reject
//!
//! dedupe:
//!   match_empty_transcript: true
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub idempotency: IdempotencyConfig,

    #[serde(default)]
    pub tenant: TenantConfig,

    #[serde(default)]
    pub dedupe: DedupeConfig,
}

impl PipelineConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.idempotency.validate()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            idempotency: IdempotencyConfig::default(),
            tenant: TenantConfig::default(),
            dedupe: DedupeConfig::default(),
        }
    }
}

/// Retention and sweep cadence for the idempotency cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyConfig {
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl IdempotencyConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.retention_secs == 0 {
            return Err(ConfigLoadError::Validation(
                "idempotency.retention_secs must be >= 1".to_string(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigLoadError::Validation(
                "idempotency.sweep_interval_secs must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// What to do when the tenant lookup itself fails (as opposed to finding no
/// tenant).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupFailurePolicy {
    /// Persist the lead with no owner, same as a miss.
    #[default]
    RouteUnowned,
    /// Fail the request with a 500 so the sender retries.
    Reject,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantConfig {
    #[serde(default)]
    pub lookup_failure: LookupFailurePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupeConfig {
    /// Whether an empty transcript counts as a match against existing leads
    /// with an empty transcript.
    #[serde(default = "true_value")]
    pub match_empty_transcript: bool,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            match_empty_transcript: true,
        }
    }
}

fn default_retention_secs() -> u64 {
    300
}
fn default_sweep_interval_secs() -> u64 {
    60
}
fn true_value() -> bool {
    true
}
