//! # Runtime Configuration
//!
//! One TOML file covers every component. Missing sections take their
//! defaults, so an empty file is a valid configuration.
//!
//! ```toml
//! strategy = "local"
//!
//! [gate]
//! failure_policy = "fail-open"
//! verify_timeout = "15s"
//!
//! [gate.cache]
//! ttl = "1h"
//!
//! [probe]
//! tls_version = "1.1"
//! timeout = "5s"
//! ```
//!
//! Environment overrides (applied after the file):
//!
//! - `BG_STRATEGY`: `remote` or `local`
//! - `BG_REMOTE_URL`: verification service base URL
//! - `BG_FAILURE_POLICY`: `fail-open` or `fail-closed`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use bg_01_heartbeat_probe::{CodecError, ProbeConfig};
use bg_02_interception_gate::{FailurePolicy, GateConfig, GateConfigError, RemoteConfig};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {error}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid gate configuration: {0}")]
    Invalid(#[from] GateConfigError),

    #[error("invalid probe configuration: {0}")]
    Probe(#[from] CodecError),

    #[error("unknown strategy {0:?} (expected remote or local)")]
    UnknownStrategy(String),
}

/// Which verification strategy the gate dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Ask the HTTP verification service
    #[default]
    Remote,
    /// Run the heartbeat probe from this process
    Local,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote => f.write_str("remote"),
            Self::Local => f.write_str("local"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "local" => Ok(Self::Local),
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Verification strategy
    pub strategy: StrategyKind,
    /// Interception gate and verdict cache
    pub gate: GateConfig,
    /// Remote verification service
    pub remote: RemoteConfig,
    /// Heartbeat probe (local strategy and the `probe` command)
    pub probe: ProbeConfig,
}

impl GuardConfig {
    /// Read and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        Self::parse(&text)
    }

    /// Parse and validate TOML text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section the selected strategy uses.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gate.validate()?;
        self.probe.validate()?;
        if self.strategy == StrategyKind::Remote {
            self.remote.validate()?;
        }
        Ok(())
    }

    /// Apply `BG_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `BG_*` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(strategy) = lookup("BG_STRATEGY") {
            self.strategy = strategy.parse()?;
            info!(strategy = %self.strategy, "strategy set from environment");
        }
        if let Some(url) = lookup("BG_REMOTE_URL") {
            info!(url = %url, "remote base URL set from environment");
            self.remote.base_url = url;
        }
        if let Some(policy) = lookup("BG_FAILURE_POLICY") {
            self.gate.failure_policy = policy.parse::<FailurePolicy>()?;
            info!(policy = %self.gate.failure_policy, "failure policy set from environment");
        }
        Ok(())
    }
}
