//! Gate, cache and remote-verifier configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::GateConfigError;

/// Verification service used when none is configured.
pub const DEFAULT_REMOTE_BASE_URL: &str = "http://bleed-1161785939.us-east-1.elb.amazonaws.com/bleed/";

/// What the gate does with a connection when verification fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Resume the connection.
    #[default]
    FailOpen,
    /// Cancel the connection.
    FailClosed,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailOpen => f.write_str("fail-open"),
            Self::FailClosed => f.write_str("fail-closed"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = GateConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-open" | "open" => Ok(Self::FailOpen),
            "fail-closed" | "closed" => Ok(Self::FailClosed),
            _ => Err(GateConfigError::UnknownFailurePolicy(s.to_string())),
        }
    }
}

/// Verdict cache limits. Both are off by default: the cache lives as long
/// as the process and holds one entry per distinct host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Forget verdicts after this long
    #[serde(with = "humantime_serde")]
    pub ttl: Option<Duration>,
    /// Evict the least recently used host beyond this many entries
    pub max_entries: Option<usize>,
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), GateConfigError> {
        if self.max_entries == Some(0) {
            return Err(GateConfigError::ZeroCacheCapacity);
        }
        if self.ttl == Some(Duration::ZERO) {
            return Err(GateConfigError::ZeroCacheTtl);
        }
        Ok(())
    }
}

/// Interception gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Outcome for connections whose verification failed
    pub failure_policy: FailurePolicy,
    /// Share one verification between concurrent attempts to the same host
    pub coalesce_in_flight: bool,
    /// Schemes that are intercepted; everything else passes untouched
    pub secure_schemes: Vec<String>,
    /// Upper bound on one verification
    #[serde(with = "humantime_serde")]
    pub verify_timeout: Duration,
    /// Verdict cache limits
    pub cache: CacheConfig,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::FailOpen,
            coalesce_in_flight: false,
            secure_schemes: vec!["https".to_string()],
            verify_timeout: Duration::from_secs(10),
            cache: CacheConfig::default(),
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> Result<(), GateConfigError> {
        if self.verify_timeout.is_zero() {
            return Err(GateConfigError::ZeroVerifyTimeout);
        }
        if self.secure_schemes.iter().all(|s| s.trim().is_empty()) {
            return Err(GateConfigError::NoSecureSchemes);
        }
        self.cache.validate()
    }

    /// Whether connections with `scheme` are intercepted.
    pub fn is_secure(&self, scheme: &str) -> bool {
        self.secure_schemes
            .iter()
            .any(|s| s.trim().eq_ignore_ascii_case(scheme.trim()))
    }

    /// Builder-style method to set the failure policy
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Builder-style method to enable request coalescing
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.coalesce_in_flight = enabled;
        self
    }

    /// Builder-style method to set the verification timeout
    pub fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    /// Builder-style method to set cache limits
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}

/// Remote verification service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL; the host is appended as the last path segment
    pub base_url: String,
    /// Whole-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REMOTE_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RemoteConfig {
    pub fn validate(&self) -> Result<(), GateConfigError> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(GateConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: "scheme must be http or https".to_string(),
            });
        }
        if url.contains(['?', '#']) {
            return Err(GateConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: "query and fragment are not allowed".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(GateConfigError::ZeroVerifyTimeout);
        }
        Ok(())
    }
}
