//! Error types for the interception gate.

use std::time::Duration;
use thiserror::Error;

/// A verification attempt produced no verdict.
///
/// Never a verdict in disguise: the gate resolves every variant through the
/// failure policy and never caches it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("verification service returned HTTP {status}")]
    VerificationService { status: u16 },

    #[error("malformed verification response: {0}")]
    MalformedResponse(String),

    #[error("probe of {host} was inconclusive")]
    Inconclusive { host: String },

    #[error("verification timed out after {0:?}")]
    Timeout(Duration),

    #[error("shared verification was abandoned before it completed")]
    Abandoned,

    #[error("gate is shutting down")]
    Shutdown,
}

/// Host names the gate refuses to key its cache on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("host is empty")]
    Empty,

    #[error("host contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// The gate could not take control of a connection attempt.
///
/// The attempt proceeds untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachError {
    #[error("invalid host: {0}")]
    InvalidHost(#[from] HostError),

    #[error("connection could not be suspended: {0}")]
    SuspendFailed(String),
}

/// Invalid gate or cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateConfigError {
    #[error("verify_timeout must be greater than zero")]
    ZeroVerifyTimeout,

    #[error("secure_schemes must name at least one scheme")]
    NoSecureSchemes,

    #[error("cache.max_entries must be greater than zero")]
    ZeroCacheCapacity,

    #[error("cache.ttl must be greater than zero")]
    ZeroCacheTtl,

    #[error("invalid remote base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("unknown failure policy {0:?} (expected fail-open or fail-closed)")]
    UnknownFailurePolicy(String),
}
