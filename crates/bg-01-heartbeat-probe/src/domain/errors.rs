//! Error types for the heartbeat probe.

use thiserror::Error;

/// Errors raised while building or parsing probe records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unknown TLS content type: {0:#04x}")]
    UnknownContentType(u8),

    #[error("unexpected record version: {major:#04x} {minor:#04x}")]
    BadRecordVersion { major: u8, minor: u8 },

    #[error("record length {length} exceeds maximum {max}")]
    RecordTooLarge { length: usize, max: usize },

    #[error("unsupported TLS version: {0}")]
    UnsupportedVersion(String),

    #[error("invalid probe configuration: {0}")]
    InvalidConfig(String),
}

/// Errors from a single probe run.
///
/// None of these leave `probe()`: each is folded into an inconclusive
/// classification, since a failure to talk to the peer proves nothing.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("could not resolve {host}: {reason}")]
    Resolve { host: String, reason: String },

    #[error("connection to {target} failed: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("protocol error: {0}")]
    Codec(#[from] CodecError),
}
