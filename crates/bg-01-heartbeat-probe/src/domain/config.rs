//! Probe configuration and validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::errors::CodecError;
use super::value_objects::TlsVersion;

/// Shortest read deadline accepted.
pub const MIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Longest read deadline accepted.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60);

/// Heartbeat probe configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Record-layer version used for both the ClientHello and the heartbeat
    pub tls_version: TlsVersion,
    /// Default port when the caller does not name one
    pub port: u16,
    /// Deadline covering connect, write and read
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Stop reading after this many bytes
    pub max_response_bytes: usize,
    /// Wait for ServerHelloDone before sending the heartbeat
    pub await_server_hello_done: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            tls_version: TlsVersion::Tls12,
            port: 443,
            timeout: Duration::from_secs(8),
            max_response_bytes: 64 * 1024,
            await_server_hello_done: false,
        }
    }
}

impl ProbeConfig {
    /// Validate limits.
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.timeout < MIN_TIMEOUT || self.timeout > MAX_TIMEOUT {
            return Err(CodecError::InvalidConfig(format!(
                "timeout {:?} outside {:?}..={:?}",
                self.timeout, MIN_TIMEOUT, MAX_TIMEOUT
            )));
        }

        if self.port == 0 {
            return Err(CodecError::InvalidConfig("port cannot be 0".into()));
        }

        // Must hold at least the header of a leaking heartbeat record
        if self.max_response_bytes < 5 {
            return Err(CodecError::InvalidConfig(
                "max_response_bytes must be at least 5".into(),
            ));
        }

        Ok(())
    }

    /// Builder-style method to set the TLS version
    pub fn with_tls_version(mut self, version: TlsVersion) -> Self {
        self.tls_version = version;
        self
    }

    /// Builder-style method to set the default port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builder-style method to set the deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder-style method to set the response byte cap
    pub fn with_max_response_bytes(mut self, max: usize) -> Self {
        self.max_response_bytes = max;
        self
    }

    /// Builder-style method to wait for the server's first flight
    pub fn with_await_server_hello_done(mut self, wait: bool) -> Self {
        self.await_server_hello_done = wait;
        self
    }
}
