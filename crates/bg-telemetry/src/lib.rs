//! # Bleed-Guard Telemetry
//!
//! Structured logging for the Bleed-Guard binaries.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bg_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BG_LOG_LEVEL` / `RUST_LOG` | `info` | Filter directive |
//! | `BG_JSON_LOGS` | `false` | JSON output |
//! | `BG_SERVICE_NAME` | `bleed-guard` | Service name |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Convenience macro for a span scoped to one host.
///
/// # Example
///
/// ```rust,ignore
/// let _span = bg_telemetry::host_span!("check", "example.org", strategy = "remote").entered();
/// ```
#[macro_export]
macro_rules! host_span {
    ($name:expr, $host:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name, host = %$host $(, $($field)*)?)
    };
}
