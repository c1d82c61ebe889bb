//! Subscriber setup and event macros.
//!
//! Human-readable or JSON events go to stderr so command output on stdout
//! stays machine-readable.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::{TelemetryConfig, TelemetryError};

/// Build the filter for `config`.
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("log level {:?}: {}", config.log_level, e)))
}

/// Install the global subscriber.
///
/// Fails with [`TelemetryError::AlreadyInitialized`] if a subscriber is
/// already set.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;

    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_current_span(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(config.ansi)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "logging initialized"
    );
    Ok(())
}

/// Log an event about one host with standard fields.
#[macro_export]
macro_rules! log_host_event {
    ($level:ident, $host:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            host = %$host,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a gate outcome with standard fields.
#[macro_export]
macro_rules! log_outcome {
    ($level:ident, $host:expr, $outcome:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            host = %$host,
            outcome = %$outcome,
            $($($field)*,)?
            "connection settled"
        )
    };
}
