//! Connection attempts read from text input.
//!
//! Each non-empty line is a URL. The gate sees it as a connection attempt
//! and every transition is logged, which makes the `gate` command a dry run
//! of what an embedding network stack would experience.

use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use bg_02_interception_gate::{AttachError, CancelReason, ConnectionHandle};
use bg_telemetry::{log_host_event, log_outcome};

/// A line that is not a usable URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("missing scheme in {0:?}")]
    MissingScheme(String),

    #[error("missing host in {0:?}")]
    MissingHost(String),
}

/// Where a [`LoggedConnection`] stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Suspended,
    Resumed,
    Cancelled { code: u32 },
}

/// Connection handle that only logs what the gate does to it.
#[derive(Debug)]
pub struct LoggedConnection {
    url: String,
    scheme: String,
    host: String,
    state: Mutex<ConnectionState>,
}

impl LoggedConnection {
    /// Parse `url` as `scheme://[userinfo@]host[:port][/path]`.
    pub fn parse(url: &str) -> Result<Self, UrlError> {
        let url = url.trim();
        let (scheme, rest) = url
            .split_once("://")
            .filter(|(scheme, _)| is_scheme(scheme))
            .ok_or_else(|| UrlError::MissingScheme(url.to_string()))?;

        let authority = rest
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();
        let host_port = authority
            .rsplit_once('@')
            .map_or(authority, |(_, host_port)| host_port);
        let host = match host_port.strip_prefix('[') {
            Some(v6) => v6.split_once(']').map_or("", |(addr, _)| addr),
            None => host_port.split(':').next().unwrap_or_default(),
        };
        if host.is_empty() {
            return Err(UrlError::MissingHost(url.to_string()));
        }

        Ok(Self {
            url: url.to_string(),
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_string(),
            state: Mutex::new(ConnectionState::Open),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn transition(&self, next: ConnectionState) {
        *self.state.lock() = next;
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl ConnectionHandle for LoggedConnection {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn suspend(&self) -> Result<(), AttachError> {
        self.transition(ConnectionState::Suspended);
        log_host_event!(debug, self.host, "connection suspended", url = %self.url);
        Ok(())
    }

    fn resume(&self) {
        self.transition(ConnectionState::Resumed);
        log_outcome!(info, self.host, "resumed", url = %self.url);
    }

    fn cancel(&self, reason: CancelReason) {
        let code = CancelReason::ABORT_CODE;
        self.transition(ConnectionState::Cancelled { code });
        log_outcome!(
            warn,
            self.host,
            "cancelled",
            url = %self.url,
            reason = %reason,
            code = %format!("{code:#010x}")
        );
    }
}

/// Read URLs from `reader` and feed them to the returned channel.
///
/// Blank lines and lines starting with `#` are skipped; lines that do not
/// parse are logged and skipped. The channel closes at end of input.
pub fn spawn_line_source<R>(reader: R, capacity: usize) -> mpsc::Receiver<Arc<dyn ConnectionHandle>>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Arc<dyn ConnectionHandle>>(capacity.max(1));
    tokio::spawn(async move {
        let mut lines = reader.lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "failed to read input");
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match LoggedConnection::parse(line) {
                Ok(conn) => {
                    if tx.send(Arc::new(conn)).await.is_err() {
                        debug!("gate stopped reading, closing input");
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "skipping input line"),
            }
        }
    });
    rx
}
