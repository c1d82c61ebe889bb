//! TCP connector.

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::Instant;
use tracing::debug;

use crate::domain::config::MAX_TIMEOUT;
use crate::domain::{ProbeError, ProbeTarget};
use crate::ports::Connector;

/// Connects over TCP, trying each resolved address in turn until the
/// budget runs out.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl TcpConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(
        &self,
        target: &ProbeTarget,
        timeout: Duration,
    ) -> Result<TcpStream, ProbeError> {
        let deadline = Instant::now()
            .checked_add(timeout.min(MAX_TIMEOUT))
            .ok_or(ProbeError::Timeout(timeout))?;
        let host = target.host.trim_start_matches('[').trim_end_matches(']');

        let addrs: Vec<_> = match tokio::time::timeout_at(deadline, lookup_host((host, target.port)))
            .await
        {
            Ok(Ok(addrs)) => addrs.collect(),
            Ok(Err(e)) => {
                return Err(ProbeError::Resolve {
                    host: target.host.clone(),
                    reason: e.to_string(),
                })
            }
            Err(_) => return Err(ProbeError::Timeout(timeout)),
        };

        let mut last_error =
            io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses");
        for addr in addrs {
            match tokio::time::timeout_at(deadline, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    // Records go out as soon as they are written
                    stream.set_nodelay(true)?;
                    debug!(%addr, "connected");
                    return Ok(stream);
                }
                Ok(Err(e)) => {
                    debug!(%addr, error = %e, "connect attempt failed");
                    last_error = e;
                }
                Err(_) => return Err(ProbeError::Timeout(timeout)),
            }
        }

        Err(ProbeError::Connect {
            target: target.to_string(),
            source: last_error,
        })
    }
}
