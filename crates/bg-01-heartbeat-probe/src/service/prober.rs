//! Heartbeat Prober
//!
//! Drives one probe over one connection: ClientHello, malformed heartbeat,
//! then read until the reply is decisive, the peer hangs up, or the
//! deadline passes.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    build_client_hello, build_malformed_heartbeat_request, classify_closed_response,
    classify_heartbeat_response, contains_server_hello_done, scan_response, Classification,
    CodecError, ProbeConfig, ProbeError, ProbeTarget, TlsVersion, SENT_PAYLOAD_LEN,
};
use crate::domain::config::MAX_TIMEOUT;
use crate::ports::{Connector, HeartbeatProbeApi};

const READ_CHUNK: usize = 4096;

// =============================================================================
// PROBE SESSION
// =============================================================================

/// Transient state of one probe run.
#[derive(Debug)]
pub struct ProbeSession {
    target: ProbeTarget,
    version: TlsVersion,
    received: Vec<u8>,
    classification: Option<Classification>,
}

impl ProbeSession {
    /// Start a session against `target`.
    pub fn new(target: ProbeTarget, version: TlsVersion) -> Self {
        Self {
            target,
            version,
            received: Vec::new(),
            classification: None,
        }
    }

    pub fn target(&self) -> &ProbeTarget {
        &self.target
    }

    pub fn version(&self) -> TlsVersion {
        self.version
    }

    /// Bytes received so far.
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    /// Terminal classification, once reached.
    pub fn classification(&self) -> Option<Classification> {
        self.classification
    }

    /// Append received bytes; returns the classification once it is decided.
    pub fn absorb(&mut self, bytes: &[u8]) -> Result<Option<Classification>, CodecError> {
        self.received.extend_from_slice(bytes);
        let scan = scan_response(SENT_PAYLOAD_LEN, &self.received)?;
        if !scan.is_terminal() {
            return Ok(None);
        }
        let classification = classify_heartbeat_response(SENT_PAYLOAD_LEN, &self.received);
        Ok(Some(self.finish(classification)))
    }

    /// The peer closed the connection.
    pub fn on_close(&mut self) -> Classification {
        let classification = classify_closed_response(SENT_PAYLOAD_LEN, &self.received);
        self.finish(classification)
    }

    /// The read deadline passed.
    pub fn on_deadline(&mut self) -> Classification {
        let classification = classify_heartbeat_response(SENT_PAYLOAD_LEN, &self.received);
        self.finish(classification)
    }

    /// Force a terminal classification.
    pub fn finish(&mut self, classification: Classification) -> Classification {
        *self.classification.get_or_insert(classification)
    }
}

// =============================================================================
// PROBER
// =============================================================================

/// Heartbeat prober over any [`Connector`].
pub struct HeartbeatProber<C: Connector> {
    connector: C,
    config: ProbeConfig,
}

impl<C: Connector> HeartbeatProber<C> {
    /// Create a prober. The configuration is validated.
    pub fn new(connector: C, config: ProbeConfig) -> Result<Self, CodecError> {
        config.validate()?;
        Ok(Self { connector, config })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Probe `host` on the configured port with the configured timeout.
    pub async fn probe_host(&self, host: &str) -> Classification {
        let target = ProbeTarget::new(host, self.config.port);
        self.probe(&target, self.config.timeout).await
    }

    async fn run_session(
        &self,
        session: &mut ProbeSession,
        deadline: Instant,
    ) -> Result<Classification, ProbeError> {
        let connect_budget = deadline.saturating_duration_since(Instant::now());
        let mut stream = self
            .connector
            .connect(session.target(), connect_budget)
            .await?;

        stream.write_all(&build_client_hello(session.version())).await?;
        stream.flush().await?;
        debug!("sent ClientHello");

        if self.config.await_server_hello_done {
            if let Some(classification) =
                self.await_server_hello_done(&mut stream, session, deadline).await?
            {
                return Ok(classification);
            }
        }

        stream
            .write_all(&build_malformed_heartbeat_request(session.version()))
            .await?;
        stream.flush().await?;
        debug!("sent malformed heartbeat request");

        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            let Some(n) = read_chunk(&mut stream, &mut chunk, deadline).await? else {
                return Ok(session.on_deadline());
            };
            if n == 0 {
                debug!(received = session.received().len(), "peer closed connection");
                return Ok(session.on_close());
            }
            if let Some(classification) = session.absorb(&chunk[..n])? {
                return Ok(classification);
            }
            if session.received().len() >= self.config.max_response_bytes {
                debug!(
                    received = session.received().len(),
                    "response cap reached without a heartbeat reply"
                );
                return Ok(session.finish(Classification::Inconclusive));
            }
        }
    }

    /// Read the server's first flight. Returns a classification if the
    /// session ended before ServerHelloDone arrived.
    async fn await_server_hello_done<S>(
        &self,
        stream: &mut S,
        session: &mut ProbeSession,
        deadline: Instant,
    ) -> Result<Option<Classification>, ProbeError>
    where
        S: AsyncRead + Unpin,
    {
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            let Some(n) = read_chunk(stream, &mut chunk, deadline).await? else {
                return Ok(Some(session.on_deadline()));
            };
            if n == 0 {
                return Ok(Some(session.on_close()));
            }
            if let Some(classification) = session.absorb(&chunk[..n])? {
                return Ok(Some(classification));
            }
            if contains_server_hello_done(session.received())? {
                debug!(received = session.received().len(), "received ServerHelloDone");
                return Ok(None);
            }
            if session.received().len() >= self.config.max_response_bytes {
                return Ok(Some(session.finish(Classification::Inconclusive)));
            }
        }
    }
}

/// Read once, or `None` if `deadline` passes first.
async fn read_chunk<S>(
    stream: &mut S,
    buf: &mut [u8],
    deadline: Instant,
) -> Result<Option<usize>, ProbeError>
where
    S: AsyncRead + Unpin,
{
    match tokio::time::timeout_at(deadline, stream.read(buf)).await {
        Ok(read) => Ok(Some(read?)),
        Err(_) => Ok(None),
    }
}

#[async_trait]
impl<C: Connector> HeartbeatProbeApi for HeartbeatProber<C> {
    #[instrument(name = "heartbeat_probe", skip(self), fields(peer = %target))]
    async fn probe(&self, target: &ProbeTarget, timeout: Duration) -> Classification {
        debug!(version = %self.config.tls_version, ?timeout, "starting probe");
        let started = Instant::now();
        let mut session = ProbeSession::new(target.clone(), self.config.tls_version);

        if timeout > MAX_TIMEOUT {
            debug!(?timeout, max = ?MAX_TIMEOUT, "clamping probe timeout");
        }
        let Some(deadline) = started.checked_add(timeout.min(MAX_TIMEOUT)) else {
            warn!(?timeout, "probe deadline out of range, result inconclusive");
            return session.finish(Classification::Inconclusive);
        };

        let classification = match self.run_session(&mut session, deadline).await {
            Ok(classification) => classification,
            Err(e) => {
                warn!(error = %e, "probe failed, result inconclusive");
                session.finish(Classification::Inconclusive)
            }
        };

        info!(
            classification = %classification,
            received = session.received().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "probe complete"
        );
        classification
    }
}
