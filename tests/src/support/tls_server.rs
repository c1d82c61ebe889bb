//! A TCP server that speaks just enough TLS to answer one heartbeat probe.

use parking_lot::Mutex;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// ClientHello record (5-byte header + 220-byte body) plus the 8-byte
/// heartbeat record.
pub const PROBE_BYTES: usize = 5 + 220 + 8;

/// How the server answers once it has read a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerBehaviour {
    /// Return 4 KiB of "memory" for the empty heartbeat
    Leak,
    /// Answer the heartbeat correctly (empty payload, 16 bytes padding)
    Echo,
    /// Send a fatal alert
    Alert,
    /// Close the connection without answering
    Close,
    /// Say nothing until the client gives up
    Silent,
    /// Send bytes that are not TLS records
    Garbage,
}

impl ServerBehaviour {
    fn reply(self, version: [u8; 2]) -> Vec<u8> {
        let [major, minor] = version;
        match self {
            Self::Leak => {
                let mut body = vec![0x02, 0x10, 0x00];
                body.extend(std::iter::repeat(0xAB).take(0x1000 + 16));
                let len = (body.len() as u16).to_be_bytes();
                let mut record = vec![0x18, major, minor, len[0], len[1]];
                record.extend(body);
                record
            }
            Self::Echo => {
                let mut record = vec![0x18, major, minor, 0x00, 0x13, 0x02, 0x00, 0x00];
                record.extend([0u8; 16]);
                record
            }
            Self::Alert => vec![0x15, major, minor, 0x00, 0x02, 0x02, 0x28],
            Self::Garbage => vec![0xFF; 16],
            Self::Close | Self::Silent => Vec::new(),
        }
    }
}

/// ServerHello-less first flight: a single ServerHelloDone message.
fn server_hello_done(version: [u8; 2]) -> [u8; 9] {
    [0x16, version[0], version[1], 0x00, 0x04, 0x0E, 0x00, 0x00, 0x00]
}

/// Loopback server answering every connection with one [`ServerBehaviour`].
pub struct FakeTlsServer {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    probes: Arc<Mutex<Vec<Vec<u8>>>>,
    task: JoinHandle<()>,
}

impl FakeTlsServer {
    /// Start a server that answers right after reading a probe.
    pub async fn start(behaviour: ServerBehaviour) -> io::Result<Self> {
        Self::spawn(behaviour, false).await
    }

    /// Start a server that sends ServerHelloDone after the ClientHello and
    /// only then reads the heartbeat.
    pub async fn start_with_handshake(behaviour: ServerBehaviour) -> io::Result<Self> {
        Self::spawn(behaviour, true).await
    }

    async fn spawn(behaviour: ServerBehaviour, handshake: bool) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let connections = Arc::new(AtomicUsize::new(0));
        let probes = Arc::new(Mutex::new(Vec::new()));

        let counter = Arc::clone(&connections);
        let sink = Arc::clone(&probes);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let sink = Arc::clone(&sink);
                tokio::spawn(async move {
                    if let Ok(probe) = serve(stream, behaviour, handshake).await {
                        sink.lock().push(probe);
                    }
                });
            }
        });

        Ok(Self {
            addr,
            connections,
            probes,
            task,
        })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Complete probes read so far, one per finished connection.
    pub fn probes(&self) -> Vec<Vec<u8>> {
        self.probes.lock().clone()
    }

    /// Wait up to five seconds for `n` connections to finish.
    pub async fn wait_for_probes(&self, n: usize) -> Vec<Vec<u8>> {
        for _ in 0..500 {
            if self.probes.lock().len() >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.probes()
    }
}

impl Drop for FakeTlsServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(mut stream: TcpStream, behaviour: ServerBehaviour, handshake: bool) -> io::Result<Vec<u8>> {
    let mut probe = vec![0u8; PROBE_BYTES];
    stream.read_exact(&mut probe[..225]).await?;
    let version = [probe[1], probe[2]];

    if handshake {
        stream.write_all(&server_hello_done(version)).await?;
    }
    stream.read_exact(&mut probe[225..]).await?;

    match behaviour {
        ServerBehaviour::Close => return Ok(probe),
        ServerBehaviour::Silent => {
            // Hold the connection until the client hangs up
            let mut sink = [0u8; 64];
            while stream.read(&mut sink).await? > 0 {}
            return Ok(probe);
        }
        _ => {}
    }

    stream.write_all(&behaviour.reply(version)).await?;
    stream.flush().await?;

    // Let the client close first
    let mut sink = [0u8; 64];
    while stream.read(&mut sink).await.unwrap_or(0) > 0 {}
    Ok(probe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leak_reply_is_one_full_record() {
        let reply = ServerBehaviour::Leak.reply([0x03, 0x02]);
        let declared = usize::from(u16::from_be_bytes([reply[3], reply[4]]));
        assert_eq!(&reply[..3], &[0x18, 0x03, 0x02]);
        assert_eq!(declared, reply.len() - 5);
        assert_eq!(declared, 3 + 0x1000 + 16);
    }

    #[test]
    fn test_echo_reply_fits_overhead() {
        let reply = ServerBehaviour::Echo.reply([0x03, 0x03]);
        assert_eq!(reply.len(), 5 + 19);
    }
}
