//! In-memory connector for tests.
//!
//! Every `connect` creates a duplex pipe and hands the far end to a
//! scripted peer running on its own task.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::DuplexStream;
use tokio::task::JoinHandle;

use crate::domain::{ProbeError, ProbeTarget};
use crate::ports::Connector;

const PIPE_CAPACITY: usize = 64 * 1024;

/// Connector whose peer is a closure.
pub struct MemoryConnector<F> {
    peer: F,
    connections: AtomicUsize,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<F, Fut> MemoryConnector<F>
where
    F: Fn(DuplexStream) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    pub fn new(peer: F) -> Self {
        Self {
            peer,
            connections: AtomicUsize::new(0),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Number of connections opened so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Wait for every peer task; panics if any peer panicked.
    pub async fn join_peers(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                if e.is_panic() {
                    std::panic::resume_unwind(e.into_panic());
                }
            }
        }
    }
}

#[async_trait]
impl<F, Fut> Connector for MemoryConnector<F>
where
    F: Fn(DuplexStream) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    type Stream = DuplexStream;

    async fn connect(
        &self,
        _target: &ProbeTarget,
        _timeout: Duration,
    ) -> Result<DuplexStream, ProbeError> {
        let (client, server) = tokio::io::duplex(PIPE_CAPACITY);
        self.connections.fetch_add(1, Ordering::SeqCst);
        let task = tokio::spawn((self.peer)(server));
        self.tasks.lock().push(task);
        Ok(client)
    }
}
