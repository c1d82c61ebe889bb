//! # Bleed-Guard Runtime
//!
//! Wires the configured verification strategy into the interception gate.
//! The `bleed-guard` binary is a thin CLI over [`GuardRuntime`].
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file, then `BG_*` environment overrides)
//! 2. Build the dispatcher for the selected strategy
//! 3. Build the verdict cache and the gate
//! 4. Feed connection attempts until input ends or shutdown is signalled

pub mod config;
pub mod connection;

pub use config::{ConfigError, GuardConfig, StrategyKind};
pub use connection::{spawn_line_source, ConnectionState, LoggedConnection, UrlError};

use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use bg_01_heartbeat_probe::{HeartbeatProber, ProbeConfig, TcpConnector};
use bg_02_interception_gate::{
    ConnectionSource, DispatchError, GateStatsSnapshot, Host, InterceptionGate, LocalProbeVerifier,
    RemoteVerifier, VerdictCache, VerificationDispatcher,
};

/// Build a TCP heartbeat prober.
pub fn build_prober(config: &ProbeConfig) -> Result<HeartbeatProber<TcpConnector>, ConfigError> {
    Ok(HeartbeatProber::new(TcpConnector::new(), config.clone())?)
}

/// Build the dispatcher for `config.strategy`.
pub fn build_dispatcher(
    config: &GuardConfig,
) -> Result<Arc<dyn VerificationDispatcher>, ConfigError> {
    let dispatcher: Arc<dyn VerificationDispatcher> = match config.strategy {
        StrategyKind::Remote => Arc::new(RemoteVerifier::new(&config.remote)?),
        StrategyKind::Local => {
            if config.gate.verify_timeout < config.probe.timeout {
                warn!(
                    verify_timeout = ?config.gate.verify_timeout,
                    probe_timeout = ?config.probe.timeout,
                    "gate timeout is shorter than the probe timeout, slow probes will fail open"
                );
            }
            let prober = build_prober(&config.probe)?;
            Arc::new(LocalProbeVerifier::new(
                Arc::new(prober),
                config.probe.port,
                config.probe.timeout,
            ))
        }
    };
    Ok(dispatcher)
}

/// Configured verification strategy plus the gate settings around it.
pub struct GuardRuntime {
    config: GuardConfig,
    dispatcher: Arc<dyn VerificationDispatcher>,
}

impl GuardRuntime {
    /// Validate `config` and build its strategy.
    pub fn new(config: GuardConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let dispatcher = build_dispatcher(&config)?;
        info!(
            strategy = %config.strategy,
            failure_policy = %config.gate.failure_policy,
            coalesce = config.gate.coalesce_in_flight,
            "runtime configured"
        );
        Ok(Self { config, dispatcher })
    }

    /// Use `dispatcher` instead of the configured strategy.
    pub fn with_dispatcher(
        config: GuardConfig,
        dispatcher: Arc<dyn VerificationDispatcher>,
    ) -> Result<Self, ConfigError> {
        config.gate.validate()?;
        Ok(Self { config, dispatcher })
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<dyn VerificationDispatcher> {
        &self.dispatcher
    }

    /// One verification of `host`, bounded by the gate's verify timeout.
    /// Nothing is cached.
    pub async fn check(&self, host: &Host) -> Result<bool, DispatchError> {
        let limit = self.config.gate.verify_timeout;
        match tokio::time::timeout(limit, self.dispatcher.verify(host)).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::Timeout(limit)),
        }
    }

    /// A gate with a fresh verdict cache.
    pub fn build_gate(&self) -> Result<Arc<InterceptionGate>, ConfigError> {
        let cache = VerdictCache::with_config(&self.config.gate.cache)?;
        let gate = InterceptionGate::new(
            Arc::clone(&self.dispatcher),
            Arc::new(cache),
            self.config.gate.clone(),
        )?;
        Ok(Arc::new(gate))
    }

    /// Gate every attempt from `source` until it closes or `shutdown`
    /// completes, then report the gate's counters.
    pub async fn serve<S, F>(&self, source: S, shutdown: F) -> Result<GateStatsSnapshot, ConfigError>
    where
        S: ConnectionSource,
        F: Future<Output = ()>,
    {
        let gate = self.build_gate()?;
        info!(strategy = self.dispatcher.strategy(), "gate running");
        let observed = gate.run(source, shutdown).await;
        let stats = gate.stats();
        info!(
            observed,
            cached = gate.cache().len(),
            resumed = stats.resumed,
            cancelled = stats.cancelled,
            "gate stopped"
        );
        Ok(stats)
    }
}
