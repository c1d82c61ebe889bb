//! # Bleed-Guard
//!
//! ```text
//! bleed-guard probe <host> [--port N] [--tls-version 1.2] [--timeout 8s]
//! bleed-guard check <host> [--strategy remote|local]
//! bleed-guard gate [--strategy remote|local] < urls.txt
//! ```
//!
//! Exit status: 0 safe, 2 vulnerable, 3 no verdict, 1 on errors.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{error, Instrument};

use bg_01_heartbeat_probe::{Classification, HeartbeatProbeApi, ProbeTarget, TlsVersion};
use bg_02_interception_gate::Host;
use bg_runtime::{build_prober, spawn_line_source, GuardConfig, GuardRuntime, StrategyKind};
use bg_telemetry::{host_span, init_logging, TelemetryConfig};

const EXIT_UNSAFE: u8 = 2;
const EXIT_NO_VERDICT: u8 = 3;

/// Client-side guard against the TLS heartbeat memory-disclosure flaw
#[derive(Parser, Debug)]
#[command(name = "bleed-guard", version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe one server over the wire
    Probe {
        host: String,

        /// Server port [default: probe.port]
        #[arg(short, long)]
        port: Option<u16>,

        /// Record-layer version: 1.0, 1.1 or 1.2 [default: probe.tls_version]
        #[arg(long)]
        tls_version: Option<TlsVersion>,

        /// Probe deadline between 1s and 60s, e.g. 2s [default: probe.timeout]
        #[arg(long, value_parser = parse_duration)]
        timeout: Option<Duration>,

        /// Read the handshake up to ServerHelloDone before the heartbeat
        #[arg(long)]
        await_server_hello_done: bool,
    },

    /// Verify one host with the configured strategy
    Check {
        host: String,

        /// Override the configured strategy
        #[arg(long)]
        strategy: Option<StrategyKind>,
    },

    /// Gate URLs read from stdin, one per line, until EOF or Ctrl-C
    Gate {
        /// Override the configured strategy
        #[arg(long)]
        strategy: Option<StrategyKind>,
    },
}

fn parse_duration(s: &str) -> Result<Duration, humantime_serde::re::humantime::DurationError> {
    humantime_serde::re::humantime::parse_duration(s)
}

fn load_config(path: Option<&Path>) -> Result<GuardConfig> {
    let mut config = match path {
        Some(path) => GuardConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => GuardConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("applying environment overrides")?;
    Ok(config)
}

async fn probe(
    mut config: GuardConfig,
    host: String,
    port: Option<u16>,
    tls_version: Option<TlsVersion>,
    timeout: Option<Duration>,
    await_server_hello_done: bool,
    as_json: bool,
) -> Result<ExitCode> {
    if let Some(version) = tls_version {
        config.probe = config.probe.with_tls_version(version);
    }
    if let Some(timeout) = timeout {
        config.probe = config.probe.with_timeout(timeout);
    }
    if await_server_hello_done {
        config.probe = config.probe.with_await_server_hello_done(true);
    }
    let prober = build_prober(&config.probe).context("building prober")?;
    let target = ProbeTarget::new(host, port.unwrap_or(config.probe.port));

    let classification = prober
        .probe(&target, config.probe.timeout)
        .instrument(host_span!("probe", target.host, port = target.port))
        .await;

    if as_json {
        println!(
            "{}",
            json!({
                "host": target.host,
                "port": target.port,
                "tls_version": config.probe.tls_version,
                "classification": classification,
            })
        );
    } else {
        println!("{target}: {classification}");
    }

    Ok(match classification {
        Classification::NotVulnerable => ExitCode::SUCCESS,
        Classification::Vulnerable => ExitCode::from(EXIT_UNSAFE),
        Classification::Inconclusive => ExitCode::from(EXIT_NO_VERDICT),
    })
}

async fn check(config: GuardConfig, host: String, as_json: bool) -> Result<ExitCode> {
    let host = Host::parse(&host).with_context(|| format!("invalid host {host:?}"))?;
    let runtime = GuardRuntime::new(config).context("building runtime")?;
    let strategy = runtime.dispatcher().strategy();

    let result = runtime
        .check(&host)
        .instrument(host_span!("check", host, strategy))
        .await;

    match (&result, as_json) {
        (Ok(safe), true) => println!(
            "{}",
            json!({ "host": host, "strategy": strategy, "safe": safe })
        ),
        (Err(e), true) => println!(
            "{}",
            json!({ "host": host, "strategy": strategy, "error": e.to_string() })
        ),
        (Ok(true), false) => println!("{host}: safe"),
        (Ok(false), false) => println!("{host}: unsafe"),
        (Err(e), false) => println!("{host}: no verdict ({e})"),
    }

    Ok(match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_UNSAFE),
        Err(_) => ExitCode::from(EXIT_NO_VERDICT),
    })
}

async fn gate(config: GuardConfig) -> Result<ExitCode> {
    let runtime = GuardRuntime::new(config).context("building runtime")?;
    let source = spawn_line_source(tokio::io::BufReader::new(tokio::io::stdin()), 64);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let stats = runtime
        .serve(source, shutdown)
        .await
        .context("running gate")?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(ExitCode::SUCCESS)
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Probe {
            host,
            port,
            tls_version,
            timeout,
            await_server_hello_done,
        } => {
            probe(
                config,
                host,
                port,
                tls_version,
                timeout,
                await_server_hello_done,
                cli.json,
            )
            .await
        }
        Command::Check { host, strategy } => {
            if let Some(strategy) = strategy {
                config.strategy = strategy;
            }
            check(config, host, cli.json).await
        }
        Command::Gate { strategy } => {
            if let Some(strategy) = strategy {
                config.strategy = strategy;
            }
            gate(config).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::from_env();
    match cli.verbose {
        0 => {}
        1 => telemetry = telemetry.with_log_level("debug"),
        _ => telemetry = telemetry.with_log_level("trace"),
    }
    if let Err(e) = init_logging(&telemetry) {
        eprintln!("warning: {e}");
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "bleed-guard failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
