//! TCP sink server.
//!
//! # Architecture Overview
//!
//! ```text
//! Client ──▶ listener
//!              │
//!              ▼
//!         dispatch loop (one task, select!)
//!           accept │ readable │ tick
//!              ▼
//!         manager: active list ──retire──▶ closing set ──next tick──▶ dropped
//!                  (deadline-ordered)
//!
//! Cross-cutting: config · lifecycle (signals, shutdown) · observability
//! ```
//!
//! Usage: `tcp-sink [OPTIONS] [ip:]port`. Exit code 0 on signal shutdown,
//! 1 on any startup failure.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};

use tcp_sink::config::loader::load_config;
use tcp_sink::config::SinkConfig;
use tcp_sink::lifecycle::{signals, startup, Shutdown};
use tcp_sink::observability::logging;

#[derive(Parser)]
#[command(name = "tcp-sink", version)]
#[command(about = "Accept TCP connections, discard all input, close each after a fixed lifetime", long_about = None)]
struct Cli {
    /// Listen address as [ip:]port, e.g. ":9" or "127.0.0.1:9000"
    address: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Connection lifetime in milliseconds (default 300000)
    #[arg(long)]
    lifetime_ms: Option<u64>,

    /// Sweep interval in milliseconds (default 100)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Maximum concurrently active connections
    #[arg(long)]
    max_connections: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    metrics_address: Option<String>,
}

impl Cli {
    /// CLI values win over the config file.
    fn apply(self, config: &mut SinkConfig) {
        if let Some(address) = self.address {
            config.listener.address = Some(address);
        }
        if let Some(ms) = self.lifetime_ms {
            config.lifecycle.connection_lifetime_ms = ms;
        }
        if let Some(ms) = self.tick_ms {
            config.lifecycle.tick_interval_ms = ms;
        }
        if let Some(max) = self.max_connections {
            config.listener.max_connections = max;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if let Some(addr) = self.metrics_address {
            config.observability.metrics_enabled = true;
            config.observability.metrics_address = addr;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let mut config = match cli.config.as_deref() {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => SinkConfig::default(),
    };
    cli.apply(&mut config);

    if config.listener.address.is_none() {
        eprintln!("Error: missing listen address\n\n{}", Cli::command().render_usage());
        return ExitCode::FAILURE;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("tcp-sink v{} starting", env!("CARGO_PKG_VERSION"));

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    match startup::run(config, &shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
