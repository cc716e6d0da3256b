//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration and parse the bind address
//! - Start the optional metrics exporter
//! - Bind the listener and run the dispatch loop
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The address is parsed before any socket is opened

use std::net::SocketAddr;

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;

use crate::config::validation::validate_config;
use crate::config::{ConfigError, SinkConfig};
use crate::lifecycle::Shutdown;
use crate::net::listener::{self, ListenerError};
use crate::net::SinkServer;
use crate::observability::metrics;

/// Errors that stop the sink before or while serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("Metrics exporter failed on {addr}: {source}")]
    Metrics {
        addr: SocketAddr,
        #[source]
        source: BuildError,
    },

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validate, bind and serve until `shutdown` fires.
pub async fn run(config: SinkConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    let bind = validate_config(&config).map_err(ConfigError::from)?;

    tracing::info!(
        address = %bind,
        lifetime_ms = config.lifecycle.connection_lifetime_ms,
        tick_ms = config.lifecycle.tick_interval_ms,
        max_connections = config.listener.max_connections,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Already validated.
        if let Ok(addr) = config.observability.metrics_address.parse::<SocketAddr>() {
            metrics::init_metrics(addr).map_err(|source| StartupError::Metrics { addr, source })?;
        }
    }

    let listener = listener::bind(bind).await?;
    let server = SinkServer::new(&config);
    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}
