//! TCP listener setup.
//!
//! # Responsibilities
//! - Bind the validated `[ip:]port` address
//! - Report bind failures as startup errors

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::BindAddress;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind { addr, source } => write!(f, "Failed to bind {}: {}", addr, source),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind { source, .. } => Some(source),
        }
    }
}

/// Bind a listener on `addr`.
pub async fn bind(addr: BindAddress) -> Result<TcpListener, ListenerError> {
    let socket_addr = addr.socket_addr();
    let listener = TcpListener::bind(socket_addr)
        .await
        .map_err(|source| ListenerError::Bind {
            addr: socket_addr,
            source,
        })?;

    let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
        addr: socket_addr,
        source,
    })?;

    tracing::info!(
        address = %local_addr,
        wildcard = addr.is_wildcard(),
        "Listener bound"
    );

    Ok(listener)
}
