//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Parse the listen address before any socket is opened
//! - Validate value ranges (lifetime, tick, buffer, capacity > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SinkConfig → Result<BindAddress, Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::address::{AddressError, BindAddress};
use crate::config::schema::SinkConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no listen address given (expected [ip:]port)")]
    MissingAddress,

    #[error("listener.address: {0}")]
    Address(#[from] AddressError),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("observability.metrics_address: invalid socket address {0:?}")]
    MetricsAddress(String),
}

/// Validate a configuration, returning the parsed bind address on success.
pub fn validate_config(config: &SinkConfig) -> Result<BindAddress, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let bind = match config.listener.address.as_deref() {
        None => {
            errors.push(ValidationError::MissingAddress);
            None
        }
        Some(raw) => match BindAddress::parse(raw) {
            Ok(addr) => Some(addr),
            Err(e) => {
                errors.push(e.into());
                None
            }
        },
    };

    let positive = [
        ("listener.max_connections", config.listener.max_connections as u64),
        ("listener.read_buffer_size", config.listener.read_buffer_size as u64),
        ("lifecycle.connection_lifetime_ms", config.lifecycle.connection_lifetime_ms),
        ("lifecycle.tick_interval_ms", config.lifecycle.tick_interval_ms),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    match bind {
        Some(addr) if errors.is_empty() => Ok(addr),
        _ => Err(errors),
    }
}
