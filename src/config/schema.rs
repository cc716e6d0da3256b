//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the sink.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the TCP sink.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SinkConfig {
    /// Listener configuration (bind address, capacity).
    pub listener: ListenerConfig,

    /// Connection lifetime and sweep cadence.
    pub lifecycle: LifecycleConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address in `[ip:]port` form (e.g. ":9" or "127.0.0.1:9000").
    pub address: Option<String>,

    /// Maximum concurrently active connections.
    pub max_connections: usize,

    /// Size of the shared read buffer in bytes.
    pub read_buffer_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: None,
            max_connections: 10_000,
            read_buffer_size: 4096,
        }
    }
}

/// Connection lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Absolute lifetime of a connection, measured from accept, in milliseconds.
    /// Reads do not extend it.
    pub connection_lifetime_ms: u64,

    /// Interval between expiry/disposal sweeps in milliseconds.
    pub tick_interval_ms: u64,
}

impl LifecycleConfig {
    pub fn connection_lifetime(&self) -> Duration {
        Duration::from_millis(self.connection_lifetime_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            connection_lifetime_ms: 5 * 60 * 1000,
            tick_interval_ms: 100,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
