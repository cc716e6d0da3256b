//! Pluggable accept/release hooks.
//!
//! The manager calls `on_accepted` once a connection has its id and
//! deadline, and hands the connection to `on_released` during the disposal
//! sweep. Whatever `on_released` does not keep is dropped there, which is
//! where the socket is finally closed.

use crate::net::connection::SinkConnection;
use crate::observability::metrics;

pub trait ConnectionHooks<S> {
    fn on_accepted(&mut self, conn: &SinkConnection<S>);

    fn on_released(&mut self, conn: SinkConnection<S>);
}

/// Default hooks: structured log events plus metrics.
#[derive(Debug, Default)]
pub struct TracingHooks;

impl<S> ConnectionHooks<S> for TracingHooks {
    fn on_accepted(&mut self, conn: &SinkConnection<S>) {
        metrics::record_accepted();
        tracing::debug!(
            connection_id = %conn.id(),
            peer_addr = %conn.peer(),
            lifetime_ms = conn.deadline().saturating_duration_since(conn.accepted_at()).as_millis() as u64,
            "Connection accepted"
        );
    }

    fn on_released(&mut self, conn: SinkConnection<S>) {
        tracing::trace!(
            connection_id = %conn.id(),
            peer_addr = %conn.peer(),
            bytes_discarded = conn.bytes_discarded(),
            "Connection released"
        );
    }
}
