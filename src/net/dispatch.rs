//! Event dispatch loop binding the lifecycle manager to tokio.
//!
//! # Responsibilities
//! - Accept connections and hand them to the manager
//! - Poll read readiness of active connections and discard what arrives
//! - Deliver peer closes and read errors as retirements
//! - Drive the periodic expiry/disposal tick
//!
//! # Design Decisions
//! - One task, one `select!`: every callback runs to completion before the
//!   next event is picked, so the manager needs no locking
//! - Each active connection has its own readiness stream in a `SelectAll`;
//!   a wake-up only touches the connections that are ready
//! - Retiring a connection deregisters it, which ends its readiness stream
//! - Shutdown and tick are polled first so an I/O flood cannot delay the sweep

use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use futures_util::stream::{BoxStream, SelectAll, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::SinkConfig;
use crate::net::connection::{ConnectionId, ConnectionState};
use crate::net::hooks::{ConnectionHooks, TracingHooks};
use crate::net::manager::{AcceptError, ConnectionManager, RetireReason};
use crate::net::socket::SinkSocket;
use crate::observability::metrics;

/// Upper bound on reads serviced per connection per readiness event.
const READS_PER_EVENT: usize = 16;

enum Event {
    Shutdown,
    Tick,
    Accept(io::Result<(TcpStream, SocketAddr)>),
    Readable(ConnectionId),
}

/// The sink server: a listener, a manager and a tick.
pub struct SinkServer<H = TracingHooks> {
    manager: ConnectionManager<SinkSocket, H>,
    readiness: SelectAll<BoxStream<'static, ConnectionId>>,
    tick: Duration,
    buffer: Vec<u8>,
}

impl SinkServer<TracingHooks> {
    pub fn new(config: &SinkConfig) -> Self {
        Self::with_hooks(config, TracingHooks)
    }
}

impl<H: ConnectionHooks<SinkSocket>> SinkServer<H> {
    pub fn with_hooks(config: &SinkConfig, hooks: H) -> Self {
        Self {
            manager: ConnectionManager::new(
                config.lifecycle.connection_lifetime(),
                config.listener.max_connections,
                hooks,
            ),
            readiness: SelectAll::new(),
            tick: config.lifecycle.tick_interval(),
            buffer: vec![0; config.listener.read_buffer_size.max(1)],
        }
    }

    pub fn manager(&self) -> &ConnectionManager<SinkSocket, H> {
        &self.manager
    }

    /// Run until `shutdown` fires (or its sender is dropped).
    ///
    /// Connections still open at that point are dropped, which closes them.
    pub async fn run(
        mut self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            lifetime_ms = self.manager.lifetime().as_millis() as u64,
            tick_ms = self.tick.as_millis() as u64,
            max_connections = self.manager.max_connections(),
            "Sink server starting"
        );

        let mut ticker = time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.recv() => Event::Shutdown,
                _ = ticker.tick() => Event::Tick,
                accepted = listener.accept() => Event::Accept(accepted),
                Some(id) = self.readiness.next(), if !self.readiness.is_empty() => Event::Readable(id),
            };

            match event {
                Event::Shutdown => break,
                Event::Tick => {
                    self.manager.on_tick(now());
                }
                Event::Accept(Ok((stream, peer))) => self.on_accept(stream, peer),
                Event::Accept(Err(e)) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                }
                Event::Readable(id) => self.on_readable(id),
            }
        }

        tracing::info!(
            active = self.manager.active_len(),
            closing = self.manager.closing_len(),
            "Sink server stopped"
        );
        Ok(())
    }

    fn on_accept(&mut self, stream: TcpStream, peer: SocketAddr) {
        let (socket, readiness) = SinkSocket::register(stream);
        match self.manager.accept(socket, peer, now()) {
            Ok(id) => {
                self.readiness.push(readiness.map(move |()| id).boxed());
                metrics::record_connection_counts(self.manager.active_len(), self.manager.closing_len());
            }
            Err(AcceptError::AtCapacity { limit }) => {
                metrics::record_rejected();
                tracing::warn!(peer_addr = %peer, limit, "Connection limit reached, dropping connection");
            }
        }
    }

    fn on_readable(&mut self, id: ConnectionId) {
        for _ in 0..READS_PER_EVENT {
            let Some(conn) = self.manager.get(id) else {
                return;
            };
            if conn.state() != ConnectionState::Active {
                return;
            }

            let read = conn.io().stream().try_read(&mut self.buffer);
            match read {
                Ok(0) => {
                    self.on_close(id, RetireReason::PeerClosed);
                    return;
                }
                Ok(n) => {
                    self.manager.on_read(id, &self.buffer[..n]);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!(connection_id = %id, error = %e, "Read failed");
                    self.on_close(id, RetireReason::TransportError);
                    return;
                }
            }
        }
    }

    fn on_close(&mut self, id: ConnectionId, reason: RetireReason) {
        if let Err(e) = self.manager.on_close(id, reason) {
            tracing::warn!(connection_id = %id, error = %e, "Close for a connection that is not active");
        }
    }
}

fn now() -> Instant {
    time::Instant::now().into_std()
}
