//! Shared utilities for integration tests.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tcp_sink::net::{ConnectionHooks, SinkConnection, SinkSocket};
use tcp_sink::{Shutdown, SinkConfig, SinkServer};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Counts accepted and released connections.
#[derive(Debug, Clone, Default)]
pub struct CountingHooks {
    pub accepted: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
}

impl ConnectionHooks<SinkSocket> for CountingHooks {
    fn on_accepted(&mut self, _conn: &SinkConnection<SinkSocket>) {
        self.accepted.fetch_add(1, Ordering::SeqCst);
    }

    fn on_released(&mut self, _conn: SinkConnection<SinkSocket>) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// A sink running in the background on a loopback port.
pub struct RunningSink {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub hooks: CountingHooks,
    pub handle: JoinHandle<io::Result<()>>,
}

pub fn config(lifetime_ms: u64, tick_ms: u64, max_connections: usize) -> SinkConfig {
    let mut config = SinkConfig::default();
    config.lifecycle.connection_lifetime_ms = lifetime_ms;
    config.lifecycle.tick_interval_ms = tick_ms;
    config.listener.max_connections = max_connections;
    config
}

pub async fn start_sink(config: SinkConfig) -> RunningSink {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let hooks = CountingHooks::default();
    let server = SinkServer::with_hooks(&config, hooks.clone());
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    RunningSink {
        addr,
        shutdown,
        hooks,
        handle,
    }
}

/// Poll `cond` until it holds or `timeout` passes.
pub async fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

/// How a client read ended.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The server closed the connection (FIN or RST) after sending `received` bytes.
    Closed { received: usize },
    /// Still open when the timeout passed.
    Open { received: usize },
}

/// Read until the server closes the connection or `timeout` passes.
pub async fn read_until_closed(stream: &mut (impl AsyncRead + Unpin), timeout: Duration) -> ReadOutcome {
    let mut received = 0;
    let mut buf = [0u8; 1024];
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match tokio::time::timeout_at(deadline, stream.read(&mut buf)).await {
            Err(_) => return ReadOutcome::Open { received },
            Ok(Ok(0)) | Ok(Err(_)) => return ReadOutcome::Closed { received },
            Ok(Ok(n)) => received += n,
        }
    }
}
