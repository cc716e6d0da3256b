//! Sink connection and its lifecycle state.
//!
//! # Responsibilities
//! - Identify a connection across arena slot reuse (`ConnectionId`)
//! - Discard every inbound byte, never produce outbound bytes
//! - Carry the absolute deadline assigned at accept time
//! - Hand retirement back to the manager on peer close

use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

/// Identifier of a connection inside the manager's arena.
///
/// The generation distinguishes a live connection from an earlier one that
/// occupied the same slot, so a stale id never aliases a newer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId {
    slot: usize,
    generation: u32,
}

impl ConnectionId {
    pub(crate) fn new(slot: usize, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Arena slot.
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}.{}", self.slot, self.generation)
    }
}

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Polled for reads, counted against capacity, eligible for expiry.
    Active,
    /// Out of the active set, waiting for the next disposal sweep.
    Closing,
    /// Released. Only ever reported for ids that are no longer in the arena.
    Destroyed,
}

/// The I/O side of a connection, as the manager sees it.
pub trait SinkIo {
    /// Stop delivering read readiness. Called when the connection leaves
    /// the active set.
    fn deregister(&mut self);
}

impl SinkIo for () {
    fn deregister(&mut self) {}
}

/// Callbacks the dispatch loop drives on a connection.
pub trait ConnectionHandler {
    /// Consume inbound bytes, returning how many were taken.
    fn on_read(&mut self, buf: &[u8]) -> usize;

    /// Produce outbound bytes into `buf`, returning how many were written.
    fn on_write(&mut self, buf: &mut [u8]) -> usize;

    /// The peer went away or the transport failed. The manager retires the
    /// connection afterwards.
    fn on_close(&mut self);
}

/// A connection that swallows everything it receives.
///
/// The deadline is fixed at accept time. Read activity never moves it, so
/// it caps the total lifetime of the connection rather than its idle time.
#[derive(Debug)]
pub struct SinkConnection<S> {
    id: ConnectionId,
    io: S,
    peer: SocketAddr,
    accepted_at: Instant,
    deadline: Instant,
    state: ConnectionState,
    bytes_discarded: u64,
}

impl<S> SinkConnection<S> {
    pub(crate) fn new(
        id: ConnectionId,
        io: S,
        peer: SocketAddr,
        accepted_at: Instant,
        deadline: Instant,
    ) -> Self {
        Self {
            id,
            io,
            peer,
            accepted_at,
            deadline,
            state: ConnectionState::Active,
            bytes_discarded: 0,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The owned I/O handle.
    pub fn io(&self) -> &S {
        &self.io
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn accepted_at(&self) -> Instant {
        self.accepted_at
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Total bytes swallowed so far.
    pub fn bytes_discarded(&self) -> u64 {
        self.bytes_discarded
    }

    pub(crate) fn io_mut(&mut self) -> &mut S {
        &mut self.io
    }

    pub(crate) fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
    }
}

impl<S> ConnectionHandler for SinkConnection<S> {
    fn on_read(&mut self, buf: &[u8]) -> usize {
        self.bytes_discarded = self.bytes_discarded.saturating_add(buf.len() as u64);
        buf.len()
    }

    fn on_write(&mut self, _buf: &mut [u8]) -> usize {
        tracing::error!(
            connection_id = %self.id,
            peer_addr = %self.peer,
            "write requested on a sink connection; aborting"
        );
        std::process::abort()
    }

    fn on_close(&mut self) {
        tracing::trace!(connection_id = %self.id, peer_addr = %self.peer, "Peer closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sink() -> SinkConnection<()> {
        let now = Instant::now();
        SinkConnection::new(
            ConnectionId::new(3, 7),
            (),
            "10.0.0.1:4242".parse().unwrap(),
            now,
            now + Duration::from_secs(300),
        )
    }

    #[test]
    fn read_consumes_everything() {
        let mut conn = sink();
        let patterns: [&[u8]; 5] = [b"", b"x", b"GET / HTTP/1.1\r\n\r\n", &[0u8; 4096], &[0xffu8; 17]];
        let mut total = 0u64;
        for buf in patterns {
            assert_eq!(conn.on_read(buf), buf.len());
            total += buf.len() as u64;
        }
        assert_eq!(conn.bytes_discarded(), total);
    }

    #[test]
    fn reads_never_move_the_deadline() {
        let mut conn = sink();
        let deadline = conn.deadline();
        for _ in 0..100 {
            conn.on_read(b"keepalive");
        }
        assert_eq!(conn.deadline(), deadline);
    }

    #[test]
    fn close_leaves_state_to_manager() {
        let mut conn = sink();
        conn.on_close();
        assert_eq!(conn.state(), ConnectionState::Active);
    }

    /// Set in the child process spawned by `write_aborts_the_process`.
    #[cfg(unix)]
    const WRITE_CHILD_ENV: &str = "TCP_SINK_WRITE_ABORT_CHILD";

    #[cfg(unix)]
    #[test]
    fn write_aborts_the_process() {
        use std::os::unix::process::ExitStatusExt;
        use std::process::{Command, Stdio};

        if std::env::var_os(WRITE_CHILD_ENV).is_some() {
            let mut conn = sink();
            let mut buf = [0u8; 64];
            let _ = conn.on_write(&mut buf);
            // Only reached if the write returned.
            return;
        }

        let status = Command::new(std::env::current_exe().unwrap())
            .args([
                "net::connection::tests::write_aborts_the_process",
                "--exact",
                "--test-threads=1",
            ])
            .env(WRITE_CHILD_ENV, "1")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .unwrap();

        assert!(!status.success(), "write on a sink connection returned");
        // SIGABRT
        assert_eq!(status.signal(), Some(6));
    }

    #[test]
    fn id_display() {
        assert_eq!(ConnectionId::new(3, 7).to_string(), "conn-3.7");
    }
}
