//! Connection lifecycle manager.
//!
//! # Responsibilities
//! - Own every accepted connection in a slab arena
//! - Keep the active set ordered by accept time (index-linked list)
//! - Retire connections into the closing set in O(1)
//! - Sweep expired connections and release closing ones on each tick
//!
//! # Invariants
//! - A live connection is in exactly one of {active list, closing set}
//! - Deadlines are non-decreasing from head to tail of the active list,
//!   so the expiry sweep only ever looks at the head
//! - A connection is released only by `on_tick`, and only if it was already
//!   closing when that tick began. Nothing is released from inside a read
//!   or close callback.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use slab::Slab;
use thiserror::Error;

use crate::net::connection::{
    ConnectionHandler, ConnectionId, ConnectionState, SinkConnection, SinkIo,
};
use crate::net::hooks::ConnectionHooks;
use crate::observability::metrics;

/// Default absolute connection lifetime.
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(5 * 60);

/// Why a connection left the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireReason {
    /// Its deadline passed.
    Expired,
    /// The peer closed its side.
    PeerClosed,
    /// A read failed.
    TransportError,
}

impl RetireReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetireReason::Expired => "expired",
            RetireReason::PeerClosed => "peer_closed",
            RetireReason::TransportError => "transport_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcceptError {
    #[error("connection limit reached ({limit} active)")]
    AtCapacity { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetireError {
    #[error("{0} is not a live connection")]
    Unknown(ConnectionId),

    #[error("{0} is already closing")]
    AlreadyClosing(ConnectionId),
}

/// Outcome of one `on_tick`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    /// Connections moved from active to closing by the expiry sweep.
    pub expired: usize,
    /// Connections released by the disposal sweep.
    pub released: usize,
}

struct Entry<S> {
    conn: SinkConnection<S>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Tracks every open connection from accept to release.
pub struct ConnectionManager<S, H> {
    entries: Slab<Entry<S>>,
    head: Option<usize>,
    tail: Option<usize>,
    active_len: usize,
    closing: Vec<ConnectionId>,
    next_generation: u32,
    lifetime: Duration,
    max_connections: usize,
    hooks: H,
}

impl<S: SinkIo, H: ConnectionHooks<S>> ConnectionManager<S, H> {
    pub fn new(lifetime: Duration, max_connections: usize, hooks: H) -> Self {
        Self {
            entries: Slab::new(),
            head: None,
            tail: None,
            active_len: 0,
            closing: Vec::new(),
            next_generation: 0,
            lifetime,
            max_connections,
            hooks,
        }
    }

    /// Take ownership of a freshly accepted socket.
    ///
    /// The deadline is `now + lifetime`, never earlier than the current tail's
    /// deadline, and is not touched again.
    pub fn accept(&mut self, io: S, peer: SocketAddr, now: Instant) -> Result<ConnectionId, AcceptError> {
        if self.active_len >= self.max_connections {
            return Err(AcceptError::AtCapacity {
                limit: self.max_connections,
            });
        }

        let mut deadline = now + self.lifetime;
        if let Some(tail) = self.tail {
            deadline = deadline.max(self.entries[tail].conn.deadline());
        }

        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);

        let vacant = self.entries.vacant_entry();
        let slot = vacant.key();
        let id = ConnectionId::new(slot, generation);
        vacant.insert(Entry {
            conn: SinkConnection::new(id, io, peer, now, deadline),
            prev: None,
            next: None,
        });
        self.link_tail(slot);
        self.active_len += 1;

        self.hooks.on_accepted(&self.entries[slot].conn);
        Ok(id)
    }

    /// Move an active connection to the closing set.
    ///
    /// Safe to call while the dispatch loop is servicing `id`: the connection
    /// stays in the arena until a later `on_tick` releases it.
    pub fn retire(&mut self, id: ConnectionId, reason: RetireReason) -> Result<(), RetireError> {
        let entry = self.lookup(id).ok_or(RetireError::Unknown(id))?;
        if entry.conn.state() != ConnectionState::Active {
            return Err(RetireError::AlreadyClosing(id));
        }
        self.retire_slot(id.slot(), reason);
        Ok(())
    }

    /// Deliver inbound bytes. Returns `None` if `id` is not active.
    pub fn on_read(&mut self, id: ConnectionId, buf: &[u8]) -> Option<usize> {
        let entry = self.lookup_mut(id)?;
        if entry.conn.state() != ConnectionState::Active {
            return None;
        }
        let consumed = entry.conn.on_read(buf);
        metrics::record_bytes_discarded(consumed);
        Some(consumed)
    }

    /// Deliver a peer close or transport error.
    pub fn on_close(&mut self, id: ConnectionId, reason: RetireReason) -> Result<(), RetireError> {
        let entry = self.lookup_mut(id).ok_or(RetireError::Unknown(id))?;
        if entry.conn.state() != ConnectionState::Active {
            return Err(RetireError::AlreadyClosing(id));
        }
        entry.conn.on_close();
        self.retire_slot(id.slot(), reason);
        Ok(())
    }

    /// Periodic sweep.
    ///
    /// Expired connections are retired first. Then every connection that was
    /// already closing before this tick is released; those retired just now
    /// are released on the next tick.
    pub fn on_tick(&mut self, now: Instant) -> TickSummary {
        let mut summary = TickSummary::default();
        let releasable = self.closing.len();

        while let Some(head) = self.head {
            if self.entries[head].conn.deadline() > now {
                break;
            }
            self.retire_slot(head, RetireReason::Expired);
            summary.expired += 1;
        }

        for id in self.closing.drain(..releasable) {
            if let Some(entry) = self.entries.try_remove(id.slot()) {
                debug_assert_eq!(entry.conn.id(), id);
                self.hooks.on_released(entry.conn);
                summary.released += 1;
            }
        }

        if summary != TickSummary::default() {
            metrics::record_released(summary.released);
            metrics::record_connection_counts(self.active_len, self.closing.len());
            tracing::debug!(
                expired = summary.expired,
                released = summary.released,
                active = self.active_len,
                closing = self.closing.len(),
                "Tick sweep"
            );
        }

        summary
    }

    pub fn get(&self, id: ConnectionId) -> Option<&SinkConnection<S>> {
        self.lookup(id).map(|entry| &entry.conn)
    }

    /// State of `id`; ids no longer in the arena report `Destroyed`.
    pub fn state(&self, id: ConnectionId) -> ConnectionState {
        self.get(id)
            .map_or(ConnectionState::Destroyed, |conn| conn.state())
    }

    /// Active connections, oldest first.
    pub fn active(&self) -> impl Iterator<Item = &SinkConnection<S>> + '_ {
        std::iter::successors(self.head, move |&slot| self.entries[slot].next)
            .map(move |slot| &self.entries[slot].conn)
    }

    pub fn active_len(&self) -> usize {
        self.active_len
    }

    pub fn closing_len(&self) -> usize {
        self.closing.len()
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    fn lookup(&self, id: ConnectionId) -> Option<&Entry<S>> {
        self.entries
            .get(id.slot())
            .filter(|entry| entry.conn.id() == id)
    }

    fn lookup_mut(&mut self, id: ConnectionId) -> Option<&mut Entry<S>> {
        self.entries
            .get_mut(id.slot())
            .filter(|entry| entry.conn.id() == id)
    }

    /// Active → Closing. The slot must hold an active connection.
    fn retire_slot(&mut self, slot: usize, reason: RetireReason) {
        self.unlink(slot);
        self.active_len -= 1;

        let conn = &mut self.entries[slot].conn;
        conn.io_mut().deregister();
        conn.set_state(ConnectionState::Closing);
        self.closing.push(conn.id());

        metrics::record_retired(reason.as_str());
        tracing::debug!(
            connection_id = %conn.id(),
            peer_addr = %conn.peer(),
            reason = reason.as_str(),
            bytes_discarded = conn.bytes_discarded(),
            "Connection retired"
        );
    }

    fn link_tail(&mut self, slot: usize) {
        self.entries[slot].prev = self.tail;
        self.entries[slot].next = None;
        match self.tail {
            Some(tail) => self.entries[tail].next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
    }

    fn unlink(&mut self, slot: usize) {
        let entry = &mut self.entries[slot];
        let (prev, next) = (entry.prev.take(), entry.next.take());
        match prev {
            Some(prev) => self.entries[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.entries[next].prev = prev,
            None => self.tail = prev,
        }
    }
}
