//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind)
//!     → dispatch.rs (accept / readable / tick events, one task)
//!     → manager.rs (arena, active list, closing set)
//!     → socket.rs (per-connection readiness)
//!     → connection.rs (discard bytes, fixed deadline)
//!     → hooks.rs (accepted / released notifications)
//!
//! Connection States:
//!     Active → Closing → Destroyed
//! ```
//!
//! # Design Decisions
//! - Deadline fixed at accept; the active list is therefore deadline-ordered
//! - Retirement only moves a connection; release happens on a later tick

pub mod connection;
pub mod dispatch;
pub mod hooks;
pub mod listener;
pub mod manager;
pub mod socket;

pub use connection::{ConnectionHandler, ConnectionId, ConnectionState, SinkConnection, SinkIo};
pub use dispatch::SinkServer;
pub use hooks::{ConnectionHooks, TracingHooks};
pub use manager::{AcceptError, ConnectionManager, RetireError, RetireReason, TickSummary};
pub use socket::SinkSocket;
