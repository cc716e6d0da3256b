//! TCP sink: accepts connections, discards every byte, never answers, and
//! closes each connection a fixed time after it was accepted.

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::schema::SinkConfig;
pub use lifecycle::Shutdown;
pub use net::SinkServer;
