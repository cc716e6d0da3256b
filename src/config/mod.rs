//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → loader.rs (optional TOML file)
//!     → CLI overrides (main.rs)
//!     → validation.rs (semantic checks, address.rs parses [ip:]port)
//!     → SinkConfig + BindAddress (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once validated
//! - All fields have defaults; only the listen address is mandatory
//! - Validation separates syntactic (serde) from semantic checks

pub mod address;
pub mod loader;
pub mod schema;
pub mod validation;

pub use address::{AddressError, BindAddress};
pub use loader::ConfigError;
pub use schema::{LifecycleConfig, ListenerConfig, ObservabilityConfig, SinkConfig};
