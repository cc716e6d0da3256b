//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::address::AddressError;
use crate::config::schema::SinkConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<Vec<ValidationError>> for ConfigError {
    fn from(errors: Vec<ValidationError>) -> Self {
        // A lone address problem reads better as the address error itself.
        if let [ValidationError::Address(e)] = errors.as_slice() {
            return ConfigError::Address(e.clone());
        }
        ConfigError::Validation(errors)
    }
}

/// Load a configuration from a TOML file.
///
/// The result is not validated: the CLI may still supply the listen address.
pub fn load_config(path: &Path) -> Result<SinkConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse TOML text into a configuration.
pub fn parse_config(content: &str) -> Result<SinkConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Parse and validate TOML text in one step.
pub fn parse_validated(content: &str) -> Result<SinkConfig, ConfigError> {
    let config = parse_config(content)?;
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.lifecycle.connection_lifetime_ms, 300_000);
        assert_eq!(config.lifecycle.tick_interval_ms, 100);
        assert_eq!(config.listener.read_buffer_size, 4096);
        assert!(config.listener.address.is_none());
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = parse_validated(
            r#"
            [listener]
            address = "127.0.0.1:7000"

            [lifecycle]
            connection_lifetime_ms = 2500
            "#,
        )
        .unwrap();
        assert_eq!(config.listener.address.as_deref(), Some("127.0.0.1:7000"));
        assert_eq!(config.listener.max_connections, 10_000);
        assert_eq!(config.lifecycle.connection_lifetime_ms, 2500);
        assert_eq!(config.lifecycle.tick_interval_ms, 100);
    }

    #[test]
    fn syntax_error_is_parse_error() {
        assert!(matches!(parse_config("[listener"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn bad_address_surfaces_as_address_error() {
        let err = parse_validated("[listener]\naddress = \"1.2.3.4\"").unwrap_err();
        assert!(matches!(err, ConfigError::Address(AddressError::MissingSeparator(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
