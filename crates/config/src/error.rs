//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path that was read
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Not valid TOML, or a value of the wrong shape
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A field that has no usable default was left empty
    #[error("[{section}] is missing required field '{field}'")]
    MissingField {
        /// Config section, e.g. "input.syslog"
        section: &'static str,
        /// Field name
        field: &'static str,
    },

    /// A field holds a value outside its allowed range
    #[error("[{section}] has invalid {field}: {message}")]
    InvalidValue {
        /// Config section
        section: &'static str,
        /// Field name
        field: &'static str,
        /// What is wrong with it
        message: String,
    },
}

impl ConfigError {
    /// Create a MissingField error
    pub fn missing_field(section: &'static str, field: &'static str) -> Self {
        Self::MissingField { section, field }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        section: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            section,
            field,
            message: message.into(),
        }
    }
}
