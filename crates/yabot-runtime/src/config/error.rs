//! Configuration errors.
//!
//! Loading fails with [`ConfigError::FileNotFound`], [`ConfigError::UnsupportedFormat`]
//! or [`ConfigError::Extract`]; [`validate_config`](super::validate_config)
//! reports the remaining variants.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The file extension has no enabled format feature.
    #[error("unsupported configuration format '.{extension}' (enable the matching *-config feature)")]
    UnsupportedFormat { extension: String },

    /// The merged sources do not deserialize into `BotConfig`.
    #[error("failed to extract configuration: {0}")]
    Extract(Box<figment::Error>),

    /// A value is out of range.
    #[error("invalid configuration: {message}")]
    Invalid { message: String },

    /// A required value is empty.
    #[error("missing required configuration field: {field}")]
    MissingField { field: String },

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Extract(Box::new(err))
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
