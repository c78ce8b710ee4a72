//! DDS-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, DdsError>;

/// Top-level error type for drive_dash.
#[derive(Debug, Error)]
pub enum DdsError {
    #[error("[DDS-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[DDS-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[DDS-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[DDS-1101] unsupported platform: {details}")]
    UnsupportedPlatform { details: String },

    #[error("[DDS-2001] threshold for drive {drive} out of range: {value}")]
    InvalidThreshold { drive: String, value: f64 },

    #[error("[DDS-2002] precondition violated: {details}")]
    Precondition { details: String },

    #[error("[DDS-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[DDS-2102] SQL failure in {context}: {details}")]
    Sql {
        context: &'static str,
        details: String,
    },

    #[error("[DDS-2103] key-value store failure for key {key}: {details}")]
    Store { key: String, details: String },

    #[error("[DDS-3001] transport failure during {op}: {details}")]
    Transport { op: &'static str, details: String },

    #[error("[DDS-3002] remote path not found: {path}")]
    NotFound { path: String },

    #[error("[DDS-3003] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DdsError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "DDS-1001",
            Self::MissingConfig { .. } => "DDS-1002",
            Self::ConfigParse { .. } => "DDS-1003",
            Self::UnsupportedPlatform { .. } => "DDS-1101",
            Self::InvalidThreshold { .. } => "DDS-2001",
            Self::Precondition { .. } => "DDS-2002",
            Self::Serialization { .. } => "DDS-2101",
            Self::Sql { .. } => "DDS-2102",
            Self::Store { .. } => "DDS-2103",
            Self::Transport { .. } => "DDS-3001",
            Self::NotFound { .. } => "DDS-3002",
            Self::Io { .. } => "DDS-3003",
        }
    }

    /// Whether retrying might resolve the failure.
    ///
    /// Transport failures are always retried by the next poll tick; validation
    /// and precondition failures need a different input, not a retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Io { .. } | Self::Sql { .. } | Self::Store { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for transport failures.
    #[must_use]
    pub fn transport(op: &'static str, details: impl Into<String>) -> Self {
        Self::Transport {
            op,
            details: details.into(),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for DdsError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql {
            context: "rusqlite",
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for DdsError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for DdsError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
