//! Library error types
//!
//! Everything that can go wrong while loading bulletin data or reading
//! configuration. Bad cutoff dates are not errors; they degrade to `None`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the visa bulletin library
#[derive(Error, Debug)]
pub enum BulletinError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader failed (bad header, broken quoting, ...)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Config file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Data directory holds no CSV files
    #[error("No CSV files found under {0}")]
    NoData(PathBuf),

    /// A value supplied by the user could not be understood
    #[error("Invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

impl BulletinError {
    pub fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        BulletinError::InvalidValue {
            field,
            value: value.into(),
        }
    }
}

/// Result type for library operations
pub type Result<T> = std::result::Result<T, BulletinError>;
