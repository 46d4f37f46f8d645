//! Error types for Lanserve

use thiserror::Error;

/// Result type for Lanserve operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Lanserve
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),

    /// Logging error
    #[error("Logging error: {0}")]
    Logging(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
