//! Error types for reqmerge-core

use thiserror::Error;

/// Result type alias using reqmerge-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in reqmerge-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A conflict resolution that cannot be applied to its merge result
    #[error("Invalid resolution: {0}")]
    InvalidResolution(String),

    /// Invalid sync configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
