//! Error types for tagtrack-core

use thiserror::Error;

/// Main error type for the tagtrack-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Durable store error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error (missing identity fields, bad values)
    #[error("configuration error: {0}")]
    Config(String),

    /// Delivery channel error
    #[error("channel error: {0}")]
    Channel(String),

    /// No async runtime to schedule timers on
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Result type alias for tagtrack-core
pub type Result<T> = std::result::Result<T, Error>;
