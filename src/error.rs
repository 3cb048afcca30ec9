//! Error types for the Xanadu benchmark client
//!
//! Provides a unified error type for all operations. The benchmark harness
//! only ever sees ok/error, but the variants below stay distinct in logs.

use thiserror::Error;

/// Result type alias using XanaduError
pub type Result<T> = std::result::Result<T, XanaduError>;

/// Unified error type for Xanadu client operations
#[derive(Debug, Error)]
pub enum XanaduError {
    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Client not initialized")]
    NotInitialized,

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Key or reference not found")]
    NotFound,

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Codec error: {0}")]
    Codec(String),

    // -------------------------------------------------------------------------
    // Capability Errors
    // -------------------------------------------------------------------------
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl XanaduError {
    /// Short, stable label for the error class (used as a log field)
    pub fn kind(&self) -> &'static str {
        match self {
            XanaduError::NotInitialized => "not_initialized",
            XanaduError::Io(_) | XanaduError::Store(_) => "io",
            XanaduError::NotFound => "not_found",
            XanaduError::Codec(_) => "codec",
            XanaduError::Unsupported(_) => "unsupported",
            XanaduError::Config(_) => "config",
        }
    }
}

impl From<bincode::Error> for XanaduError {
    fn from(e: bincode::Error) -> Self {
        XanaduError::Codec(e.to_string())
    }
}
