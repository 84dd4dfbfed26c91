//! Error types for Chat Front.

use thiserror::Error;

/// Chat Front error types
#[derive(Error, Debug)]
pub enum ChatFrontError {
    /// Malformed chat request (rejected before any streaming starts)
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The deployment cannot honor the request, e.g. a pause was requested
    /// but the execution context has no snapshot capability
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Resume requested for a correlation key with no stored snapshot
    #[error("Snapshot not found: {key}")]
    SnapshotNotFound { key: String },

    /// Upstream workflow event source failed mid-stream
    #[error("Stream error: {0}")]
    Stream(String),

    /// Path or path component outside the allowed roots
    #[error("Path rejected: {0}")]
    PathRejected(String),

    /// Requested file does not exist (yet)
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChatFrontError {
    /// Stable error code used in terminal error frames and HTTP error bodies
    pub fn error_code(&self) -> &'static str {
        match self {
            ChatFrontError::Validation(_) => "VALIDATION_ERROR",
            ChatFrontError::Configuration(_) => "CONFIGURATION_ERROR",
            ChatFrontError::SnapshotNotFound { .. } => "SNAPSHOT_NOT_FOUND",
            ChatFrontError::Stream(_) => "STREAM_ERROR",
            ChatFrontError::PathRejected(_) => "PATH_REJECTED",
            ChatFrontError::FileNotFound(_) => "FILE_NOT_FOUND",
            ChatFrontError::Internal(_) => "INTERNAL_ERROR",
            ChatFrontError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

/// Result type alias for Chat Front operations
pub type Result<T> = std::result::Result<T, ChatFrontError>;
