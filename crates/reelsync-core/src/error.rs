//! ReelSync Error Definitions
//!
//! Defines error types used throughout the engine.

use thiserror::Error;

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Input Errors
    // =========================================================================
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // =========================================================================
    // Collaborator Errors
    // =========================================================================
    #[error("Required dependency '{binary}' is not installed: {hint}")]
    DependencyMissing { binary: String, hint: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Sync rating failed while {context}: {message}")]
    SyncRating { context: String, message: String },

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Wraps a collaborator failure with the stage it happened in
    pub fn sync_rating(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        CoreError::SyncRating {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Stable machine-readable error kind
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::FileNotFound(_) => "FILE_NOT_FOUND",
            CoreError::InvalidArgument(_) => "INVALID_ARGUMENT",
            CoreError::DependencyMissing { .. } => "DEPENDENCY_MISSING",
            CoreError::ValidationError(_) | CoreError::JsonError(_) => "VALIDATION_ERROR",
            CoreError::SyncRating { .. } | CoreError::IoError(_) => "SYNC_RATING_ERROR",
        }
    }
}
