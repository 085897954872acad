//! Store error handling
//!
//! Provides typed errors for document store operations with descriptive
//! messages and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during document store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Request rejected before reaching storage (bad project reference, empty title, ...)
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Referenced record does not exist
    #[error("{kind} not found: '{id}'")]
    NotFound { kind: &'static str, id: String },

    /// Remote backend could not be reached or rejected the call
    #[error("Transport error: {0}")]
    Transport(String),

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create the data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Background task running a blocking store call died
    #[error("Store task failed: {0}")]
    Task(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether retrying the same call later could succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::Transport(_) | StoreError::Database(_) | StoreError::Task(_)
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::Transport(_) => {
                Some("Check that the backend is reachable, then save again.")
            }
            StoreError::Database(_) => {
                Some("The local database may be locked or full. Close other draftwell processes and retry.")
            }
            StoreError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StoreError::NotFound { .. } => {
                Some("The record may have been deleted elsewhere. Refresh the document list.")
            }
            _ => None,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
