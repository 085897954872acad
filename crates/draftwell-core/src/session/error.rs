//! Session controller errors

use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by [`SessionController`](super::SessionController) operations
#[derive(Error, Debug)]
pub enum SessionError {
    /// Request rejected before touching the store; session state unchanged
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Operation needs an open document
    #[error("No document is open")]
    NoActiveDocument,

    /// The document store call failed; unsaved edits are kept
    #[error("Failed to {operation} document: {source}")]
    Persistence {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    /// Scroll target outside the current buffer
    #[error("Line {line} is out of range (document has {line_count} lines)")]
    InvalidLine { line: usize, line_count: usize },
}

impl SessionError {
    pub fn persistence(operation: &'static str, source: StoreError) -> Self {
        SessionError::Persistence { operation, source }
    }

    /// Whether the failure left unsaved edits that a retry could persist
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Persistence { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
