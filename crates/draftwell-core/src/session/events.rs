//! Notifications emitted by the session controller
//!
//! Store failures never escape as panics or silent drops; background saves
//! in particular have no caller to return an error to, so every outcome is
//! also published here.

use crate::models::Document;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A save call was issued to the store
    SaveStarted { document_id: String },
    /// The store confirmed a save; carries the authoritative document
    Saved(Document),
    /// A save failed; the session stays dirty
    SaveFailed { document_id: String, error: String },
    DocumentCreated(Document),
    DocumentDeleted { document_id: String },
    /// A non-save store call (list, create, delete) failed
    OperationFailed {
        operation: &'static str,
        error: String,
    },
}

impl SessionEvent {
    /// Document the event refers to, if any
    pub fn document_id(&self) -> Option<&str> {
        match self {
            SessionEvent::SaveStarted { document_id }
            | SessionEvent::SaveFailed { document_id, .. }
            | SessionEvent::DocumentDeleted { document_id } => Some(document_id),
            SessionEvent::Saved(doc) | SessionEvent::DocumentCreated(doc) => Some(&doc.id),
            SessionEvent::OperationFailed { .. } => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SessionEvent::SaveFailed { .. } | SessionEvent::OperationFailed { .. }
        )
    }
}
