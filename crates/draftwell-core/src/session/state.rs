//! Per-document editing session
//!
//! An [`EditSession`] owns the live buffer of one open document. Buffer
//! mutation and title/outline extraction are synchronous; the only
//! suspension point is the store call inside [`EditSession::save`].
//!
//! Saves are single-flight: a save waits for any in-flight save of the same
//! session to settle and then snapshots the buffer as it is at that moment.
//! Every edit bumps a revision counter, and a save only clears the dirty
//! flag when no edit arrived while it was in flight.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::models::{Document, TextStats};
use crate::outline::{extract_outline, OutlineEntry, OutlineOptions};
use crate::session::{SessionError, SessionEvent, SessionResult};
use crate::store::{DocumentStore, StoreResult};
use crate::title::extract_title;

/// Read-only view of the session for rendering
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Last confirmed state of the open document
    pub document: Option<Document>,
    /// Live title (sticky, may be ahead of `document.title`)
    pub title: String,
    /// Live buffer
    pub content: String,
    pub dirty: bool,
    pub saving: bool,
    pub outline: Vec<OutlineEntry>,
    pub stats: TextStats,
}

/// Request for the text surface to bring a line into view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrollRequest {
    pub document_id: String,
    /// 1-indexed physical line
    pub line: usize,
}

struct SessionState {
    document: Document,
    title: String,
    content: String,
    dirty: bool,
    saving: bool,
    revision: u64,
    outline: Vec<OutlineEntry>,
}

/// What a save sends to the store
struct SaveRequest {
    document_id: String,
    title: String,
    content: String,
    revision: u64,
}

pub struct EditSession {
    state: Mutex<SessionState>,
    save_gate: tokio::sync::Mutex<()>,
    outline_options: OutlineOptions,
}

impl EditSession {
    /// Open a session on the stored content of `document`
    pub fn new(document: Document, outline_options: OutlineOptions) -> Self {
        let outline = extract_outline(&document.content, outline_options);
        Self {
            state: Mutex::new(SessionState {
                title: document.title.clone(),
                content: document.content.clone(),
                document,
                dirty: false,
                saving: false,
                revision: 0,
                outline,
            }),
            save_gate: tokio::sync::Mutex::new(()),
            outline_options,
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn document_id(&self) -> String {
        self.state().document.id.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.state().dirty
    }

    pub fn is_saving(&self) -> bool {
        self.state().saving
    }

    /// Number of physical lines in the buffer (an empty buffer has one)
    pub fn line_count(&self) -> usize {
        self.state().content.lines().count().max(1)
    }

    /// Replace the buffer with `content` and mark the session dirty
    ///
    /// The title only changes when the first line carries a non-empty
    /// level-1 heading that differs from the current title. Returns whether
    /// the title changed.
    pub fn apply_edit(&self, content: String) -> bool {
        let mut state = self.state();

        let new_title = extract_title(&content)
            .filter(|title| *title != state.title)
            .map(str::to_string);
        let title_changed = new_title.is_some();
        if let Some(title) = new_title {
            debug!("Title of {} is now {:?}", state.document.id, title);
            state.title = title;
        }

        state.outline = extract_outline(&content, self.outline_options);
        state.content = content;
        state.dirty = true;
        state.revision = state.revision.wrapping_add(1);
        title_changed
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            document: Some(state.document.clone()),
            title: state.title.clone(),
            content: state.content.clone(),
            dirty: state.dirty,
            saving: state.saving,
            outline: state.outline.clone(),
            stats: TextStats::of(&state.content),
        }
    }

    /// Persist the latest buffer if it has unsaved changes
    ///
    /// Returns `Ok(None)` when there was nothing to save, which includes the
    /// case where an in-flight save already covered the current buffer.
    pub async fn save(
        &self,
        store: &dyn DocumentStore,
        events: &UnboundedSender<SessionEvent>,
    ) -> SessionResult<Option<Document>> {
        let _gate = self.save_gate.lock().await;

        let Some(request) = self.begin_save() else {
            return Ok(None);
        };

        let _ = events.send(SessionEvent::SaveStarted {
            document_id: request.document_id.clone(),
        });
        let result = store
            .save(&request.document_id, &request.title, &request.content)
            .await;
        self.finish_save(request, result, events)
    }

    fn begin_save(&self) -> Option<SaveRequest> {
        let mut state = self.state();
        if !state.dirty {
            return None;
        }
        state.saving = true;
        Some(SaveRequest {
            document_id: state.document.id.clone(),
            title: state.title.clone(),
            content: state.content.clone(),
            revision: state.revision,
        })
    }

    fn finish_save(
        &self,
        request: SaveRequest,
        result: StoreResult<Document>,
        events: &UnboundedSender<SessionEvent>,
    ) -> SessionResult<Option<Document>> {
        let mut state = self.state();
        state.saving = false;

        match result {
            Ok(saved) => {
                state.document = saved.clone();
                state.dirty = state.revision != request.revision;
                drop(state);

                info!("Saved document {} (version {})", saved.id, saved.version);
                let _ = events.send(SessionEvent::Saved(saved.clone()));
                Ok(Some(saved))
            }
            Err(e) => {
                drop(state);

                warn!("Failed to save document {}: {}", request.document_id, e);
                let _ = events.send(SessionEvent::SaveFailed {
                    document_id: request.document_id,
                    error: e.to_string(),
                });
                Err(SessionError::persistence("save", e))
            }
        }
    }
}
