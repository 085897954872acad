//! Editing session controller
//!
//! Mediates every mutation of the open document: buffer edits, debounced
//! auto-save, manual saves, document and project switches, creation and
//! deletion. Store failures are returned to the caller and published on the
//! event channel; they never clear unsaved edits.
//!
//! Switching away from a dirty document cancels its pending auto-save and
//! starts a save of the outgoing buffer in the background. The switch does
//! not wait for it; [`SessionController::settle`] does. Selecting that
//! document again before the save lands picks up the outgoing session, so
//! one document never has two buffers or two saves in flight.
//!
//! Every save path records the confirmed document in a shared catalog, which
//! keeps [`SessionController::documents`] and [`SessionController::tree`]
//! current no matter which task finished the save.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::debounce::Debouncer;
use crate::models::{Document, NewDocument};
use crate::outline::{OutlineEntry, OutlineOptions};
use crate::session::catalog::{lock, DocumentCatalog, SharedCatalog};
use crate::session::{
    EditSession, ScrollRequest, SessionError, SessionEvent, SessionResult, SessionSnapshot,
};
use crate::store::{DocumentStore, StoreError};
use crate::tree::{normalize_folder_path, DocumentNode};

/// Default quiet window before an edit is persisted
pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(500);

/// Behaviour knobs for a [`SessionController`]
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Quiet window for debounced saves
    pub autosave_delay: Duration,
    /// When false, edits are only persisted by explicit saves and switches
    pub auto_save: bool,
    /// Heading levels included in the live outline
    pub outline: OutlineOptions,
    /// Title for documents created by `create_document`
    pub new_document_title: String,
    /// Initial content for documents created by `create_document`
    pub new_document_template: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            autosave_delay: DEFAULT_AUTOSAVE_DELAY,
            auto_save: true,
            outline: OutlineOptions::editor(),
            new_document_title: "Untitled".to_string(),
            new_document_template: "# Untitled\n\nStart writing...".to_string(),
        }
    }
}

/// Everything a save needs, cloned into timer and background tasks
#[derive(Clone)]
struct Persistence {
    store: Arc<dyn DocumentStore>,
    events: UnboundedSender<SessionEvent>,
    catalog: SharedCatalog,
}

impl Persistence {
    async fn save(&self, session: &EditSession) -> SessionResult<Option<Document>> {
        let saved = session.save(self.store.as_ref(), &self.events).await?;
        if let Some(doc) = &saved {
            lock(&self.catalog).record_saved(doc);
        }
        Ok(saved)
    }
}

/// A session closed while it still had work, and the task finishing it
struct Retiring {
    session: Arc<EditSession>,
    task: JoinHandle<()>,
}

pub struct SessionController {
    persistence: Persistence,
    options: SessionOptions,
    autosave: Debouncer<Arc<EditSession>>,
    active: Option<Arc<EditSession>>,
    project_id: Option<String>,
    scroll: Option<ScrollRequest>,
    retiring: Vec<Retiring>,
}

impl SessionController {
    /// Create a controller and the receiving end of its event channel
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        options: SessionOptions,
    ) -> (Self, UnboundedReceiver<SessionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let persistence = Persistence {
            store,
            events,
            catalog: SharedCatalog::default(),
        };

        let autosave = {
            let persistence = persistence.clone();
            Debouncer::new(options.autosave_delay, move |session: Arc<EditSession>| {
                let persistence = persistence.clone();
                async move {
                    // Failures are already published as SaveFailed
                    let _ = persistence.save(&session).await;
                }
            })
        };

        let controller = Self {
            persistence,
            options,
            autosave,
            active: None,
            project_id: None,
            scroll: None,
            retiring: Vec::new(),
        };
        (controller, receiver)
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Documents of the open project, in store order, with confirmed saves applied
    pub fn documents(&self) -> Vec<Document> {
        self.catalog().documents().to_vec()
    }

    /// Folder tree over [`documents`](Self::documents)
    pub fn tree(&self) -> Vec<DocumentNode> {
        self.catalog().tree().to_vec()
    }

    pub fn active_document_id(&self) -> Option<String> {
        self.active.as_ref().map(|session| session.document_id())
    }

    /// Whether an auto-save is waiting for its quiet window
    pub fn has_pending_save(&self) -> bool {
        self.autosave.is_pending()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.active
            .as_ref()
            .map(|session| session.snapshot())
            .unwrap_or_default()
    }

    // ==================== Selection ====================

    /// Make `document` the open document
    ///
    /// Selecting the document that is already open keeps its buffer. A copy
    /// older than the last confirmed save is replaced by that save, and a
    /// document whose switch save is still running gets its outgoing
    /// session back.
    pub fn select_document(&mut self, document: Document) {
        if self.active_document_id().as_deref() == Some(document.id.as_str()) {
            return;
        }

        self.release_active();

        if let Some(session) = self.take_retiring(&document.id) {
            debug!("Reopening {} while its save is in flight", document.id);
            self.active = Some(session);
            return;
        }

        let document = self.catalog().freshest(document);
        debug!("Opening document {} (version {})", document.id, document.version);
        self.active = Some(Arc::new(EditSession::new(document, self.options.outline)));
    }

    /// Close the open document without opening another one
    ///
    /// Unsaved edits are saved in the background as on a switch.
    pub fn close_document(&mut self) {
        self.release_active();
    }

    /// Switch to another project: flush the open document, load the
    /// project's documents and open the first one
    pub async fn open_project(&mut self, project_id: &str) -> SessionResult<()> {
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Err(SessionError::Validation(
                "Project id must not be empty".to_string(),
            ));
        }

        self.release_active();
        self.project_id = Some(project_id.to_string());
        self.catalog().clear();

        self.reload_documents(project_id).await?;
        let first = self.catalog().documents().first().cloned();
        if let Some(first) = first {
            self.select_document(first);
        }
        Ok(())
    }

    /// Reload the open project's documents and rebuild the tree
    pub async fn refresh_documents(&mut self) -> SessionResult<()> {
        let project_id = self
            .project_id
            .clone()
            .ok_or_else(|| SessionError::Validation("No project is open".to_string()))?;
        self.reload_documents(&project_id).await
    }

    async fn reload_documents(&mut self, project_id: &str) -> SessionResult<()> {
        let documents = self
            .persistence
            .store
            .list_by_project(project_id)
            .await
            .map_err(|e| self.operation_failed("list", e))?;

        debug!("Loaded {} documents for project {}", documents.len(), project_id);
        self.catalog().replace(documents);
        Ok(())
    }

    // ==================== Editing ====================

    /// Replace the open document's buffer
    ///
    /// Applies immediately and, with auto-save on, restarts the quiet window.
    pub fn on_content_change(&mut self, content: impl Into<String>) -> SessionResult<()> {
        let session = self
            .active
            .as_ref()
            .ok_or(SessionError::NoActiveDocument)?;

        session.apply_edit(content.into());
        if self.options.auto_save {
            self.autosave.schedule(Arc::clone(session));
        }
        Ok(())
    }

    /// Save now, skipping the quiet window
    ///
    /// Waits for an in-flight save instead of running next to it. Returns
    /// `Ok(None)` when the buffer was already saved.
    pub async fn manual_save(&mut self) -> SessionResult<Option<Document>> {
        let session = self.active.clone().ok_or(SessionError::NoActiveDocument)?;
        self.autosave.cancel();
        self.persistence.save(&session).await
    }

    /// Run the pending auto-save now, then save whatever is still dirty
    ///
    /// Call before dropping the controller; a dropped controller loses its
    /// pending auto-save.
    pub async fn flush(&mut self) -> SessionResult<Option<Document>> {
        if let Some(pending) = self.autosave.flush() {
            debug!("Flushing pending auto-save");
            pending.await;
        }

        let Some(session) = self.active.clone() else {
            return Ok(None);
        };
        if session.is_dirty() {
            return self.persistence.save(&session).await;
        }
        Ok(session.snapshot().document)
    }

    /// Wait for background saves started by document or project switches
    pub async fn settle(&mut self) {
        for retiring in self.retiring.drain(..) {
            if let Err(e) = retiring.task.await {
                warn!("Background save task failed: {}", e);
            }
        }
    }

    /// Load `content` into the editor
    ///
    /// With a document open the content replaces its buffer like an edit.
    /// Otherwise a new document is created in the open project.
    pub async fn import_content(
        &mut self,
        content: impl Into<String>,
        format: &str,
    ) -> SessionResult<Option<Document>> {
        let content = content.into();
        if self.active.is_some() {
            self.on_content_change(content)?;
            return Ok(None);
        }

        let project_id = self
            .project_id
            .clone()
            .ok_or_else(|| SessionError::Validation("No project is open".to_string()))?;
        let request = NewDocument::new(project_id, format!("Imported document.{}", format), content);
        self.create_from(request).await.map(Some)
    }

    // ==================== Lifecycle ====================

    /// Create a document from the template and open it
    pub async fn create_document(
        &mut self,
        project_id: &str,
        folder_path: Option<&str>,
    ) -> SessionResult<Document> {
        if project_id.trim().is_empty() {
            return Err(SessionError::Validation(
                "A document must belong to a project".to_string(),
            ));
        }

        let request = NewDocument::new(
            project_id.trim(),
            self.options.new_document_title.clone(),
            self.options.new_document_template.clone(),
        )
        .in_folder(normalize_folder_path(folder_path));
        self.create_from(request).await
    }

    async fn create_from(&mut self, request: NewDocument) -> SessionResult<Document> {
        let doc = self
            .persistence
            .store
            .create(request)
            .await
            .map_err(|e| self.operation_failed("create", e))?;

        info!("Created document {}", doc.id);
        if self.project_id.as_deref() == Some(doc.project_id.as_str()) {
            self.catalog().push(doc.clone());
        }
        let _ = self
            .persistence
            .events
            .send(SessionEvent::DocumentCreated(doc.clone()));

        self.select_document(doc.clone());
        Ok(doc)
    }

    /// Delete a document; closes it if it is open
    pub async fn delete_document(&mut self, document_id: &str) -> SessionResult<()> {
        self.persistence
            .store
            .delete(document_id)
            .await
            .map_err(|e| self.operation_failed("delete", e))?;

        info!("Deleted document {}", document_id);
        self.catalog().remove(document_id);

        if self.active_document_id().as_deref() == Some(document_id) {
            self.autosave.cancel();
            self.active = None;
            self.scroll = None;
        }

        let _ = self.persistence.events.send(SessionEvent::DocumentDeleted {
            document_id: document_id.to_string(),
        });
        Ok(())
    }

    // ==================== Navigation ====================

    /// Ask the text surface to show `line` (1-indexed)
    pub fn request_scroll(&mut self, line: usize) -> SessionResult<ScrollRequest> {
        let session = self
            .active
            .as_ref()
            .ok_or(SessionError::NoActiveDocument)?;

        let line_count = session.line_count();
        if line == 0 || line > line_count {
            return Err(SessionError::InvalidLine { line, line_count });
        }

        let request = ScrollRequest {
            document_id: session.document_id(),
            line,
        };
        self.scroll = Some(request.clone());
        Ok(request)
    }

    /// Scroll to the heading behind an outline entry
    pub fn scroll_to_entry(&mut self, entry: &OutlineEntry) -> SessionResult<ScrollRequest> {
        self.request_scroll(entry.line)
    }

    /// Consume the pending scroll request, if any
    pub fn take_scroll_request(&mut self) -> Option<ScrollRequest> {
        self.scroll.take()
    }

    // ==================== Internals ====================

    fn catalog(&self) -> std::sync::MutexGuard<'_, DocumentCatalog> {
        lock(&self.persistence.catalog)
    }

    /// Close the open session, saving its buffer in the background if dirty
    ///
    /// A session with a fired auto-save still in flight is tracked as well,
    /// so reselecting it waits on the same save gate.
    fn release_active(&mut self) {
        self.autosave.cancel();
        self.scroll = None;
        self.retiring.retain(|retiring| !retiring.task.is_finished());

        let Some(previous) = self.active.take() else {
            return;
        };
        if !previous.is_dirty() && !previous.is_saving() {
            return;
        }

        debug!("Saving {} in the background before switching", previous.document_id());
        let persistence = self.persistence.clone();
        let session = Arc::clone(&previous);
        let task = tokio::spawn(async move {
            let _ = persistence.save(&session).await;
        });
        self.retiring.push(Retiring {
            session: previous,
            task,
        });
    }

    /// The outgoing session for `document_id`, if its save has not finished
    ///
    /// The task stays tracked so `settle` still awaits it.
    fn take_retiring(&self, document_id: &str) -> Option<Arc<EditSession>> {
        self.retiring
            .iter()
            .find(|retiring| {
                !retiring.task.is_finished() && retiring.session.document_id() == document_id
            })
            .map(|retiring| Arc::clone(&retiring.session))
    }

    fn operation_failed(&self, operation: &'static str, error: StoreError) -> SessionError {
        warn!("Failed to {} document: {}", operation, error);
        let _ = self.persistence.events.send(SessionEvent::OperationFailed {
            operation,
            error: error.to_string(),
        });
        SessionError::persistence(operation, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    const PROJECT: &str = "project-1";

    /// In-memory store that records saves and can hold them in flight
    #[derive(Default)]
    struct FakeStore {
        docs: Mutex<Vec<Document>>,
        saves: Mutex<Vec<(String, String)>>,
        gate: Option<Semaphore>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail: AtomicBool,
    }

    impl FakeStore {
        fn with_docs(docs: Vec<Document>) -> Self {
            Self {
                docs: Mutex::new(docs),
                ..Self::default()
            }
        }

        fn gated(docs: Vec<Document>) -> Self {
            Self {
                gate: Some(Semaphore::new(0)),
                ..Self::with_docs(docs)
            }
        }

        fn release(&self, saves: usize) {
            if let Some(gate) = &self.gate {
                gate.add_permits(saves);
            }
        }

        fn saved_contents(&self) -> Vec<String> {
            self.saves
                .lock()
                .unwrap()
                .iter()
                .map(|(_, content)| content.clone())
                .collect()
        }

        fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl DocumentStore for FakeStore {
        async fn list_by_project(&self, project_id: &str) -> StoreResult<Vec<Document>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Transport("offline".to_string()));
            }
            Ok(self
                .docs
                .lock()
                .unwrap()
                .iter()
                .filter(|doc| doc.project_id == project_id)
                .cloned()
                .collect())
        }

        async fn create(&self, request: NewDocument) -> StoreResult<Document> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Transport("offline".to_string()));
            }
            let doc = Document::new(request);
            self.docs.lock().unwrap().push(doc.clone());
            Ok(doc)
        }

        async fn save(
            &self,
            document_id: &str,
            title: &str,
            content: &str,
        ) -> StoreResult<Document> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.saves
                .lock()
                .unwrap()
                .push((document_id.to_string(), content.to_string()));

            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Transport("offline".to_string()));
            }

            let mut docs = self.docs.lock().unwrap();
            let doc = docs
                .iter_mut()
                .find(|doc| doc.id == document_id)
                .ok_or_else(|| StoreError::not_found("Document", document_id))?;
            doc.apply_save(title, content);
            Ok(doc.clone())
        }

        async fn delete(&self, document_id: &str) -> StoreResult<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Transport("offline".to_string()));
            }
            let mut docs = self.docs.lock().unwrap();
            let before = docs.len();
            docs.retain(|doc| doc.id != document_id);
            if docs.len() == before {
                return Err(StoreError::not_found("Document", document_id));
            }
            Ok(())
        }
    }

    fn doc(title: &str, folder: Option<&str>) -> Document {
        let mut doc = Document::new(NewDocument::new(
            PROJECT,
            title,
            format!("# {}\n\nBody", title),
        ));
        doc.folder_path = folder.map(str::to_string);
        doc
    }

    fn controller(store: &Arc<FakeStore>) -> (SessionController, UnboundedReceiver<SessionEvent>) {
        let store: Arc<dyn DocumentStore> = Arc::clone(store) as Arc<dyn DocumentStore>;
        SessionController::new(store, SessionOptions::default())
    }

    fn drain(events: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_sticky_title() {
        let a = doc("Hello", None);
        let store = Arc::new(FakeStore::with_docs(vec![a.clone()]));
        let (mut controller, _events) = controller(&store);
        controller.select_document(a);

        controller.on_content_change("no heading anymore").unwrap();
        assert_eq!(controller.snapshot().title, "Hello");

        controller.on_content_change("# Renamed\n\ntext").unwrap();
        assert_eq!(controller.snapshot().title, "Renamed");

        controller.on_content_change("").unwrap();
        assert_eq!(controller.snapshot().title, "Renamed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_coalesce_into_one_save() {
        let a = doc("A", None);
        let store = Arc::new(FakeStore::with_docs(vec![a.clone()]));
        let (mut controller, _events) = controller(&store);
        controller.select_document(a);

        for i in 1..=5 {
            controller
                .on_content_change(format!("# A\n\nedit {}", i))
                .unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(store.saved_contents().is_empty());
        assert!(controller.has_pending_save());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(store.saved_contents(), vec!["# A\n\nedit 5"]);

        let snapshot = controller.snapshot();
        assert!(!snapshot.dirty);
        assert_eq!(snapshot.document.unwrap().version, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_save_waits_for_in_flight_save() {
        let a = doc("A", None);
        let store = Arc::new(FakeStore::gated(vec![a.clone()]));
        let (mut controller, _events) = controller(&store);
        controller.select_document(a);

        controller.on_content_change("one").unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(store.saved_contents(), vec!["one"]);
        assert!(controller.snapshot().saving);

        controller.on_content_change("two").unwrap();
        let releaser = Arc::clone(&store);
        let (saved, _) = tokio::join!(controller.manual_save(), async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            releaser.release(2);
        });

        let saved = saved.unwrap().expect("second save");
        assert_eq!(saved.content, "two");
        assert_eq!(store.saved_contents(), vec!["one", "two"]);
        assert_eq!(store.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(!controller.snapshot().dirty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_save_coalesces_with_covering_save() {
        let a = doc("A", None);
        let store = Arc::new(FakeStore::gated(vec![a.clone()]));
        let (mut controller, _events) = controller(&store);
        controller.select_document(a);

        controller.on_content_change("only").unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;

        let releaser = Arc::clone(&store);
        let (saved, _) = tokio::join!(controller.manual_save(), async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            releaser.release(1);
        });

        // The in-flight save already carried the latest buffer
        assert!(saved.unwrap().is_none());
        assert_eq!(store.saved_contents(), vec!["only"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_during_save_stays_dirty() {
        let a = doc("A", None);
        let store = Arc::new(FakeStore::gated(vec![a.clone()]));
        let (mut controller, _events) = controller(&store);
        controller.select_document(a);

        controller.on_content_change("one").unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        controller.on_content_change("two").unwrap();

        store.release(1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let snapshot = controller.snapshot();
        assert!(snapshot.dirty);
        assert!(!snapshot.saving);
        assert_eq!(snapshot.content, "two");

        store.release(1);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.saved_contents(), vec!["one", "two"]);
        assert!(!controller.snapshot().dirty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_flushes_outgoing_document() {
        let a = doc("A", None);
        let b = doc("B", None);
        let store = Arc::new(FakeStore::with_docs(vec![a.clone(), b.clone()]));
        let (mut controller, _events) = controller(&store);

        controller.select_document(a.clone());
        controller.on_content_change("# A\n\nunsaved").unwrap();
        controller.select_document(b.clone());

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.content, b.content);
        assert!(!snapshot.dirty);
        assert!(!controller.has_pending_save());

        controller.settle().await;
        assert_eq!(store.saved_contents(), vec!["# A\n\nunsaved"]);

        // The cancelled timer must not save again
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.saved_contents().len(), 1);
        let saves = store.saves.lock().unwrap().clone();
        assert_eq!(saves[0].0, a.id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_without_edits_saves_nothing() {
        let a = doc("A", None);
        let b = doc("B", None);
        let store = Arc::new(FakeStore::with_docs(vec![a.clone(), b.clone()]));
        let (mut controller, _events) = controller(&store);

        controller.select_document(a);
        controller.select_document(b);
        controller.settle().await;
        assert!(store.saved_contents().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_document_saves_in_background() {
        let a = doc("A", None);
        let store = Arc::new(FakeStore::with_docs(vec![a.clone()]));
        let (mut controller, _events) = controller(&store);

        controller.select_document(a);
        controller.on_content_change("closing").unwrap();
        controller.close_document();
        assert!(controller.active_document_id().is_none());

        controller.settle().await;
        assert_eq!(store.saved_contents(), vec!["closing"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reselecting_open_document_keeps_buffer() {
        let a = doc("A", None);
        let store = Arc::new(FakeStore::with_docs(vec![a.clone()]));
        let (mut controller, _events) = controller(&store);

        controller.select_document(a.clone());
        controller.on_content_change("draft").unwrap();
        controller.select_document(a);

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.content, "draft");
        assert!(snapshot.dirty);
        assert!(controller.has_pending_save());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_keeps_dirty_until_retry() {
        let a = doc("A", None);
        let store = Arc::new(FakeStore::with_docs(vec![a.clone()]));
        let (mut controller, mut events) = controller(&store);
        controller.select_document(a);

        store.set_failing(true);
        controller.on_content_change("precious").unwrap();
        let err = controller.manual_save().await.unwrap_err();
        assert!(matches!(err, SessionError::Persistence { operation: "save", .. }));
        assert!(controller.snapshot().dirty);

        let failures: Vec<_> = drain(&mut events)
            .into_iter()
            .filter(SessionEvent::is_failure)
            .collect();
        assert_eq!(failures.len(), 1);

        // No automatic retry
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.saved_contents().len(), 1);

        store.set_failing(false);
        let saved = controller.manual_save().await.unwrap().expect("retried save");
        assert_eq!(saved.content, "precious");
        assert!(!controller.snapshot().dirty);
        assert!(matches!(drain(&mut events).last(), Some(SessionEvent::Saved(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_save_disabled() {
        let a = doc("A", None);
        let store = Arc::new(FakeStore::with_docs(vec![a.clone()]));
        let options = SessionOptions {
            auto_save: false,
            ..SessionOptions::default()
        };
        let (mut controller, _events) =
            SessionController::new(Arc::clone(&store) as Arc<dyn DocumentStore>, options);
        controller.select_document(a);

        controller.on_content_change("kept in memory").unwrap();
        assert!(!controller.has_pending_save());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(store.saved_contents().is_empty());

        let saved = controller.flush().await.unwrap().unwrap();
        assert_eq!(saved.content, "kept in memory");
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_runs_pending_save_once() {
        let a = doc("A", None);
        let store = Arc::new(FakeStore::with_docs(vec![a.clone()]));
        let (mut controller, _events) = controller(&store);
        controller.open_project(PROJECT).await.unwrap();

        controller.on_content_change("# Flushed\n\nnow").unwrap();
        let saved = controller.flush().await.unwrap().unwrap();
        assert_eq!(saved.title, "Flushed");
        assert_eq!(store.saved_contents().len(), 1);
        assert_eq!(controller.documents()[0].title, "Flushed");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.saved_contents().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_project_builds_tree_and_selects_first() {
        let docs = vec![
            doc("A", None),
            doc("B", Some("Drafts")),
            doc("C", Some("Drafts/2024")),
        ];
        let store = Arc::new(FakeStore::with_docs(docs.clone()));
        let (mut controller, _events) = controller(&store);

        controller.open_project(PROJECT).await.unwrap();
        assert_eq!(controller.project_id(), Some(PROJECT));
        assert_eq!(controller.documents().len(), 3);
        assert_eq!(controller.tree().len(), 2);
        assert_eq!(controller.active_document_id(), Some(docs[0].id.clone()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_project_flushes_previous_session() {
        let a = doc("A", None);
        let store = Arc::new(FakeStore::with_docs(vec![a.clone()]));
        let (mut controller, _events) = controller(&store);
        controller.select_document(a);
        controller.on_content_change("# A\n\nbefore switch").unwrap();

        controller.open_project("empty-project").await.unwrap();
        assert!(controller.active_document_id().is_none());
        assert!(controller.tree().is_empty());

        controller.settle().await;
        assert_eq!(store.saved_contents(), vec!["# A\n\nbefore switch"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_project_failure_is_reported() {
        let store = Arc::new(FakeStore::default());
        store.set_failing(true);
        let (mut controller, mut events) = controller(&store);

        let err = controller.open_project(PROJECT).await.unwrap_err();
        assert!(matches!(err, SessionError::Persistence { operation: "list", .. }));
        assert!(matches!(
            drain(&mut events).as_slice(),
            [SessionEvent::OperationFailed { operation: "list", .. }]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_document_opens_template() {
        let store = Arc::new(FakeStore::default());
        let (mut controller, mut events) = controller(&store);
        controller.open_project(PROJECT).await.unwrap();

        let created = controller
            .create_document(PROJECT, Some("/Drafts//"))
            .await
            .unwrap();
        assert_eq!(created.title, "Untitled");
        assert_eq!(created.folder_path.as_deref(), Some("Drafts"));

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.content, "# Untitled\n\nStart writing...");
        assert!(!snapshot.dirty);
        assert_eq!(controller.documents().len(), 1);
        assert!(controller.tree()[0].is_folder());
        assert!(matches!(
            drain(&mut events).as_slice(),
            [SessionEvent::DocumentCreated(_)]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_document_requires_project() {
        let a = doc("A", None);
        let store = Arc::new(FakeStore::with_docs(vec![a.clone()]));
        let (mut controller, mut events) = controller(&store);
        controller.select_document(a.clone());
        controller.on_content_change("dirty").unwrap();

        let err = controller.create_document("  ", None).await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));

        // Nothing changed
        assert_eq!(controller.active_document_id(), Some(a.id));
        assert!(controller.snapshot().dirty);
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_active_document_clears_session() {
        let a = doc("A", None);
        let b = doc("B", None);
        let store = Arc::new(FakeStore::with_docs(vec![a.clone(), b.clone()]));
        let (mut controller, _events) = controller(&store);
        controller.open_project(PROJECT).await.unwrap();
        controller.on_content_change("doomed").unwrap();

        controller.delete_document(&a.id).await.unwrap();
        assert!(controller.active_document_id().is_none());
        assert_eq!(controller.snapshot(), SessionSnapshot::default());
        assert_eq!(controller.documents().len(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(store.saved_contents().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_other_document_keeps_session() {
        let a = doc("A", None);
        let b = doc("B", None);
        let store = Arc::new(FakeStore::with_docs(vec![a.clone(), b.clone()]));
        let (mut controller, _events) = controller(&store);
        controller.open_project(PROJECT).await.unwrap();

        controller.delete_document(&b.id).await.unwrap();
        assert_eq!(controller.active_document_id(), Some(a.id));

        let err = controller.delete_document(&b.id).await.unwrap_err();
        assert!(matches!(err, SessionError::Persistence { operation: "delete", .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_import_replaces_open_buffer() {
        let a = doc("A", None);
        let store = Arc::new(FakeStore::with_docs(vec![a.clone()]));
        let (mut controller, _events) = controller(&store);
        controller.open_project(PROJECT).await.unwrap();

        let created = controller
            .import_content("# Imported\n\ntext", "md")
            .await
            .unwrap();
        assert!(created.is_none());
        let snapshot = controller.snapshot();
        assert!(snapshot.dirty);
        assert_eq!(snapshot.title, "Imported");
    }

    #[tokio::test(start_paused = true)]
    async fn test_import_without_open_document_creates_one() {
        let store = Arc::new(FakeStore::default());
        let (mut controller, _events) = controller(&store);

        let err = controller.import_content("text", "txt").await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));

        controller.open_project(PROJECT).await.unwrap();
        let created = controller
            .import_content("plain text", "txt")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.title, "Imported document.txt");
        assert_eq!(controller.active_document_id(), Some(created.id));
        assert_eq!(controller.snapshot().content, "plain text");
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_requires_open_document() {
        let store = Arc::new(FakeStore::default());
        let (mut controller, _events) = controller(&store);

        assert!(matches!(
            controller.on_content_change("x"),
            Err(SessionError::NoActiveDocument)
        ));
        assert!(matches!(
            controller.manual_save().await,
            Err(SessionError::NoActiveDocument)
        ));
        assert!(controller.flush().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_requests() {
        let a = doc("A", None);
        let store = Arc::new(FakeStore::with_docs(vec![a.clone()]));
        let (mut controller, _events) = controller(&store);
        controller.select_document(a.clone());
        controller
            .on_content_change("# A\n\n## Section A\n\ntext\n\n## Section B")
            .unwrap();

        let outline = controller.snapshot().outline;
        let request = controller.scroll_to_entry(&outline[1]).unwrap();
        assert_eq!(request.line, 7);
        assert_eq!(request.document_id, a.id);

        assert_eq!(controller.take_scroll_request(), Some(request));
        assert!(controller.take_scroll_request().is_none());

        assert!(matches!(
            controller.request_scroll(8),
            Err(SessionError::InvalidLine {
                line: 8,
                line_count: 7
            })
        ));
        assert!(controller.request_scroll(0).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_requires_project() {
        let store = Arc::new(FakeStore::default());
        let (mut controller, _events) = controller(&store);
        assert!(matches!(
            controller.refresh_documents().await,
            Err(SessionError::Validation(_))
        ));
    }

    fn stored_content(store: &FakeStore, id: &str) -> String {
        store
            .docs
            .lock()
            .unwrap()
            .iter()
            .find(|doc| doc.id == id)
            .map(|doc| doc.content.clone())
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_reopen_after_switch_save_sees_saved_text() {
        let a = doc("A", None);
        let b = doc("B", None);
        let store = Arc::new(FakeStore::with_docs(vec![a.clone(), b.clone()]));
        let (mut controller, _events) = controller(&store);
        controller.open_project(PROJECT).await.unwrap();

        controller.on_content_change("# A2\n\nedited").unwrap();
        let listed_b = controller.documents()[1].clone();
        controller.select_document(listed_b);
        controller.settle().await;

        let listed = controller.documents()[0].clone();
        assert_eq!(listed.content, "# A2\n\nedited");
        assert_eq!(listed.version, 2);
        assert_eq!(controller.tree()[0].name(), "A2");

        controller.select_document(listed);
        assert_eq!(controller.snapshot().content, "# A2\n\nedited");

        controller.on_content_change("# A2\n\nedited more").unwrap();
        controller.manual_save().await.unwrap();
        assert_eq!(stored_content(&store, &a.id), "# A2\n\nedited more");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_copy_is_replaced_by_confirmed_save() {
        let a = doc("A", None);
        let b = doc("B", None);
        let store = Arc::new(FakeStore::with_docs(vec![a.clone(), b.clone()]));
        let (mut controller, _events) = controller(&store);

        controller.select_document(a.clone());
        controller.on_content_change("# A\n\nnewer").unwrap();
        controller.select_document(b);
        controller.settle().await;

        // The caller still holds the version it loaded before the edit
        controller.select_document(a);
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.content, "# A\n\nnewer");
        assert_eq!(snapshot.document.unwrap().version, 2);
        assert!(!snapshot.dirty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reselect_during_switch_save_keeps_single_flight() {
        let a = doc("A", None);
        let b = doc("B", None);
        let store = Arc::new(FakeStore::gated(vec![a.clone(), b.clone()]));
        let (mut controller, _events) = controller(&store);

        controller.select_document(a.clone());
        controller.on_content_change("# A\n\nfirst").unwrap();
        controller.select_document(b);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.saved_contents(), vec!["# A\n\nfirst"]);

        controller.select_document(a.clone());
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.content, "# A\n\nfirst");
        assert!(snapshot.saving);

        controller.on_content_change("# A\n\nsecond").unwrap();
        let releaser = Arc::clone(&store);
        let (saved, _) = tokio::join!(controller.manual_save(), async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            releaser.release(2);
        });
        controller.settle().await;

        assert_eq!(saved.unwrap().unwrap().content, "# A\n\nsecond");
        assert_eq!(store.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(store.saved_contents(), vec!["# A\n\nfirst", "# A\n\nsecond"]);
        assert_eq!(stored_content(&store, &a.id), "# A\n\nsecond");
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_save_updates_listing_and_tree() {
        let a = doc("A", Some("Drafts"));
        let store = Arc::new(FakeStore::with_docs(vec![a.clone()]));
        let (mut controller, _events) = controller(&store);
        controller.open_project(PROJECT).await.unwrap();

        controller.on_content_change("# Renamed\n\nx").unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(!controller.snapshot().dirty);
        assert_eq!(controller.documents()[0].title, "Renamed");
        let tree = controller.tree();
        assert_eq!(tree[0].children()[0].name(), "Renamed");
    }
}
