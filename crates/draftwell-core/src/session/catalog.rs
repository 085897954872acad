//! Document listing shared by the controller and its save tasks
//!
//! Saves finish on the debounce timer and in background tasks as well as in
//! the controller itself. Each of them records the confirmed document here,
//! so the listing, the tree and later selections never fall behind a save.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::Document;
use crate::tree::{build_tree, DocumentNode};

#[derive(Debug, Default)]
pub(crate) struct DocumentCatalog {
    documents: Vec<Document>,
    tree: Vec<DocumentNode>,
    /// Newest confirmed version of every document saved in this session
    latest: HashMap<String, Document>,
}

pub(crate) type SharedCatalog = Arc<Mutex<DocumentCatalog>>;

pub(crate) fn lock(catalog: &Mutex<DocumentCatalog>) -> MutexGuard<'_, DocumentCatalog> {
    catalog.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DocumentCatalog {
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn tree(&self) -> &[DocumentNode] {
        &self.tree
    }

    /// Replace the listing with a fresh one from the store
    ///
    /// A save confirmed after the store produced the list still wins.
    pub fn replace(&mut self, documents: Vec<Document>) {
        self.documents = documents
            .into_iter()
            .map(|doc| self.freshest(doc))
            .collect();
        self.rebuild_tree();
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.tree.clear();
    }

    pub fn push(&mut self, document: Document) {
        self.documents.push(document);
        self.rebuild_tree();
    }

    pub fn remove(&mut self, document_id: &str) {
        self.latest.remove(document_id);
        let before = self.documents.len();
        self.documents.retain(|doc| doc.id != document_id);
        if self.documents.len() != before {
            self.rebuild_tree();
        }
    }

    /// Record a confirmed save; older versions are ignored
    pub fn record_saved(&mut self, saved: &Document) {
        if self
            .latest
            .get(&saved.id)
            .is_some_and(|known| known.version > saved.version)
        {
            return;
        }
        self.latest.insert(saved.id.clone(), saved.clone());

        let changed = match self.documents.iter_mut().find(|doc| doc.id == saved.id) {
            Some(slot) if slot.version <= saved.version && slot != saved => {
                *slot = saved.clone();
                true
            }
            _ => false,
        };
        if changed {
            self.rebuild_tree();
        }
    }

    /// `document`, or a newer confirmed version of it
    pub fn freshest(&self, document: Document) -> Document {
        match self.latest.get(&document.id) {
            Some(known) if known.version > document.version => known.clone(),
            _ => document,
        }
    }

    fn rebuild_tree(&mut self) {
        self.tree = build_tree(&self.documents);
    }
}
