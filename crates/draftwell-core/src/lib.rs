//! Draftwell Core Library
//!
//! This crate provides the core functionality for draftwell, a
//! writing-project manager: projects hold documents, documents are edited
//! through a session controller that auto-saves, tracks a title and an
//! outline, and hands off cleanly when the user switches documents.
//!
//! # Architecture
//!
//! - **Session controller**: owns the open document's buffer and is the only
//!   path through which documents are saved
//! - **Document store**: async persistence boundary (SQLite locally, or a
//!   command-style backend)
//!
//! Title, outline and tree derivation are pure functions recomputed from
//! scratch; nothing derived is persisted.
//!
//! # Quick Start
//!
//! ```text
//! let store = Arc::new(SqliteStore::open(&config)?);
//! let (mut session, events) = SessionController::new(store, config.session_options());
//!
//! session.open_project(&project_id).await?;
//! session.on_content_change("# Chapter One\n\n## Arrival\n...")?;
//! session.flush().await?;
//! ```
//!
//! # Modules
//!
//! - `session`: Editing session controller (main entry point)
//! - `store`: Document store trait and implementations
//! - `models`: Projects, documents and text statistics
//! - `outline`, `title`: Heading extraction
//! - `tree`: Folder tree over a flat document list
//! - `debounce`: Trailing-edge debouncer used for auto-save
//! - `config`: Application configuration

pub mod config;
pub mod debounce;
pub mod models;
pub mod outline;
pub mod session;
pub mod store;
pub mod title;
pub mod tree;

pub use config::Config;
pub use debounce::Debouncer;
pub use models::{Document, NewDocument, Project, TextStats};
pub use outline::{extract_outline, OutlineEntry, OutlineOptions};
pub use session::{
    ScrollRequest, SessionController, SessionError, SessionEvent, SessionOptions, SessionSnapshot,
};
pub use store::{DocumentStore, SqliteStore, StoreError, StoreResult};
pub use title::extract_title;
pub use tree::{build_tree, DocumentNode};
