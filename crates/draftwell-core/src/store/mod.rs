//! Document store
//!
//! The editing session talks to persistence only through [`DocumentStore`]:
//! list, create, save (full-content overwrite) and delete. Everything is
//! async because a store may sit behind a process or network boundary.
//!
//! ## Implementations
//!
//! - [`SqliteStore`]: local SQLite database
//! - [`CommandStore`]: client for a command-style backend, with the
//!   key-casing compatibility layer in [`compat`]

pub mod command;
pub mod compat;
pub mod error;
pub mod schema;
pub mod sqlite;

use async_trait::async_trait;

use crate::models::{Document, NewDocument};

pub use command::{CommandStore, CommandTransport};
pub use error::{StoreError, StoreResult};
pub use sqlite::SqliteStore;

/// Persistence boundary used by the session controller
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents of a project
    async fn list_by_project(&self, project_id: &str) -> StoreResult<Vec<Document>>;

    /// Create a document and return the stored record
    async fn create(&self, request: NewDocument) -> StoreResult<Document>;

    /// Overwrite title and content; returns the authoritative document
    /// (recomputed counts, new version and timestamp)
    async fn save(&self, document_id: &str, title: &str, content: &str) -> StoreResult<Document>;

    /// Delete a document
    async fn delete(&self, document_id: &str) -> StoreResult<()>;
}
