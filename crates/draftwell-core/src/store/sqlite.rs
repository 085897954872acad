//! Local SQLite document store
//!
//! Stores projects and documents in a single SQLite file under the data
//! directory. rusqlite is blocking, so every call hops onto
//! `spawn_blocking` and the connection sits behind a mutex.
//!
//! ## Tables
//!
//! - `projects` - Project records
//! - `documents` - Document records (children of projects)

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::config::Config;
use crate::models::{Document, NewDocument, Project};
use crate::store::schema::{init_schema, needs_init};
use crate::store::{DocumentStore, StoreError, StoreResult};

const DOCUMENT_COLUMNS: &str = "id, title, content, project_id, folder_path, word_count, \
     char_count, version, created_at, updated_at";

/// Document store backed by a local SQLite database
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at `config.sqlite_path()`
    pub fn open(config: &Config) -> StoreResult<Self> {
        let path = config.sqlite_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(&path)?;
        debug!("Opened document database at {:?}", path);
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        if needs_init(&conn) {
            init_schema(&conn)?;
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection on the blocking pool
    async fn run<F, R>(&self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut Connection) -> StoreResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    // ==================== Project Operations ====================

    /// Create a new project
    pub async fn create_project(&self, name: &str) -> StoreResult<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation(
                "Project name must not be empty".to_string(),
            ));
        }

        let project = Project::new(name);
        let stored = project.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO projects (id, name, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    stored.id,
                    stored.name,
                    stored.description,
                    stored.created_at.timestamp_millis(),
                    stored.updated_at.timestamp_millis(),
                ],
            )?;
            Ok(())
        })
        .await?;

        info!("Created project {} ({})", project.name, project.id);
        Ok(project)
    }

    /// Get all projects, oldest first
    pub async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, created_at, updated_at
                 FROM projects ORDER BY created_at, rowid",
            )?;
            let projects = stmt
                .query_map([], project_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(projects)
        })
        .await
    }

    /// Get a project by ID
    pub async fn get_project(&self, id: &str) -> StoreResult<Option<Project>> {
        let id = id.to_string();
        self.run(move |conn| Ok(select_project(conn, &id)?)).await
    }

    // ==================== Document Lookups ====================

    /// Get a document by ID
    pub async fn get_document(&self, id: &str) -> StoreResult<Option<Document>> {
        let id = id.to_string();
        self.run(move |conn| Ok(select_document(conn, &id)?)).await
    }

    /// Find documents whose ID starts with `prefix` (any project)
    pub async fn find_documents_by_prefix(&self, prefix: &str) -> StoreResult<Vec<Document>> {
        let pattern = format!("{}%", prefix.replace(['%', '_'], ""));
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM documents WHERE id LIKE ?1 ORDER BY id",
                DOCUMENT_COLUMNS
            ))?;
            let docs = stmt
                .query_map(params![pattern], document_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(docs)
        })
        .await
    }

    /// Count documents in a project
    pub async fn document_count(&self, project_id: &str) -> StoreResult<i64> {
        let project_id = project_id.to_string();
        self.run(move |conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE project_id = ?1",
                params![project_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn list_by_project(&self, project_id: &str) -> StoreResult<Vec<Document>> {
        let project_id = project_id.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM documents WHERE project_id = ?1
                 ORDER BY updated_at DESC, rowid DESC",
                DOCUMENT_COLUMNS
            ))?;
            let docs = stmt
                .query_map(params![project_id], document_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(docs)
        })
        .await
    }

    async fn create(&self, request: NewDocument) -> StoreResult<Document> {
        if request.title.trim().is_empty() {
            return Err(StoreError::Validation(
                "Document title must not be empty".to_string(),
            ));
        }

        let doc = self
            .run(move |conn| {
                if select_project(conn, &request.project_id)?.is_none() {
                    return Err(StoreError::Validation(format!(
                        "Project not found: {}",
                        request.project_id
                    )));
                }

                let doc = Document::new(request);
                conn.execute(
                    &format!(
                        "INSERT INTO documents ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                        DOCUMENT_COLUMNS
                    ),
                    params![
                        doc.id,
                        doc.title,
                        doc.content,
                        doc.project_id,
                        doc.folder_path,
                        doc.word_count,
                        doc.char_count,
                        doc.version,
                        doc.created_at.timestamp_millis(),
                        doc.updated_at.timestamp_millis(),
                    ],
                )?;
                Ok(doc)
            })
            .await?;

        info!("Created document {} in project {}", doc.id, doc.project_id);
        Ok(doc)
    }

    async fn save(&self, document_id: &str, title: &str, content: &str) -> StoreResult<Document> {
        let (document_id, title, content) =
            (document_id.to_string(), title.to_string(), content.to_string());

        self.run(move |conn| {
            let mut doc = select_document(conn, &document_id)?
                .ok_or_else(|| StoreError::not_found("Document", document_id.clone()))?;

            doc.apply_save(title, content);
            conn.execute(
                "UPDATE documents
                 SET title = ?2, content = ?3, word_count = ?4, char_count = ?5,
                     version = ?6, updated_at = ?7
                 WHERE id = ?1",
                params![
                    doc.id,
                    doc.title,
                    doc.content,
                    doc.word_count,
                    doc.char_count,
                    doc.version,
                    doc.updated_at.timestamp_millis(),
                ],
            )?;
            debug!("Saved document {} at version {}", doc.id, doc.version);
            Ok(doc)
        })
        .await
    }

    async fn delete(&self, document_id: &str) -> StoreResult<()> {
        let document_id = document_id.to_string();
        self.run(move |conn| {
            let removed = conn.execute("DELETE FROM documents WHERE id = ?1", params![document_id])?;
            if removed == 0 {
                return Err(StoreError::not_found("Document", document_id));
            }
            info!("Deleted document {}", document_id);
            Ok(())
        })
        .await
    }
}

fn timestamp(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: timestamp(row.get(3)?),
        updated_at: timestamp(row.get(4)?),
    })
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        project_id: row.get(3)?,
        folder_path: row.get(4)?,
        word_count: row.get(5)?,
        char_count: row.get(6)?,
        version: row.get(7)?,
        created_at: timestamp(row.get(8)?),
        updated_at: timestamp(row.get(9)?),
    })
}

fn select_project(conn: &Connection, id: &str) -> rusqlite::Result<Option<Project>> {
    conn.query_row(
        "SELECT id, name, description, created_at, updated_at FROM projects WHERE id = ?1",
        params![id],
        project_from_row,
    )
    .optional()
}

fn select_document(conn: &Connection, id: &str) -> rusqlite::Result<Option<Document>> {
    conn.query_row(
        &format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS),
        params![id],
        document_from_row,
    )
    .optional()
}
