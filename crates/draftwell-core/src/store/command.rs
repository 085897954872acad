//! Document store client for command-style backends
//!
//! The backend exposes named commands that take a JSON object and return
//! JSON. [`CommandStore`] maps the four store operations onto those commands
//! and runs every payload through [`compat::prepare_args`] first.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use crate::models::{Document, NewDocument};
use crate::store::compat;
use crate::store::{DocumentStore, StoreError, StoreResult};

/// Sends one command to the backend and returns its JSON reply
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn invoke(&self, command: &str, args: Value) -> StoreResult<Value>;
}

pub struct CommandStore<T> {
    transport: T,
}

impl<T: CommandTransport> CommandStore<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call<R: DeserializeOwned>(&self, command: &str, args: Value) -> StoreResult<R> {
        let reply = self.call_raw(command, args).await?;
        Ok(serde_json::from_value(reply)?)
    }

    async fn call_raw(&self, command: &str, args: Value) -> StoreResult<Value> {
        let args = compat::prepare_args(command, args);
        debug!("Invoking backend command {}", command);
        self.transport.invoke(command, args).await
    }
}

#[async_trait]
impl<T: CommandTransport> DocumentStore for CommandStore<T> {
    async fn list_by_project(&self, project_id: &str) -> StoreResult<Vec<Document>> {
        self.call("get_documents_by_project", json!({ "project_id": project_id }))
            .await
    }

    async fn create(&self, request: NewDocument) -> StoreResult<Document> {
        if request.project_id.trim().is_empty() {
            return Err(StoreError::Validation(
                "Document must belong to a project".to_string(),
            ));
        }
        self.call("create_document", serde_json::to_value(&request)?)
            .await
    }

    async fn save(&self, document_id: &str, title: &str, content: &str) -> StoreResult<Document> {
        let reply = self
            .call_raw(
                "save_document",
                json!({ "document_id": document_id, "title": title, "content": content }),
            )
            .await?;

        // Older backends acknowledge with null; read the stored row back
        if reply.is_null() {
            let stored: Option<Document> = self
                .call("get_document_by_id", json!({ "document_id": document_id }))
                .await?;
            return stored.ok_or_else(|| StoreError::not_found("Document", document_id));
        }

        Ok(serde_json::from_value(reply)?)
    }

    async fn delete(&self, document_id: &str) -> StoreResult<()> {
        self.call_raw("delete_document", json!({ "document_id": document_id }))
            .await?;
        Ok(())
    }
}
