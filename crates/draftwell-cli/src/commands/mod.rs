//! Command handlers

pub mod config;
pub mod document;
pub mod project;

use anyhow::{bail, Result};
use tokio::sync::mpsc::UnboundedReceiver;

use draftwell_core::{Document, Project, SessionEvent, SqliteStore};

use crate::output::Output;

/// Resolve a project by full id, id prefix, or exact name
pub async fn resolve_project(store: &SqliteStore, id_or_name: &str) -> Result<Project> {
    if let Some(project) = store.get_project(id_or_name).await? {
        return Ok(project);
    }

    let projects = store.list_projects().await?;
    let mut matches: Vec<_> = projects
        .into_iter()
        .filter(|p| p.id.starts_with(id_or_name) || p.name.eq_ignore_ascii_case(id_or_name))
        .collect();

    match matches.len() {
        0 => bail!("No project found matching: {}", id_or_name),
        1 => Ok(matches.remove(0)),
        _ => {
            eprintln!("Multiple projects match '{}':", id_or_name);
            for project in &matches {
                eprintln!("  {} - {}", project.id, project.name);
            }
            bail!("Ambiguous project. Please provide more characters of the ID.");
        }
    }
}

/// Resolve a document by full id or id prefix
pub async fn resolve_document(store: &SqliteStore, id: &str) -> Result<Document> {
    if let Some(doc) = store.get_document(id).await? {
        return Ok(doc);
    }

    let mut matches = store.find_documents_by_prefix(id).await?;
    match matches.len() {
        0 => bail!("No document found matching: {}", id),
        1 => Ok(matches.remove(0)),
        _ => {
            eprintln!("Multiple documents match '{}':", id);
            for doc in &matches {
                eprintln!("  {} - {}", doc.id, doc.title);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

/// Surface failures published by the session controller
pub fn report_failures(events: &mut UnboundedReceiver<SessionEvent>, output: &Output) -> usize {
    let mut failures = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::SaveFailed { document_id, error } => {
                failures += 1;
                output.warn(&format!("Saving {} failed: {}", document_id, error));
            }
            SessionEvent::OperationFailed { operation, error } => {
                failures += 1;
                output.warn(&format!("Could not {} document: {}", operation, error));
            }
            _ => {}
        }
    }
    failures
}
