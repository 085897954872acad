//! Project command handlers

use anyhow::{Context, Result};

use draftwell_core::SqliteStore;

use crate::output::Output;

/// Create a new project
pub async fn create(store: &SqliteStore, name: String, output: &Output) -> Result<()> {
    let project = store
        .create_project(&name)
        .await
        .context("Failed to create project")?;

    output.success(&format!("Created project: {}", project.id));
    output.print_project(&project);
    Ok(())
}

/// List all projects
pub async fn list(store: &SqliteStore, output: &Output) -> Result<()> {
    let projects = store.list_projects().await?;

    let mut rows = Vec::with_capacity(projects.len());
    for project in projects {
        let count = store.document_count(&project.id).await?;
        rows.push((project, count));
    }

    output.print_projects(&rows);
    Ok(())
}
