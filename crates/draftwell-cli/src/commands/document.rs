//! Document command handlers
//!
//! Anything that changes a document goes through a [`SessionController`],
//! the same path an interactive editor uses.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc::UnboundedReceiver;

use draftwell_core::{
    build_tree, extract_outline, Config, Document, DocumentStore, OutlineOptions,
    SessionController, SessionEvent, SqliteStore,
};

use crate::commands::{report_failures, resolve_document, resolve_project};
use crate::editor::{confirm, edit_text};
use crate::output::{short_id, Output};

fn open_session(
    store: &Arc<SqliteStore>,
    config: &Config,
) -> (SessionController, UnboundedReceiver<SessionEvent>) {
    let store: Arc<dyn DocumentStore> = store.clone();
    SessionController::new(store, config.session_options())
}

/// Create a document from the template, optionally editing it right away
pub async fn create(
    store: Arc<SqliteStore>,
    config: &Config,
    project: String,
    folder: Option<String>,
    edit: bool,
    output: &Output,
) -> Result<()> {
    let project = resolve_project(&store, &project).await?;
    let (mut session, mut events) = open_session(&store, config);
    session.open_project(&project.id).await?;

    let doc = session
        .create_document(&project.id, folder.as_deref())
        .await
        .context("Failed to create document")?;
    output.success(&format!("Created document: {}", doc.id));

    let doc = if edit && output.should_prompt() {
        edit_open_document(&mut session, &mut events, config, output)
            .await?
            .unwrap_or(doc)
    } else {
        doc
    };

    output.print_document(&doc);
    Ok(())
}

/// List a project's documents as a folder tree
pub async fn list(store: &SqliteStore, project: String, output: &Output) -> Result<()> {
    let project = resolve_project(store, &project).await?;
    let documents = store.list_by_project(&project.id).await?;
    output.print_tree(&build_tree(&documents));
    Ok(())
}

/// Show a single document
pub async fn show(store: &SqliteStore, id: String, output: &Output) -> Result<()> {
    let doc = resolve_document(store, &id).await?;
    output.print_document(&doc);
    Ok(())
}

/// Print a document's outline
pub async fn outline(
    store: &SqliteStore,
    config: &Config,
    id: String,
    all_levels: bool,
    output: &Output,
) -> Result<()> {
    let doc = resolve_document(store, &id).await?;
    let options = if all_levels {
        OutlineOptions::all_levels()
    } else {
        config.session_options().outline
    };
    output.print_outline(&extract_outline(&doc.content, options));
    Ok(())
}

/// Edit a document in $EDITOR and save it
pub async fn edit(
    store: Arc<SqliteStore>,
    config: &Config,
    id: String,
    output: &Output,
) -> Result<()> {
    let doc = resolve_document(&store, &id).await?;
    let (mut session, mut events) = open_session(&store, config);
    session.open_project(&doc.project_id).await?;
    session.select_document(doc);

    match edit_open_document(&mut session, &mut events, config, output).await? {
        Some(saved) => output.success(&format!(
            "Saved \"{}\" (version {}, {} words)",
            saved.title, saved.version, saved.word_count
        )),
        None => output.message("No changes."),
    }
    Ok(())
}

/// Delete a document
pub async fn delete(
    store: Arc<SqliteStore>,
    config: &Config,
    id: String,
    output: &Output,
) -> Result<()> {
    let doc = resolve_document(&store, &id).await?;

    if output.should_prompt() {
        println!("Delete document: {} - {}", short_id(&doc.id), doc.title);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let (mut session, mut events) = open_session(&store, config);
    session
        .delete_document(&doc.id)
        .await
        .context("Failed to delete document")?;
    report_failures(&mut events, output);

    output.success(&format!("Deleted document: {}", doc.id));
    Ok(())
}

/// Import a file, either into an existing document or as a new one
pub async fn import(
    store: Arc<SqliteStore>,
    config: &Config,
    file: PathBuf,
    project: Option<String>,
    into: Option<String>,
    output: &Output,
) -> Result<()> {
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {:?}", file))?;
    let format = import_format(&file);

    let target = match into {
        Some(id) => Some(resolve_document(&store, &id).await?),
        None => None,
    };
    let project_id = match (&target, project) {
        (Some(doc), _) => doc.project_id.clone(),
        (None, Some(project)) => resolve_project(&store, &project).await?.id,
        (None, None) => bail!("Pass --project to create a new document, or --into to replace one"),
    };

    let (mut session, mut events) = open_session(&store, config);
    session.open_project(&project_id).await?;
    match target {
        Some(doc) => session.select_document(doc),
        None => session.close_document(),
    }

    let created = session.import_content(content, &format).await?;
    let saved = session.flush().await;
    session.settle().await;
    report_failures(&mut events, output);
    let saved = saved.context("Failed to save imported content")?;

    match (created, saved) {
        (Some(doc), _) => output.success(&format!("Imported into new document: {}", doc.id)),
        (None, Some(doc)) => output.success(&format!("Imported into \"{}\"", doc.title)),
        (None, None) => output.message("Nothing to import."),
    }
    Ok(())
}

/// Format tag for an imported file, taken from its extension
fn import_format(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_lowercase)
        .unwrap_or_else(|| "txt".to_string())
}

/// Run the open document through $EDITOR and persist the result
///
/// Returns the saved document, or `None` when the text was not changed. If
/// the save fails the edited text is written next to the database so it is
/// not lost with the process.
async fn edit_open_document(
    session: &mut SessionController,
    events: &mut UnboundedReceiver<SessionEvent>,
    config: &Config,
    output: &Output,
) -> Result<Option<Document>> {
    let snapshot = session.snapshot();
    let Some(doc) = snapshot.document else {
        bail!("No document is open");
    };

    let edited = edit_text(&snapshot.content, &doc.id).await?;
    if edited == snapshot.content {
        return Ok(None);
    }

    session.on_content_change(edited.clone())?;
    let saved = session.flush().await;
    session.settle().await;
    report_failures(events, output);

    match saved {
        Ok(saved) => Ok(saved),
        Err(e) => {
            let recovery = recovery_path(config, &doc.id);
            std::fs::write(&recovery, &edited)
                .with_context(|| format!("Failed to write recovery file {:?}", recovery))?;
            Err(anyhow::Error::new(e).context(format!(
                "Save failed; your text was kept in {}",
                recovery.display()
            )))
        }
    }
}

fn recovery_path(config: &Config, document_id: &str) -> PathBuf {
    config
        .data_dir
        .join(format!("recovered-{}.md", short_id(document_id)))
}
