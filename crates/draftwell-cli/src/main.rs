//! Draftwell CLI
//!
//! Command-line interface for draftwell - projects, documents and outlines.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use draftwell_core::{Config, SqliteStore};

mod commands;
mod editor;
mod logging;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "draftwell")]
#[command(about = "Draftwell - writing projects with auto-saving documents")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Manage documents
    #[command(alias = "doc")]
    Document {
        #[command(subcommand)]
        command: DocumentCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Create a new project
    #[command(alias = "add")]
    Create {
        /// Project name
        name: String,
    },
    /// List all projects
    #[command(alias = "ls")]
    List,
}

#[derive(Subcommand)]
enum DocumentCommands {
    /// Create a new document from the template
    #[command(alias = "add")]
    Create {
        /// Project ID (full, prefix) or name
        project: String,
        /// Virtual folder, e.g. Drafts/2024
        #[arg(short, long)]
        folder: Option<String>,
        /// Open the new document in $EDITOR
        #[arg(short, long)]
        edit: bool,
    },
    /// List a project's documents as a tree
    #[command(alias = "ls")]
    List {
        /// Project ID (full, prefix) or name
        project: String,
    },
    /// Show a document
    Show {
        /// Document ID (full or prefix)
        id: String,
    },
    /// Edit a document in $EDITOR
    Edit {
        /// Document ID (full or prefix)
        id: String,
    },
    /// Show the heading outline of a document
    Outline {
        /// Document ID (full or prefix)
        id: String,
        /// Include level-1 headings
        #[arg(long)]
        all: bool,
    },
    /// Delete a document
    #[command(alias = "rm")]
    Delete {
        /// Document ID (full or prefix)
        id: String,
    },
    /// Import a text file
    Import {
        /// File to import
        file: PathBuf,
        /// Create a new document in this project
        #[arg(short, long, required_unless_present = "into")]
        project: Option<String>,
        /// Replace the content of this document instead
        #[arg(long, conflicts_with = "project")]
        into: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, auto_save, autosave_delay_ms, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    logging::init(&config);

    let store = Arc::new(SqliteStore::open(&config).context("Failed to open document store")?);

    match cli.command {
        Commands::Project { command } => handle_project_command(command, &store, &output).await,
        Commands::Document { command } => {
            handle_document_command(command, store, &config, &output).await
        }
        Commands::Config { .. } => Ok(()), // Handled above
    }
}

async fn handle_project_command(
    command: ProjectCommands,
    store: &SqliteStore,
    output: &Output,
) -> Result<()> {
    match command {
        ProjectCommands::Create { name } => commands::project::create(store, name, output).await,
        ProjectCommands::List => commands::project::list(store, output).await,
    }
}

async fn handle_document_command(
    command: DocumentCommands,
    store: Arc<SqliteStore>,
    config: &Config,
    output: &Output,
) -> Result<()> {
    use commands::document;

    match command {
        DocumentCommands::Create {
            project,
            folder,
            edit,
        } => document::create(store, config, project, folder, edit, output).await,
        DocumentCommands::List { project } => document::list(&store, project, output).await,
        DocumentCommands::Show { id } => document::show(&store, id, output).await,
        DocumentCommands::Edit { id } => document::edit(store, config, id, output).await,
        DocumentCommands::Outline { id, all } => {
            document::outline(&store, config, id, all, output).await
        }
        DocumentCommands::Delete { id } => document::delete(store, config, id, output).await,
        DocumentCommands::Import {
            file,
            project,
            into,
        } => document::import(store, config, file, project, into, output).await,
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}
