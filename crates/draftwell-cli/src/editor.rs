//! External editor support
//!
//! Document bodies are edited in $EDITOR through a temporary markdown file.
//! The editor blocks until the user quits, so it runs on tokio's blocking
//! pool.

use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Editors tried, in order, when neither $EDITOR nor $VISUAL is set
const FALLBACK_EDITORS: [&str; 4] = ["nano", "vim", "vi", "notepad"];

/// An editor command split into program and leading arguments
#[derive(Debug, PartialEq)]
struct EditorCommand {
    program: String,
    args: Vec<String>,
}

impl EditorCommand {
    /// Parse values like `code --wait`; `None` for a blank value
    fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

/// Open `initial_content` in the user's editor and return the edited text
pub async fn edit_text(initial_content: &str, document_id: &str) -> Result<String> {
    let editor = resolve_editor(|var| env::var(var).ok(), on_path)?;
    let temp_path = temp_file_path(document_id);
    let initial_content = initial_content.to_string();

    tokio::task::spawn_blocking(move || run_editor(&editor, &temp_path, &initial_content))
        .await
        .context("Editor task panicked")?
}

fn run_editor(editor: &EditorCommand, temp_path: &Path, initial_content: &str) -> Result<String> {
    fs::write(temp_path, initial_content)
        .with_context(|| format!("Failed to create temp file: {:?}", temp_path))?;

    let result = Command::new(&editor.program)
        .args(&editor.args)
        .arg(temp_path)
        .status()
        .with_context(|| format!("Failed to run editor: {}", editor.program))
        .and_then(|status| {
            if !status.success() {
                bail!(
                    "Editor '{}' exited with {}. Your changes were not applied.",
                    editor.program,
                    status
                );
            }
            fs::read_to_string(temp_path)
                .with_context(|| format!("Failed to read edited file: {:?}", temp_path))
        });

    let _ = fs::remove_file(temp_path);
    result
}

/// Temp file per process and document so parallel edits don't collide
fn temp_file_path(document_id: &str) -> PathBuf {
    let safe_id: String = document_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(36)
        .collect();
    env::temp_dir().join(format!(
        "draftwell_{}_{}.md",
        std::process::id(),
        safe_id
    ))
}

/// Pick the editor from $EDITOR, then $VISUAL, then the first fallback found
fn resolve_editor(
    lookup: impl Fn(&str) -> Option<String>,
    installed: impl Fn(&str) -> bool,
) -> Result<EditorCommand> {
    let configured = ["EDITOR", "VISUAL"]
        .into_iter()
        .filter_map(|var| lookup(var))
        .find_map(|value| EditorCommand::parse(&value));
    if let Some(editor) = configured {
        return Ok(editor);
    }

    FALLBACK_EDITORS
        .into_iter()
        .find(|name| installed(*name))
        .and_then(EditorCommand::parse)
        .context("No editor found. Set $EDITOR, e.g. `export EDITOR=nano`")
}

/// Whether an executable named `program` is in one of the PATH directories
fn on_path(program: &str) -> bool {
    let Some(paths) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&paths).any(|dir| {
        let candidate = dir.join(program);
        candidate.is_file() || candidate.with_extension("exe").is_file()
    })
}

/// Ask a yes/no question on the terminal; `false` without a TTY
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    Ok(read_confirmation(io::stdin().lock())?)
}

fn read_confirmation(mut input: impl BufRead) -> io::Result<bool> {
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes"
    ))
}
