//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use draftwell_core::models::TextStats;
use draftwell_core::tree::walk;
use draftwell_core::{Document, DocumentNode, OutlineEntry, Project};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single document with its statistics
    pub fn print_document(&self, doc: &Document) {
        match self.format {
            OutputFormat::Human => {
                let stats = TextStats::of(&doc.content);
                println!("ID:       {}", doc.id);
                println!("Title:    {}", doc.title);
                if let Some(ref folder) = doc.folder_path {
                    println!("Folder:   {}", folder);
                }
                println!(
                    "Words:    {} ({} chars, ~{} min read)",
                    doc.word_count, doc.char_count, stats.reading_minutes
                );
                println!("Version:  {}", doc.version);
                println!("Created:  {}", doc.created_at.format("%Y-%m-%d %H:%M"));
                println!("Updated:  {}", doc.updated_at.format("%Y-%m-%d %H:%M"));
                println!();
                println!("{}", doc.content);
            }
            OutputFormat::Json => print_json(doc),
            OutputFormat::Quiet => println!("{}", doc.id),
        }
    }

    /// Print the document tree of a project
    pub fn print_tree(&self, tree: &[DocumentNode]) {
        match self.format {
            OutputFormat::Human => {
                if tree.is_empty() {
                    println!("No documents found.");
                    return;
                }
                let mut count = 0;
                for row in walk(tree) {
                    let indent = "  ".repeat(row.depth);
                    match row.node.document() {
                        Some(doc) => {
                            count += 1;
                            println!(
                                "{}{} {} ({} words)",
                                indent,
                                short_id(&doc.id),
                                truncate(&doc.title, 40),
                                doc.word_count
                            );
                        }
                        None => println!("{}{}/", indent, row.node.name()),
                    }
                }
                println!("\n{} document(s)", count);
            }
            OutputFormat::Json => print_json(&tree),
            OutputFormat::Quiet => {
                for row in walk(tree) {
                    if let Some(doc) = row.node.document() {
                        println!("{}", doc.id);
                    }
                }
            }
        }
    }

    /// Print an outline as an indented heading list
    pub fn print_outline(&self, entries: &[OutlineEntry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No headings found.");
                    return;
                }
                let top = entries.iter().map(|e| e.level).min().unwrap_or(1);
                for entry in entries {
                    let indent = "  ".repeat(usize::from(entry.level - top));
                    println!("{:>5}  {}{}", entry.line, indent, entry.text);
                }
            }
            OutputFormat::Json => print_json(&entries),
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}\t{}", entry.line, entry.text);
                }
            }
        }
    }

    /// Print a list of projects with their document counts
    pub fn print_projects(&self, projects: &[(Project, i64)]) {
        match self.format {
            OutputFormat::Human => {
                if projects.is_empty() {
                    println!("No projects found.");
                    return;
                }
                for (project, count) in projects {
                    println!(
                        "{} | {} | {} document(s)",
                        short_id(&project.id),
                        truncate(&project.name, 40),
                        count
                    );
                }
                println!("\n{} project(s)", projects.len());
            }
            OutputFormat::Json => {
                let json: Vec<_> = projects
                    .iter()
                    .map(|(project, count)| {
                        serde_json::json!({
                            "id": project.id,
                            "name": project.name,
                            "description": project.description,
                            "documents": count,
                            "created_at": project.created_at,
                        })
                    })
                    .collect();
                print_json(&json);
            }
            OutputFormat::Quiet => {
                for (project, _) in projects {
                    println!("{}", project.id);
                }
            }
        }
    }

    pub fn print_project(&self, project: &Project) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", project.id);
                println!("Name:     {}", project.name);
                println!("Created:  {}", project.created_at.format("%Y-%m-%d %H:%M"));
            }
            OutputFormat::Json => print_json(project),
            OutputFormat::Quiet => println!("{}", project.id),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warn(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

/// First eight characters of an id
pub fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(end, _)| &id[..end])
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        // Multi-byte titles must not split a character
        assert_eq!(truncate("第一章第二章第三章第四章", 5), "第一...");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }
}
