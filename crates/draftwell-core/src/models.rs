//! Data models for draftwell
//!
//! Defines the core data structures: Project, Document, and the
//! request/statistics types that travel with them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Words per minute used for reading time estimates
const READING_WORDS_PER_MINUTE: f64 = 200.0;

/// A writing project that groups documents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// When this project was created
    pub created_at: DateTime<Utc>,
    /// When this project was last updated
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a new project with the given name
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A document inside a project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique, opaque identifier
    pub id: String,
    /// Display title (derived from the first-line heading while editing)
    pub title: String,
    /// Full editable text
    pub content: String,
    /// Owning project
    pub project_id: String,
    /// Virtual folder, slash separated (e.g. `Drafts/2024`)
    #[serde(default)]
    pub folder_path: Option<String>,
    /// Word count, recomputed on save
    #[serde(default)]
    pub word_count: u32,
    /// Character count, recomputed on save
    #[serde(default)]
    pub char_count: u32,
    /// Incremented on every save
    #[serde(default = "initial_version")]
    pub version: u32,
    /// When this document was created
    pub created_at: DateTime<Utc>,
    /// When this document was last saved
    pub updated_at: DateTime<Utc>,
}

fn initial_version() -> u32 {
    1
}

impl Document {
    /// Build a brand-new document from a create request
    pub fn new(request: NewDocument) -> Self {
        let now = Utc::now();
        let stats = TextStats::of(&request.content);
        Self {
            id: Uuid::new_v4().to_string(),
            title: request.title,
            content: request.content,
            project_id: request.project_id,
            folder_path: request.folder_path,
            word_count: stats.words,
            char_count: stats.chars,
            version: initial_version(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a full-content save: replaces title and content,
    /// recomputes counts and bumps the version
    pub fn apply_save(&mut self, title: impl Into<String>, content: impl Into<String>) {
        self.title = title.into();
        self.content = content.into();
        let stats = TextStats::of(&self.content);
        self.word_count = stats.words;
        self.char_count = stats.chars;
        self.version = self.version.saturating_add(1);
        self.updated_at = Utc::now();
    }
}

/// Request to create a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewDocument {
    pub project_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub folder_path: Option<String>,
}

impl NewDocument {
    pub fn new(
        project_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            title: title.into(),
            content: content.into(),
            folder_path: None,
        }
    }

    /// Place the new document in a virtual folder
    pub fn in_folder(mut self, folder_path: Option<String>) -> Self {
        self.folder_path = folder_path.filter(|p| !p.trim().is_empty());
        self
    }
}

/// Live text statistics shown while editing
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextStats {
    /// Whitespace-separated words
    pub words: u32,
    /// Unicode scalar values
    pub chars: u32,
    /// Estimated reading time in minutes (rounded up)
    pub reading_minutes: u32,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        let words = text.split_whitespace().count() as u32;
        let chars = text.chars().count() as u32;
        let reading_minutes = (f64::from(words) / READING_WORDS_PER_MINUTE).ceil() as u32;
        Self {
            words,
            chars,
            reading_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_new() {
        let project = Project::new("Novel");
        assert_eq!(project.name, "Novel");
        assert!(project.description.is_none());
        assert!(!project.id.is_empty());
    }

    #[test]
    fn test_document_new_counts() {
        let doc = Document::new(NewDocument::new("p1", "Intro", "# Intro\n\nHello there"));
        assert_eq!(doc.title, "Intro");
        assert_eq!(doc.project_id, "p1");
        assert_eq!(doc.word_count, 4);
        assert_eq!(doc.char_count, 20);
        assert_eq!(doc.version, 1);
        assert!(doc.folder_path.is_none());
    }

    #[test]
    fn test_document_apply_save() {
        let mut doc = Document::new(NewDocument::new("p1", "Intro", ""));
        let original_updated = doc.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(10));

        doc.apply_save("Chapter", "# Chapter\n\none two three");
        assert_eq!(doc.title, "Chapter");
        assert_eq!(doc.word_count, 5);
        assert_eq!(doc.version, 2);
        assert!(doc.updated_at > original_updated);
    }

    #[test]
    fn test_new_document_in_folder() {
        let req = NewDocument::new("p1", "A", "").in_folder(Some("Drafts".to_string()));
        assert_eq!(req.folder_path.as_deref(), Some("Drafts"));

        let req = NewDocument::new("p1", "A", "").in_folder(Some("  ".to_string()));
        assert!(req.folder_path.is_none());
    }

    #[test]
    fn test_text_stats() {
        assert_eq!(TextStats::of(""), TextStats::default());

        let stats = TextStats::of("héllo wörld");
        assert_eq!(stats.words, 2);
        assert_eq!(stats.chars, 11);
        assert_eq!(stats.reading_minutes, 1);

        let long = "word ".repeat(401);
        assert_eq!(TextStats::of(&long).reading_minutes, 3);
    }

    #[test]
    fn test_document_deserialize_defaults() {
        let json = r#"{
            "id": "d1",
            "title": "T",
            "content": "",
            "project_id": "p1",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.word_count, 0);
        assert!(doc.folder_path.is_none());
    }

    #[test]
    fn test_document_serialization() {
        let doc = Document::new(
            NewDocument::new("p1", "Test", "Body").in_folder(Some("a/b".to_string())),
        );
        let json = serde_json::to_string(&doc).unwrap();
        let deserialized: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(doc, deserialized);
    }
}
