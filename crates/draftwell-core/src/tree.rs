//! Document tree
//!
//! Turns a flat document list into the folder hierarchy shown in the
//! document picker. Folders are virtual: they exist only because some
//! document's `folder_path` names them.
//!
//! ## Ordering
//!
//! Nothing is sorted. Folders and files appear in the order they are first
//! encountered in the input list, at every level of the tree.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::Document;

/// Prefix used for synthesized folder node ids
const FOLDER_ID_PREFIX: &str = "folder-";

/// A node in the document tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DocumentNode {
    /// Virtual folder, keyed by its full path (e.g. `Drafts/2024`)
    Folder {
        name: String,
        path: String,
        children: Vec<DocumentNode>,
    },
    /// A single document
    File(Document),
}

impl DocumentNode {
    /// Stable node id: the document id for files, `folder-<path>` for folders
    pub fn id(&self) -> String {
        match self {
            DocumentNode::Folder { path, .. } => format!("{}{}", FOLDER_ID_PREFIX, path),
            DocumentNode::File(doc) => doc.id.clone(),
        }
    }

    /// Display name: folder segment or document title
    pub fn name(&self) -> &str {
        match self {
            DocumentNode::Folder { name, .. } => name,
            DocumentNode::File(doc) => &doc.title,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, DocumentNode::Folder { .. })
    }

    pub fn children(&self) -> &[DocumentNode] {
        match self {
            DocumentNode::Folder { children, .. } => children,
            DocumentNode::File(_) => &[],
        }
    }

    pub fn document(&self) -> Option<&Document> {
        match self {
            DocumentNode::File(doc) => Some(doc),
            DocumentNode::Folder { .. } => None,
        }
    }
}

/// A node together with its nesting depth, for flat list rendering
#[derive(Debug, Clone, Copy)]
pub struct TreeRow<'a> {
    pub depth: usize,
    pub node: &'a DocumentNode,
}

/// Where a node lives while the tree is being assembled
enum Slot {
    Folder(usize),
    File(usize),
}

struct FolderDraft {
    name: String,
    path: String,
    children: Vec<Slot>,
}

/// Split a folder path into its non-empty segments
///
/// Segments are taken verbatim: `"Drafts "` and `"Drafts"` are different
/// folders.
fn folder_segments(folder_path: Option<&str>) -> Vec<&str> {
    folder_path
        .map(|path| {
            path.split('/')
                .filter(|segment| !segment.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Canonical form of a folder path, or `None` when it names no folder
///
/// `"/Drafts//2024/"` becomes `Some("Drafts/2024")`; `"//"` becomes `None`.
pub fn normalize_folder_path(folder_path: Option<&str>) -> Option<String> {
    let segments = folder_segments(folder_path);
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// Build the document tree from a flat list
///
/// Total over any input: documents whose folder path has no usable segments
/// land at the root.
pub fn build_tree(documents: &[Document]) -> Vec<DocumentNode> {
    let mut folders: Vec<FolderDraft> = Vec::new();
    let mut folder_index: HashMap<String, usize> = HashMap::new();
    let mut roots: Vec<Slot> = Vec::new();

    for (doc_index, doc) in documents.iter().enumerate() {
        let mut path = String::new();
        let mut parent: Option<usize> = None;

        for segment in folder_segments(doc.folder_path.as_deref()) {
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(segment);

            let folder = match folder_index.get(&path) {
                Some(&existing) => existing,
                None => {
                    let created = folders.len();
                    folders.push(FolderDraft {
                        name: segment.to_string(),
                        path: path.clone(),
                        children: Vec::new(),
                    });
                    folder_index.insert(path.clone(), created);
                    match parent {
                        Some(p) => folders[p].children.push(Slot::Folder(created)),
                        None => roots.push(Slot::Folder(created)),
                    }
                    created
                }
            };
            parent = Some(folder);
        }

        match parent {
            Some(p) => folders[p].children.push(Slot::File(doc_index)),
            None => roots.push(Slot::File(doc_index)),
        }
    }

    roots
        .iter()
        .map(|slot| materialize(slot, &folders, documents))
        .collect()
}

fn materialize(slot: &Slot, folders: &[FolderDraft], documents: &[Document]) -> DocumentNode {
    match slot {
        Slot::File(index) => DocumentNode::File(documents[*index].clone()),
        Slot::Folder(index) => {
            let draft = &folders[*index];
            DocumentNode::Folder {
                name: draft.name.clone(),
                path: draft.path.clone(),
                children: draft
                    .children
                    .iter()
                    .map(|child| materialize(child, folders, documents))
                    .collect(),
            }
        }
    }
}

/// Recover the folder path from a folder node id (`folder-a/b` -> `a/b`)
pub fn folder_path_from_node_id(node_id: &str) -> Option<&str> {
    node_id
        .strip_prefix(FOLDER_ID_PREFIX)
        .filter(|path| !path.is_empty())
}

/// Find a document anywhere in the tree by id
pub fn find_document<'a>(nodes: &'a [DocumentNode], id: &str) -> Option<&'a Document> {
    nodes.iter().find_map(|node| match node {
        DocumentNode::File(doc) if doc.id == id => Some(doc),
        DocumentNode::File(_) => None,
        DocumentNode::Folder { children, .. } => find_document(children, id),
    })
}

/// Depth-first listing of every node with its depth
pub fn walk(nodes: &[DocumentNode]) -> Vec<TreeRow<'_>> {
    fn visit<'a>(nodes: &'a [DocumentNode], depth: usize, rows: &mut Vec<TreeRow<'a>>) {
        for node in nodes {
            rows.push(TreeRow { depth, node });
            visit(node.children(), depth + 1, rows);
        }
    }

    let mut rows = Vec::new();
    visit(nodes, 0, &mut rows);
    rows
}
