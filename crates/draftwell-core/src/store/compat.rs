//! Argument compatibility for command-style backends
//!
//! Backend commands have accepted both snake_case and camelCase argument
//! names over time. Outgoing payloads are rewritten once, here, so that
//! every known key is present under both spellings. Option blobs that are
//! forwarded verbatim to exporters are never rewritten.

use serde_json::{Map, Value};

/// Keys that are sent under both spellings
pub const KEY_PAIRS: &[(&str, &str)] = &[
    ("project_id", "projectId"),
    ("workspace_id", "workspaceId"),
    ("document_id", "documentId"),
    ("project_data", "projectData"),
    ("workspace_data", "workspaceData"),
    ("document_data", "documentData"),
    ("content_type", "contentType"),
];

/// Values under these keys are passed through untouched
const OPAQUE_KEYS: &[&str] = &["env", "pdf_options", "html_options", "markdown_options"];

const CREATE_DOCUMENT: &str = "create_document";

/// Prepare the arguments of `command` for the wire
///
/// A `create_document` payload that carries `title` or `content` at the top
/// level but no `document_data` wrapper gets wrapped first.
pub fn prepare_args(command: &str, args: Value) -> Value {
    if command == CREATE_DOCUMENT && needs_document_wrapper(&args) {
        let mut root = Map::new();
        root.insert("document_data".to_string(), args);
        return expand_keys(Value::Object(root));
    }
    expand_keys(args)
}

fn needs_document_wrapper(args: &Value) -> bool {
    match args {
        Value::Object(map) => {
            let wrapped = map.contains_key("document_data") || map.contains_key("documentData");
            !wrapped && (map.contains_key("title") || map.contains_key("content"))
        }
        _ => false,
    }
}

/// Mirror every known key pair, recursing through objects and arrays
pub fn expand_keys(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(expand_keys).collect()),
        Value::Object(map) => Value::Object(expand_object(map)),
        other => other,
    }
}

fn expand_object(mut map: Map<String, Value>) -> Map<String, Value> {
    for (snake, camel) in KEY_PAIRS {
        mirror(&mut map, snake, camel);
        mirror(&mut map, camel, snake);
    }

    map.into_iter()
        .map(|(key, value)| {
            let value = if OPAQUE_KEYS.contains(&key.as_str()) {
                value
            } else {
                expand_keys(value)
            };
            (key, value)
        })
        .collect()
}

fn mirror(map: &mut Map<String, Value>, from: &str, to: &str) {
    if map.contains_key(to) {
        return;
    }
    if let Some(value) = map.get(from).cloned() {
        map.insert(to.to_string(), value);
    }
}
