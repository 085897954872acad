//! Title derivation
//!
//! A document's title comes from a level-1 heading on its first line.
//! Only the first line is inspected so the check stays cheap enough to run
//! on every keystroke.
//!
//! Unlike outline headings, a title keeps any trailing `#` characters:
//! `# Issue #42 ##` is titled `Issue #42 ##`.

/// Return the trimmed text after a leading `# ` on the first line, if any
pub fn extract_title(content: &str) -> Option<&str> {
    let first_line = content.lines().next()?;
    let rest = first_line.strip_prefix('#')?;
    if !rest.starts_with([' ', '\t']) {
        return None;
    }

    let text = rest.trim();
    (!text.is_empty()).then_some(text)
}
