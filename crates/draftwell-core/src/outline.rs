//! Outline extraction
//!
//! Scans markdown content line by line for ATX headings (`#` .. `######`)
//! and returns them in document order. Parsing is a single forward pass per
//! line with no backtracking, so it stays linear in content size.

use serde::{Deserialize, Serialize};

/// Deepest heading level recognised
pub const MAX_HEADING_LEVEL: u8 = 6;

/// A heading found in the content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    /// Heading level, 1..=6
    pub level: u8,
    /// Heading text, trimmed
    pub text: String,
    /// 1-indexed physical line number (blank lines counted)
    pub line: usize,
}

/// Which heading levels make it into the outline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineOptions {
    pub min_level: u8,
    pub max_level: u8,
}

impl OutlineOptions {
    /// Editing-session outline: level 1 is reserved for the document title
    pub fn editor() -> Self {
        Self {
            min_level: 2,
            max_level: MAX_HEADING_LEVEL,
        }
    }

    /// Every heading level
    pub fn all_levels() -> Self {
        Self {
            min_level: 1,
            max_level: MAX_HEADING_LEVEL,
        }
    }

    /// Build options from a configured minimum level, clamped to 1..=6
    pub fn from_min_level(min_level: u8) -> Self {
        Self {
            min_level: min_level.clamp(1, MAX_HEADING_LEVEL),
            max_level: MAX_HEADING_LEVEL,
        }
    }

    fn includes(&self, level: u8) -> bool {
        level >= self.min_level && level <= self.max_level
    }
}

impl Default for OutlineOptions {
    fn default() -> Self {
        Self::editor()
    }
}

/// Parse a single line as an ATX heading.
///
/// Returns the level and trimmed text. The hashes must start the line and be
/// followed by a space or tab; an optional closing run of `#` is dropped.
/// Headings whose text is empty after trimming are not headings.
pub fn parse_heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if hashes == 0 || hashes > MAX_HEADING_LEVEL as usize {
        return None;
    }

    let rest = &line[hashes..];
    if !rest.starts_with(is_blank) {
        return None;
    }

    let mut text = rest.trim();
    let without_closing = text.trim_end_matches('#');
    if without_closing.len() < text.len()
        && (without_closing.is_empty() || without_closing.ends_with(is_blank))
    {
        text = without_closing.trim_end();
    }

    if text.is_empty() {
        return None;
    }
    Some((hashes as u8, text))
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Extract the outline of `content`, keeping only levels allowed by `options`
pub fn extract_outline(content: &str, options: OutlineOptions) -> Vec<OutlineEntry> {
    content
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let (level, text) = parse_heading(line)?;
            options.includes(level).then(|| OutlineEntry {
                level,
                text: text.to_string(),
                line: index + 1,
            })
        })
        .collect()
}
