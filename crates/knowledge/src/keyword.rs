//! Plain substring search over the manual text.

use crate::parser::Manual;

/// Lines of context kept on each side of a hit.
pub const CONTEXT_LINES: usize = 2;

/// Maximum hits returned by a keyword search.
pub const MAX_KEYWORD_HITS: usize = 10;

/// Case-insensitive substring search over the manual's lines.
///
/// Each matching line yields the window from two lines before to two lines
/// after it, joined by newlines. At most [`MAX_KEYWORD_HITS`] windows are
/// returned, in document order. A blank query matches nothing.
pub fn keyword_search(manual: &Manual, query: &str) -> Vec<String> {
    search_lines(&manual.full_text(), query, MAX_KEYWORD_HITS)
}

fn search_lines(text: &str, query: &str, limit: usize) -> Vec<String> {
    let needle = query.to_lowercase();
    if needle.trim().is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = text.split('\n').collect();
    let mut hits = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if !line.to_lowercase().contains(&needle) {
            continue;
        }

        let start = i.saturating_sub(CONTEXT_LINES);
        let end = (i + CONTEXT_LINES + 1).min(lines.len());
        hits.push(lines[start..end].join("\n"));

        if hits.len() == limit {
            break;
        }
    }

    tracing::debug!("Keyword search for '{}' found {} hits", query, hits.len());
    hits
}
