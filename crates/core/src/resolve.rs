//! Title/body resolution for a single slide record.

use crate::types::{ResolvedContent, SlideRecord};

/// Title used when a slide has no text at all.
pub const FALLBACK_TITLE: &str = "Untitled";

/// Paragraph delimiter inside a resolved body.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Split a slide record into a single title and a single body.
///
/// - A title placeholder wins; every run whose text differs from it joins
///   the body.
/// - Otherwise the first run's first non-blank line becomes the title and
///   the rest of that run opens the body.
/// - A slide without text is titled [`FALLBACK_TITLE`] with an empty body.
pub fn resolve(record: &SlideRecord) -> ResolvedContent {
    let runs: Vec<&str> = record
        .text_runs
        .iter()
        .map(|r| r.text.trim())
        .filter(|t| !t.is_empty())
        .collect();

    let candidate = record
        .title_candidate
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let (title, body_parts): (String, Vec<String>) = if let Some(title) = candidate {
        let parts = runs
            .iter()
            .filter(|t| **t != title)
            .map(|t| t.to_string())
            .collect();
        (title.to_string(), parts)
    } else if let Some((first, rest)) = runs.split_first() {
        let mut lines = first.lines().filter(|l| !l.trim().is_empty());
        // `first` is non-blank, so it has at least one non-blank line.
        let title = lines.next().unwrap_or_default().trim().to_string();
        let remainder = lines.collect::<Vec<_>>().join("\n").trim().to_string();

        let mut parts = Vec::with_capacity(rest.len() + 1);
        if !remainder.is_empty() {
            parts.push(remainder);
        }
        parts.extend(rest.iter().map(|t| t.to_string()));
        (title, parts)
    } else {
        (FALLBACK_TITLE.to_string(), Vec::new())
    };

    let body = body_parts.join(PARAGRAPH_SEPARATOR).trim().to_string();
    ResolvedContent { title, body }
}
