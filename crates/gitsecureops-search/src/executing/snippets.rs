//! Snippet extraction from raw file content

use crate::model::Snippet;

/// Text of the single snippet attached when content could not be fetched
pub const CONTENT_UNAVAILABLE: &str = "content unavailable";

/// Every line containing `query` (case-insensitive) with `context_lines` of
/// context either side, at most `max_snippets` of them
pub fn extract_snippets(
    content: &str,
    query: &str,
    context_lines: usize,
    max_snippets: usize,
) -> Vec<Snippet> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = content.lines().collect();
    let last = lines.len().saturating_sub(1);

    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.to_lowercase().contains(&needle))
        .take(max_snippets)
        .map(|(index, _)| {
            let start = index.saturating_sub(context_lines);
            let end = index.saturating_add(context_lines).min(last);
            let text = lines.get(start..=end).unwrap_or_default().join("\n");

            Snippet {
                line_number: index.saturating_add(1),
                text,
                match_line_offset: index.saturating_sub(start),
                context_start_line: start.saturating_add(1),
                context_end_line: end.saturating_add(1),
            }
        })
        .collect()
}

/// Placeholder for a hit whose content fetch failed
pub fn unavailable_snippet() -> Snippet {
    Snippet {
        line_number: 0,
        text: CONTENT_UNAVAILABLE.to_string(),
        match_line_offset: 0,
        context_start_line: 0,
        context_end_line: 0,
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SOURCE: &str = "line 1\nline 2\nline 3\nline 4\n// todo: remove\nline 6\nline 7\nline 8\nline 9";

    #[test]
    fn captures_three_lines_of_context() {
        let snippets = extract_snippets(SOURCE, "TODO", 3, 5);

        assert_eq!(snippets.len(), 1);
        let snippet = &snippets[0];
        assert_eq!(snippet.line_number, 5);
        assert_eq!(snippet.context_start_line, 2);
        assert_eq!(snippet.context_end_line, 8);
        assert_eq!(snippet.match_line_offset, 3);
        assert_eq!(snippet.text.lines().nth(3), Some("// todo: remove"));
    }

    #[test]
    fn context_is_clipped_at_file_edges() {
        let snippets = extract_snippets("TODO first\nsecond\nthird TODO", "todo", 3, 5);

        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].context_start_line, 1);
        assert_eq!(snippets[0].match_line_offset, 0);
        assert_eq!(snippets[1].line_number, 3);
        assert_eq!(snippets[1].context_end_line, 3);
        assert_eq!(snippets[1].match_line_offset, 2);
    }

    #[test]
    fn snippet_count_is_capped() {
        let content = "secret\n".repeat(20);
        assert_eq!(extract_snippets(&content, "SECRET", 0, 5).len(), 5);
    }

    #[test]
    fn no_match_yields_no_snippets() {
        assert!(extract_snippets(SOURCE, "password", 3, 5).is_empty());
        assert!(extract_snippets("", "x", 3, 5).is_empty());
    }

    #[test]
    fn placeholder_has_fixed_text() {
        assert_eq!(unavailable_snippet().text, "content unavailable");
    }
}
