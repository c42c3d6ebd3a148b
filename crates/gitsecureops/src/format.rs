//! Output formats and rendering for terminal results

use clap::ValueEnum;
use gitsecureops_search::{ProgressEvent, RepoRef, SearchHit, SearchResult};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// How results are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human readable listing
    #[value(name = "text")]
    #[default]
    Text,

    /// Pretty JSON; one JSON line per event when streaming
    #[value(name = "json")]
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!(
                "Invalid output format: '{s}'. Valid options are: text, json"
            )),
        }
    }
}

fn to_io(error: serde_json::Error) -> io::Error {
    io::Error::other(error)
}

/// Write the final result
///
/// # Errors
/// Returns the writer's I/O errors
pub fn render_result<W: Write>(
    out: &mut W,
    result: &SearchResult,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, result).map_err(to_io)?;
            writeln!(out)
        }
        OutputFormat::Text => render_text(out, result),
    }
}

fn render_text<W: Write>(out: &mut W, result: &SearchResult) -> io::Result<()> {
    writeln!(
        out,
        "Found {} results in {} repositories (showing {})",
        result.total_results,
        result.repositories_searched,
        result.hits.len()
    )?;

    for hit in &result.hits {
        writeln!(out)?;
        render_hit(out, hit)?;
    }

    if !result.failed_repositories.is_empty() {
        writeln!(out)?;
        writeln!(
            out,
            "Failed repositories: {}",
            result.failed_repositories.join(", ")
        )?;
    }
    if !result.failed_organizations.is_empty() {
        writeln!(
            out,
            "Failed organizations: {}",
            result.failed_organizations.join(", ")
        )?;
    }
    Ok(())
}

fn render_hit<W: Write>(out: &mut W, hit: &SearchHit) -> io::Result<()> {
    writeln!(
        out,
        "{:>6.2}  {}  {}",
        hit.score, hit.repository.full_name, hit.file_path
    )?;
    writeln!(out, "        {}", hit.file_url)?;

    for snippet in &hit.matches {
        if snippet.line_number == 0 {
            writeln!(out, "        {}", snippet.text)?;
            continue;
        }
        for (line_number, line) in (snippet.context_start_line..).zip(snippet.text.lines()) {
            let marker = if line_number == snippet.line_number {
                '>'
            } else {
                ' '
            };
            writeln!(out, "      {marker}{line_number:>5} | {line}")?;
        }
    }
    Ok(())
}

/// Write one progress update
///
/// # Errors
/// Returns the writer's I/O errors
pub fn render_progress<W: Write>(
    out: &mut W,
    progress: &ProgressEvent,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, progress).map_err(to_io)?;
            writeln!(out)
        }
        OutputFormat::Text => writeln!(
            out,
            "[{}/{} {:>3}%] {}: {} new hits ({} so far)",
            progress.current,
            progress.total,
            progress.percent,
            progress.repository,
            progress.new_hits.len(),
            progress.total_hits_so_far
        ),
    }
}

/// Write a resolved repository list
///
/// # Errors
/// Returns the writer's I/O errors
pub fn render_repositories<W: Write>(
    out: &mut W,
    repositories: &[RepoRef],
    failed_organizations: &[String],
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            let document = serde_json::json!({
                "repositories": repositories,
                "failedOrganizations": failed_organizations,
            });
            serde_json::to_writer_pretty(&mut *out, &document).map_err(to_io)?;
            writeln!(out)
        }
        OutputFormat::Text => {
            for repo in repositories {
                let visibility = if repo.private { "private" } else { "public" };
                writeln!(
                    out,
                    "{:<50} {:<8} {}",
                    repo.full_name,
                    visibility,
                    repo.language.as_deref().unwrap_or("-")
                )?;
            }
            writeln!(out, "{} repositories", repositories.len())?;
            if !failed_organizations.is_empty() {
                writeln!(
                    out,
                    "Failed organizations: {}",
                    failed_organizations.join(", ")
                )?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use gitsecureops_search::{SearchScope, Snippet};

    fn result() -> SearchResult {
        SearchResult {
            query: "TODO".into(),
            scope: SearchScope::org("acme").unwrap(),
            total_results: 7,
            repositories_searched: 3,
            hits: vec![SearchHit {
                repository: RepoRef::new("acme", "api"),
                file_path: "src/lib.rs".into(),
                file_url: "https://github.com/acme/api/blob/abc/src/lib.rs".into(),
                sha: "abc".into(),
                matches: vec![Snippet {
                    line_number: 3,
                    text: "fn a() {}\n// TODO: b\nfn c() {}".into(),
                    match_line_offset: 1,
                    context_start_line: 2,
                    context_end_line: 4,
                }],
                score: 2.5,
            }],
            failed_repositories: vec!["acme/web".into()],
            failed_organizations: Vec::new(),
        }
    }

    #[test]
    fn text_marks_matching_line() {
        let mut out = Vec::new();
        render_result(&mut out, &result(), OutputFormat::Text).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Found 7 results in 3 repositories (showing 1)"));
        assert!(text.contains("  2.50  acme/api  src/lib.rs"));
        assert!(text.contains(">    3 | // TODO: b"));
        assert!(text.contains("     2 | fn a() {}"));
        assert!(text.contains("Failed repositories: acme/web"));
    }

    #[test]
    fn json_round_trips_result() {
        let mut out = Vec::new();
        render_result(&mut out, &result(), OutputFormat::Json).unwrap();
        let parsed: SearchResult = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, result());
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
