//! Citation extraction, inference, formatting, and hydration.
//!
//! Drafts cite code as `[path:start-end]` (preferred), `(path:start-end)`,
//! or bare `path.ext:start-end`. Extraction runs the three patterns in
//! that order, first match winning per `(path, start)` pair. When a draft
//! contains no parseable citation at all, citations are inferred from the
//! files and identifiers the draft mentions, matched against the retrieved
//! chunks.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::core::{Citation, SearchResult};

/// Snippet shown when the cited file cannot be read.
pub const SNIPPET_UNAVAILABLE: &str = "[Code snippet unavailable]";

/// Citations emitted when inference finds no mention match.
const FALLBACK_TOP_CHUNKS: usize = 5;

/// Reference previews are clipped to this many characters.
const REFERENCE_PREVIEW_CHARS: usize = 100;

/// Extensions recognized by the bare citation pattern.
const BARE_EXTENSIONS: &str = "py|js|ts|java|go|rs|cpp|c|h|tsx|jsx|md|txt";

fn bracket_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+?):(\d+)(?:-(\d+))?\]").expect("valid regex"))
}

fn paren_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([^)]+?):(\d+)(?:-(\d+))?\)").expect("valid regex"))
}

fn bare_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"([a-zA-Z0-9_/\\.-]+\.(?:{BARE_EXTENSIONS})):(\d+)(?:-(\d+))?"
        ))
        .expect("valid regex")
    })
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // camelCase and PascalCase words with at least one internal hump
    RE.get_or_init(|| Regex::new(r"\b[A-Za-z][a-z0-9]+(?:[A-Z][a-z0-9]+)+\b").expect("valid regex"))
}

fn pathlike_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9_][A-Za-z0-9_\-./\\]*\.[A-Za-z0-9]+").expect("valid regex")
    })
}

/// Parses citations from a draft answer.
///
/// Patterns run in order (bracket, parenthesis, bare); the first match for
/// each `(path, startLine)` wins. A missing end line collapses to the
/// start line.
#[must_use]
pub fn extract_citations(answer_text: &str) -> Vec<Citation> {
    let mut citations: Vec<Citation> = Vec::new();
    let mut seen: HashSet<(String, usize)> = HashSet::new();

    collect_pattern(bracket_re(), answer_text, &mut citations, &mut seen, false);
    collect_pattern(paren_re(), answer_text, &mut citations, &mut seen, false);
    collect_pattern(bare_re(), answer_text, &mut citations, &mut seen, true);

    citations
}

fn collect_pattern(
    re: &Regex,
    text: &str,
    citations: &mut Vec<Citation>,
    seen: &mut HashSet<(String, usize)>,
    check_terminator: bool,
) {
    for caps in re.captures_iter(text) {
        if check_terminator {
            // The bare pattern must end at whitespace, end of text, or
            // a closing punctuation mark.
            let end = caps.get(0).map_or(0, |m| m.end());
            let next = text[end..].chars().next();
            if !matches!(next, None | Some(' ' | '\t' | '\n' | '\r' | ',' | '.' | ';' | ')')) {
                continue;
            }
        }

        let file_path = caps[1].trim().to_string();
        let Ok(start_line) = caps[2].parse::<usize>() else {
            continue;
        };
        let end_line = caps.get(3).and_then(|m| m.as_str().parse::<usize>().ok());

        let key = (file_path.clone(), start_line);
        if seen.insert(key) {
            citations.push(Citation::new(file_path, start_line, end_line));
        }
    }
}

/// Formats a citation in the preferred wire format.
#[must_use]
pub fn format_citation(citation: &Citation) -> String {
    if citation.end_line > citation.start_line {
        format!(
            "[{}:{}-{}]",
            citation.file_path, citation.start_line, citation.end_line
        )
    } else {
        format!("[{}:{}]", citation.file_path, citation.start_line)
    }
}

/// Infers citations when extraction found none.
///
/// Collects the paths, filenames, and camelCase/PascalCase identifiers the
/// draft mentions, and cites every retrieved chunk they match. Falls back
/// to the top retrieved chunks when nothing matches.
#[must_use]
pub fn infer_citations(answer_text: &str, retrieved_chunks: &[SearchResult]) -> Vec<Citation> {
    if retrieved_chunks.is_empty() {
        return Vec::new();
    }

    let mentions: HashSet<String> = pathlike_re()
        .find_iter(answer_text)
        .map(|m| m.as_str().to_string())
        .collect();
    let identifiers: HashSet<String> = identifier_re()
        .find_iter(answer_text)
        .map(|m| m.as_str().to_lowercase())
        .collect();

    let mut citations = Vec::new();
    let mut seen: HashSet<(String, usize)> = HashSet::new();

    for chunk in retrieved_chunks {
        if chunk_is_mentioned(chunk, &mentions, &identifiers) {
            let key = (chunk.file_path.clone(), chunk.start_line);
            if seen.insert(key) {
                citations.push(Citation::new(
                    chunk.file_path.clone(),
                    chunk.start_line,
                    Some(chunk.end_line),
                ));
            }
        }
    }

    if citations.is_empty() {
        debug!("no mention matches; citing top retrieved chunks");
        for chunk in retrieved_chunks.iter().take(FALLBACK_TOP_CHUNKS) {
            let key = (chunk.file_path.clone(), chunk.start_line);
            if seen.insert(key) {
                citations.push(Citation::new(
                    chunk.file_path.clone(),
                    chunk.start_line,
                    Some(chunk.end_line),
                ));
            }
        }
    }

    citations
}

fn chunk_is_mentioned(
    chunk: &SearchResult,
    mentions: &HashSet<String>,
    identifiers: &HashSet<String>,
) -> bool {
    let path = &chunk.file_path;
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let stem = file_name.split('.').next().unwrap_or(file_name);

    for mention in mentions {
        if mention == path
            || path.ends_with(mention)
            || mention.ends_with(file_name)
            || mention == file_name
        {
            return true;
        }
    }

    let stem_lower = stem.to_lowercase();
    stem_lower.len() > 2
        && identifiers
            .iter()
            .any(|id| *id == stem_lower || id.contains(&stem_lower))
}

/// Reads the cited source span for every citation.
///
/// The span is sliced from the file under `repo_root`, truncated to
/// `snippet_length` characters with a trailing ellipsis. Unreadable files
/// yield [`SNIPPET_UNAVAILABLE`].
#[must_use]
pub fn hydrate_citations(
    citations: Vec<Citation>,
    repo_root: &Path,
    snippet_length: usize,
) -> Vec<Citation> {
    citations
        .into_iter()
        .map(|mut citation| {
            citation.text_snippet =
                read_span(repo_root, &citation.file_path, citation.start_line, citation.end_line)
                    .map_or_else(
                        || SNIPPET_UNAVAILABLE.to_string(),
                        |snippet| clip_chars(&snippet, snippet_length),
                    );
            citation
        })
        .collect()
}

fn read_span(repo_root: &Path, file_path: &str, start_line: usize, end_line: usize) -> Option<String> {
    let content = std::fs::read_to_string(repo_root.join(file_path)).ok()?;
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() || start_line == 0 {
        return None;
    }
    let start = start_line.min(lines.len()) - 1;
    let end = end_line.min(lines.len());
    if start >= end {
        return None;
    }
    Some(lines[start..end].join("\n"))
}

fn clip_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let clipped: String = text.chars().take(max_chars).collect();
        format!("{clipped}...")
    }
}

/// Formats the reference section, grouped by file with per-file line
/// ranges and a short preview of the first cited span.
#[must_use]
pub fn format_references(citations: &[Citation]) -> String {
    if citations.is_empty() {
        return String::new();
    }

    let mut by_file: BTreeMap<&str, Vec<&Citation>> = BTreeMap::new();
    for citation in citations {
        by_file.entry(&citation.file_path).or_default().push(citation);
    }

    let mut section = String::from("\n\n### References:\n");
    for (i, (file, cites)) in by_file.iter().enumerate() {
        let ranges = cites
            .iter()
            .map(|c| {
                if c.end_line > c.start_line {
                    format!("{}-{}", c.start_line, c.end_line)
                } else {
                    c.start_line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        section.push_str(&format!("\n{}. `{}` (lines {})", i + 1, file, ranges));

        if let Some(first) = cites.iter().find(|c| {
            !c.text_snippet.is_empty() && c.text_snippet != SNIPPET_UNAVAILABLE
        }) {
            let preview = clip_chars(first.text_snippet.trim(), REFERENCE_PREVIEW_CHARS)
                .replace('\n', " ");
            section.push_str(&format!("\n   > {preview}"));
        }
    }

    section
}
