//! Context packing: fit retrieved chunks into the synthesizer's token
//! budget while keeping the lines most likely to carry the answer.
//!
//! Chunks are prioritized by retrieval score and structural signals, then
//! packed greedily. When the next chunk no longer fits whole, it is
//! truncated around its important lines (definitions, docstrings, returns,
//! question-term lines) instead of being dropped.

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::Config;
use crate::core::{SearchResult, SearchSource};
use crate::retrieval::keywords::shared_long_tokens;
use crate::tables::{is_doc_file, is_key_file, is_test_file};
use crate::tokens::count_tokens;

/// Marker appended to a chunk whose middle was cut.
pub const TRUNCATION_MARKER: &str = "# ... [truncated for context window] ...";

/// Packing stops once this fraction of the budget is used.
const BUDGET_STOP_FRACTION: f64 = 0.95;

/// Question prefixes that mark an implementation-seeking question.
const IMPLEMENTATION_PREFIXES: &[&str] = &["how", "where", "what", "implement"];

/// Line prefixes that begin a definition in the supported languages.
const DEFINITION_PREFIXES: &[&str] = &[
    "def ", "async def ", "class ", "fn ", "pub fn ", "function ", "func ",
];

/// Line prefixes that begin an import.
const IMPORT_PREFIXES: &[&str] = &["import ", "from ", "use "];

/// Imports are only important near the top of a chunk.
const IMPORT_HEAD_LINES: usize = 20;

/// A chunk selected for the synthesizer context.
#[derive(Debug, Clone)]
pub struct PackedChunk {
    /// The chunk, with `text` possibly truncated.
    pub result: SearchResult,
    /// Whether the text was truncated to fit.
    pub truncated: bool,
    /// Token count before truncation.
    pub original_tokens: usize,
    /// Token count of the packed text.
    pub packed_tokens: usize,
}

/// Selects and truncates chunks to fit the configured context budget.
///
/// Output is ordered by priority, and the sum of packed token counts never
/// exceeds `context_window_size - reserve_prompt_tokens -
/// reserve_response_tokens`.
#[must_use]
pub fn pack_chunks(
    chunks: &[SearchResult],
    question: Option<&str>,
    config: &Config,
) -> Vec<PackedChunk> {
    if chunks.is_empty() {
        return Vec::new();
    }

    let budget = config.context_budget();

    let mut prioritized: Vec<(f64, &SearchResult)> = chunks
        .iter()
        .map(|chunk| (priority_score(chunk, question), chunk))
        .collect();
    prioritized.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let total: usize = prioritized
        .iter()
        .map(|(_, c)| count_tokens(&c.text))
        .sum();

    if total <= budget {
        return prioritized
            .into_iter()
            .map(|(_, chunk)| {
                let tokens = count_tokens(&chunk.text);
                PackedChunk {
                    result: chunk.clone(),
                    truncated: false,
                    original_tokens: tokens,
                    packed_tokens: tokens,
                }
            })
            .collect();
    }

    let mut packed: Vec<PackedChunk> = Vec::new();
    let mut used = 0usize;

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let stop_at = (budget as f64 * BUDGET_STOP_FRACTION) as usize;

    for (_, chunk) in prioritized {
        let chunk_tokens = count_tokens(&chunk.text);

        if used + chunk_tokens <= budget {
            packed.push(PackedChunk {
                result: chunk.clone(),
                truncated: false,
                original_tokens: chunk_tokens,
                packed_tokens: chunk_tokens,
            });
            used += chunk_tokens;
        } else {
            let remaining = budget - used;
            if remaining < config.min_chunk_tokens_after_truncation {
                break;
            }
            if let Some(truncated) = truncate_to_fit(chunk, remaining, question) {
                used += truncated.packed_tokens;
                packed.push(truncated);
            }
            if used >= stop_at {
                break;
            }
        }
    }

    debug!(
        selected = packed.len(),
        candidates = chunks.len(),
        used_tokens = used,
        budget,
        "context packing"
    );
    packed
}

/// Priority score of a chunk for packing.
#[must_use]
pub fn priority_score(chunk: &SearchResult, question: Option<&str>) -> f64 {
    let mut score = 0.0;

    if chunk.combined_score > 0.0 {
        score += chunk.combined_score * 10.0;
    }
    if chunk.sources.len() > 1 {
        score += 2.0;
    }

    let file_name = chunk
        .file_path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(chunk.file_path.as_str());
    if is_key_file(file_name) {
        score += 1.5;
    }
    if chunk.symbol_name.is_some() {
        score += 1.0;
    }
    if chunk.sources.contains(&SearchSource::Vector) {
        score += chunk.vector_score.unwrap_or(0.0) * 5.0;
    }

    if let Some(question) = question {
        let question_lower = question.to_lowercase();
        if IMPLEMENTATION_PREFIXES
            .iter()
            .any(|p| question_lower.starts_with(p))
        {
            if is_test_file(&chunk.file_path) {
                score -= 0.5;
            } else if is_doc_file(&chunk.file_path) {
                score -= 0.3;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let overlap = shared_long_tokens(question, &chunk.text) as f64;
        score += overlap * 0.2;
    }

    score
}

/// Truncates a chunk to at most `max_tokens`, preserving important lines.
///
/// Pass 1 takes the important lines in order; pass 2 adds up to two lines
/// of context around each; pass 3 fills with the remaining lines in
/// original order. Returns `None` for empty chunks.
#[must_use]
pub fn truncate_to_fit(
    chunk: &SearchResult,
    max_tokens: usize,
    question: Option<&str>,
) -> Option<PackedChunk> {
    if chunk.text.is_empty() {
        return None;
    }

    let original_tokens = count_tokens(&chunk.text);
    if original_tokens <= max_tokens {
        return Some(PackedChunk {
            result: chunk.clone(),
            truncated: false,
            original_tokens,
            packed_tokens: original_tokens,
        });
    }

    let lines: Vec<&str> = chunk.text.lines().collect();
    let important = important_lines(&lines, question);

    // The truncation marker is part of the packed text, so its tokens come
    // out of the budget up front.
    let max_tokens = max_tokens.saturating_sub(count_tokens(TRUNCATION_MARKER));

    let mut added: BTreeSet<usize> = BTreeSet::new();
    let mut used = 0usize;

    // Pass 1: important lines in order
    for &idx in &important {
        let tokens = count_tokens(lines[idx]);
        if used + tokens <= max_tokens {
            added.insert(idx);
            used += tokens;
        }
    }

    // Pass 2: up to two lines of context before and after each
    for &idx in &important {
        for i in idx.saturating_sub(2)..idx {
            if !added.contains(&i) {
                let tokens = count_tokens(lines[i]);
                if used + tokens <= max_tokens {
                    added.insert(i);
                    used += tokens;
                }
            }
        }
        for i in (idx + 1)..lines.len().min(idx + 3) {
            if !added.contains(&i) {
                let tokens = count_tokens(lines[i]);
                if used + tokens <= max_tokens {
                    added.insert(i);
                    used += tokens;
                }
            }
        }
    }

    // Pass 3: remaining lines in original order
    for (i, line) in lines.iter().enumerate() {
        if !added.contains(&i) {
            let tokens = count_tokens(line);
            if used + tokens > max_tokens {
                break;
            }
            added.insert(i);
            used += tokens;
        }
    }

    let mut text: String = added
        .iter()
        .map(|&i| lines[i])
        .collect::<Vec<_>>()
        .join("\n");
    if added.len() < lines.len() {
        text.push('\n');
        text.push_str(TRUNCATION_MARKER);
    }

    let packed_tokens = count_tokens(&text);
    let mut result = chunk.clone();
    result.text = text;

    Some(PackedChunk {
        result,
        truncated: true,
        original_tokens,
        packed_tokens,
    })
}

/// Indices of lines worth preserving during truncation.
fn important_lines(lines: &[&str], question: Option<&str>) -> Vec<usize> {
    let mut important: BTreeSet<usize> = BTreeSet::new();

    for (i, line) in lines.iter().enumerate() {
        let stripped = line.trim();

        if DEFINITION_PREFIXES.iter().any(|p| stripped.starts_with(p)) {
            important.insert(i);
        }
        if stripped.contains("\"\"\"") || stripped.contains("'''") {
            important.insert(i);
        }
        if stripped.starts_with("return ") || stripped == "return" {
            important.insert(i);
        }
        if i < IMPORT_HEAD_LINES && IMPORT_PREFIXES.iter().any(|p| stripped.starts_with(p)) {
            important.insert(i);
        }
        if stripped.starts_with('@') {
            important.insert(i);
        }
        if let Some(question) = question {
            if shared_long_tokens(question, stripped) > 0 {
                important.insert(i);
            }
        }
    }

    if !lines.is_empty() {
        important.insert(0);
        important.insert(lines.len() - 1);
    }

    important.into_iter().collect()
}
