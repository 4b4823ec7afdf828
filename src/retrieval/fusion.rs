//! Score fusion, reranking, and span deduplication.
//!
//! Vector and lexical hits are merged into one map keyed by chunk id with
//! weighted contributions and rank boosts; chunks found by both branches
//! gain a co-occurrence bonus. Reranking then applies multi-term,
//! file-type, and path-depth adjustments before overlapping spans are
//! deduplicated.

use std::collections::HashMap;

use regex::Regex;

use crate::config::Config;
use crate::core::{SearchResult, SearchSource};
use crate::tables::{is_doc_file, is_test_file};

/// Lexical rank boosts are scaled down to two thirds of the vector factor.
const LEXICAL_RANK_SCALE: f64 = 0.67;

/// Bonus when both branches return the same chunk.
const CO_OCCURRENCE_BONUS: f64 = 0.3;

/// Lexical raw scores are normalized by this divisor before weighting.
const LEXICAL_SCORE_DIVISOR: f64 = 10.0;

/// Question words that disable the test/doc file penalties.
const TEST_INTENT_WORDS: &[&str] = &["test", "spec", "example", "sample"];

/// Merges vector and lexical results, reranks, and deduplicates.
///
/// Returns at most `k` results in descending `combined_score` order.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn merge_and_rerank(
    vector_results: Vec<SearchResult>,
    lexical_results: Vec<SearchResult>,
    k: usize,
    query_keywords: &[String],
    original_question: Option<&str>,
    config: &Config,
) -> Vec<SearchResult> {
    let mut order: Vec<String> = Vec::new();
    let mut by_id: HashMap<String, SearchResult> = HashMap::new();

    let vector_len = vector_results.len();
    for (rank, mut result) in vector_results.into_iter().enumerate() {
        let similarity = result.vector_score.unwrap_or(0.5);
        let rank_boost =
            (vector_len - rank) as f64 / vector_len as f64 * config.rank_boost_factor;
        result.combined_score = similarity * config.vector_weight + rank_boost;
        result.sources = vec![SearchSource::Vector];
        order.push(result.chunk_id.clone());
        by_id.insert(result.chunk_id.clone(), result);
    }

    let lexical_len = lexical_results.len();
    for (rank, result) in lexical_results.into_iter().enumerate() {
        let raw = result.lexical_score.unwrap_or(0.3);
        let normalized = (raw / LEXICAL_SCORE_DIVISOR).min(1.0) * config.lexical_weight;
        let rank_boost = (lexical_len - rank) as f64 / lexical_len as f64
            * (config.rank_boost_factor * LEXICAL_RANK_SCALE);

        if let Some(existing) = by_id.get_mut(&result.chunk_id) {
            existing.combined_score += normalized + rank_boost + CO_OCCURRENCE_BONUS;
            existing.add_source(SearchSource::Lexical);
            if existing.lexical_score.is_none() {
                existing.lexical_score = result.lexical_score;
            }
        } else {
            let mut result = result;
            result.combined_score = normalized + rank_boost;
            result.sources = vec![SearchSource::Lexical];
            order.push(result.chunk_id.clone());
            by_id.insert(result.chunk_id.clone(), result);
        }
    }

    let mut results: Vec<SearchResult> = order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect();

    for result in &mut results {
        apply_rerank_boosts(result, query_keywords, original_question, config);
    }

    results.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    dedup_by_file_span(results, config.overlap_threshold, k)
}

/// Applies multi-term, file-type, and path-depth adjustments in place.
#[allow(clippy::cast_precision_loss)]
pub fn apply_rerank_boosts(
    result: &mut SearchResult,
    query_keywords: &[String],
    original_question: Option<&str>,
    config: &Config,
) {
    // Multi-term boost: each whole-word keyword match beyond the first
    if query_keywords.len() > 1 {
        let matches = count_keyword_matches(&result.text, query_keywords);
        if matches > 1 {
            result.combined_score += (matches - 1) as f64 * config.multi_term_match_boost;
        }
    }

    // File-type penalties, unless the question itself asks about tests
    if !query_keywords.is_empty() && !result.file_path.is_empty() {
        let implementation_query = original_question.is_some_and(|q| {
            let q = q.to_lowercase();
            !TEST_INTENT_WORDS.iter().any(|w| q.contains(w))
        });
        if implementation_query {
            if is_test_file(&result.file_path) {
                result.combined_score += config.test_file_penalty;
            } else if is_doc_file(&result.file_path) {
                result.combined_score += config.doc_file_penalty;
            }
        }
    }

    // Path-depth boost: shallower files are more likely entry points
    if !result.file_path.is_empty() {
        let depth = path_depth(&result.file_path);
        if depth <= 3 {
            result.combined_score += (3 - depth) as f64 * config.path_depth_boost;
        }
    }
}

/// Number of directories above the file; root-level files have depth 0.
#[must_use]
pub fn path_depth(file_path: &str) -> usize {
    let normalized = file_path.replace('\\', "/");
    let parts = normalized.split('/').filter(|p| !p.is_empty()).count();
    parts.saturating_sub(1)
}

/// Counts how many keywords appear as whole words in the text.
#[must_use]
pub fn count_keyword_matches(text: &str, keywords: &[String]) -> usize {
    if text.is_empty() || keywords.is_empty() {
        return 0;
    }

    let text_lower = text.to_lowercase();
    keywords
        .iter()
        .filter(|keyword| {
            let pattern = format!(r"\b{}\b", regex::escape(&keyword.to_lowercase()));
            Regex::new(&pattern)
                .map(|re| re.is_match(&text_lower))
                .unwrap_or(false)
        })
        .count()
}

/// Drops chunks whose span mostly overlaps a better-scored chunk in the
/// same file.
///
/// Iterates in descending score order; a candidate is dropped when the
/// overlap with any kept chunk in the same file exceeds
/// `overlap_threshold` of the candidate's own span. At most `max_chunks`
/// results are kept.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn dedup_by_file_span(
    results: Vec<SearchResult>,
    overlap_threshold: f64,
    max_chunks: usize,
) -> Vec<SearchResult> {
    let mut kept: Vec<SearchResult> = Vec::new();
    let mut file_spans: HashMap<String, Vec<(usize, usize)>> = HashMap::new();

    for result in results {
        if kept.len() >= max_chunks {
            break;
        }

        if result.file_path.is_empty() {
            kept.push(result);
            continue;
        }

        let start = result.start_line;
        let end = result.end_line;
        let spans = file_spans.entry(result.file_path.clone()).or_default();

        let span_size = end.saturating_sub(start);
        let overlaps = spans.iter().any(|&(kept_start, kept_end)| {
            let overlap_start = start.max(kept_start);
            let overlap_end = end.min(kept_end);
            let overlap_size = overlap_end.saturating_sub(overlap_start);
            span_size > 0 && overlap_size as f64 / span_size as f64 > overlap_threshold
        });

        if !overlaps {
            spans.push((start, end));
            kept.push(result);
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(chunk_id: &str, file: &str, start: usize, end: usize) -> SearchResult {
        SearchResult {
            chunk_id: chunk_id.to_string(),
            text: String::new(),
            file_path: file.to_string(),
            start_line: start,
            end_line: end,
            symbol_name: None,
            sources: Vec::new(),
            vector_score: None,
            lexical_score: None,
            combined_score: 0.0,
            query_sources: Vec::new(),
        }
    }

    fn vector_hit(chunk_id: &str, score: f64) -> SearchResult {
        let mut r = result(chunk_id, "src/a.py", 1, 10);
        r.vector_score = Some(score);
        r.sources = vec![SearchSource::Vector];
        r
    }

    fn lexical_hit(chunk_id: &str, score: f64) -> SearchResult {
        let mut r = result(chunk_id, "src/b.py", 20, 30);
        r.chunk_id = chunk_id.to_string();
        r.lexical_score = Some(score);
        r.sources = vec![SearchSource::Lexical];
        r
    }

    #[test]
    fn test_co_occurrence_wins() {
        // c1 in both branches, c2 vector only, c3 lexical only
        let vector = vec![vector_hit("c1", 0.9), vector_hit("c2", 0.7)];
        let mut lex1 = lexical_hit("c1", 5.0);
        lex1.file_path = "src/a.py".to_string();
        lex1.start_line = 1;
        lex1.end_line = 10;
        let lexical = vec![lex1, lexical_hit("c3", 3.0)];

        let merged = merge_and_rerank(vector, lexical, 12, &[], None, &Config::default());

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].chunk_id, "c1");
        assert!(merged[0].is_multi_source());
    }

    #[test]
    fn test_fused_score_exceeds_either_branch_alone() {
        let config = Config::default();

        let vector_only =
            merge_and_rerank(vec![vector_hit("c1", 0.9)], vec![], 12, &[], None, &config);
        let mut lex = lexical_hit("c1", 5.0);
        lex.file_path = "src/a.py".to_string();
        lex.start_line = 1;
        lex.end_line = 10;
        let lexical_only = merge_and_rerank(vec![], vec![lex.clone()], 12, &[], None, &config);
        let both = merge_and_rerank(vec![vector_hit("c1", 0.9)], vec![lex], 12, &[], None, &config);

        assert!(both[0].combined_score > vector_only[0].combined_score);
        assert!(both[0].combined_score > lexical_only[0].combined_score);
    }

    #[test]
    fn test_lexical_score_normalized_and_capped() {
        let config = Config::default();
        let huge = merge_and_rerank(vec![], vec![lexical_hit("c1", 500.0)], 12, &[], None, &config);
        let moderate =
            merge_and_rerank(vec![], vec![lexical_hit("c2", 10.0)], 12, &[], None, &config);
        // Both cap at lexical_weight + rank boost, so scores match
        assert!((huge[0].combined_score - moderate[0].combined_score).abs() < 1e-9);
    }

    #[test]
    fn test_multi_term_boost() {
        let config = Config::default();
        let keywords = vec!["token".to_string(), "session".to_string(), "expiry".to_string()];

        let mut hit = result("c1", "src/auth.py", 1, 10);
        hit.text = "validates the token and checks session expiry".to_string();
        let base = hit.combined_score;
        apply_rerank_boosts(&mut hit, &keywords, None, &config);

        // 3 matches: 2 additional * 0.15, plus depth boost (depth 1 -> 0.1)
        let expected = base + 2.0 * 0.15 + 2.0 * 0.05;
        assert!((hit.combined_score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_whole_word_matching_only() {
        assert_eq!(
            count_keyword_matches("tokenizer stream", &["token".to_string()]),
            0
        );
        assert_eq!(
            count_keyword_matches("the token expired", &["token".to_string()]),
            1
        );
    }

    #[test]
    fn test_test_file_penalty_for_implementation_question() {
        let config = Config::default();
        let keywords = vec!["auth".to_string()];

        let mut test_hit = result("c1", "tests/test_auth.py", 1, 10);
        apply_rerank_boosts(&mut test_hit, &keywords, Some("How is auth implemented"), &config);

        let mut impl_hit = result("c2", "core/auth_core.py", 1, 10);
        apply_rerank_boosts(&mut impl_hit, &keywords, Some("How is auth implemented"), &config);

        assert!(test_hit.combined_score < impl_hit.combined_score);
    }

    #[test]
    fn test_no_penalty_when_question_is_about_tests() {
        let config = Config::default();
        let keywords = vec!["auth".to_string()];

        let mut hit = result("c1", "tests/test_auth.py", 1, 10);
        let base = hit.combined_score;
        apply_rerank_boosts(&mut hit, &keywords, Some("Where are the auth tests"), &config);

        // Only the depth boost applies (depth 1)
        assert!((hit.combined_score - (base + 2.0 * 0.05)).abs() < 1e-9);
    }

    #[test]
    fn test_doc_file_penalty_smaller_than_test_penalty() {
        let config = Config::default();
        let keywords = vec!["install".to_string()];

        let mut doc_hit = result("c1", "README.md", 1, 10);
        apply_rerank_boosts(&mut doc_hit, &keywords, Some("How does install work"), &config);
        let mut test_hit = result("c2", "test_install.py", 1, 10);
        apply_rerank_boosts(&mut test_hit, &keywords, Some("How does install work"), &config);

        assert!(doc_hit.combined_score > test_hit.combined_score);
    }

    #[test]
    fn test_path_depth() {
        assert_eq!(path_depth("main.py"), 0);
        assert_eq!(path_depth("src/main.py"), 1);
        assert_eq!(path_depth("src/core/deep/main.py"), 3);
        assert_eq!(path_depth("src\\core\\main.py"), 2);
    }

    #[test]
    fn test_depth_boost_clamped_at_three() {
        let config = Config::default();
        let mut deep = result("c1", "a/b/c/d/e/f.py", 1, 10);
        let base = deep.combined_score;
        apply_rerank_boosts(&mut deep, &[], None, &config);
        assert!((deep.combined_score - base).abs() < 1e-9);
    }

    #[test]
    fn test_dedup_overlapping_spans() {
        // Descending score order: [1-50], [10-60], [100-150], [40-55]
        let results = vec![
            result("c1", "file.py", 1, 50),
            result("c2", "file.py", 10, 60),
            result("c3", "file.py", 100, 150),
            result("c4", "file.py", 40, 55),
        ];

        let kept = dedup_by_file_span(results, 0.5, 12);
        let ids: Vec<&str> = kept.iter().map(|r| r.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);
    }

    #[test]
    fn test_dedup_different_files_kept() {
        let results = vec![
            result("c1", "a.py", 1, 50),
            result("c2", "b.py", 1, 50),
        ];
        let kept = dedup_by_file_span(results, 0.5, 12);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_dedup_caps_at_max() {
        let results: Vec<SearchResult> = (0..20)
            .map(|i| result(&format!("c{i}"), &format!("f{i}.py"), 1, 10))
            .collect();
        let kept = dedup_by_file_span(results, 0.5, 5);
        assert_eq!(kept.len(), 5);
    }

    #[test]
    fn test_merge_caps_at_k() {
        let config = Config::default();
        let vector: Vec<SearchResult> = (0..20)
            .map(|i| {
                let mut r = result(&format!("c{i}"), &format!("f{i}.py"), 1, 10);
                r.vector_score = Some(0.5);
                r
            })
            .collect();
        let merged = merge_and_rerank(vector, vec![], 12, &[], None, &config);
        assert_eq!(merged.len(), 12);
    }
}
