//! Query strategist: multi-query expansion and adaptive rewriting.
//!
//! Turns one question into a small set of diverse search queries. The
//! oracle proposes rephrasings when available; rule-based variations top
//! up the set so the strategist works (and stays deterministic) without
//! it. On follow-up iterations, gap-filling queries are derived from what
//! retrieval already found.

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::ANALYTIC_TEMPERATURE;
use crate::core::SearchResult;
use crate::oracle::{json, Oracle};
use crate::retrieval::extract_keywords;

/// Minimum length of an accepted oracle-generated variation.
const MIN_VARIATION_LEN: usize = 6;

/// Chunk text prefix scanned for keywords during adaptive rewriting.
const REWRITE_SCAN_CHARS: usize = 500;

/// Technical suffixes appended by the rule-based generator.
const TECH_CONTEXTS: &[&str] = &["function", "class", "module", "handler", "service"];

/// Interrogative prefixes stripped to form a declarative search.
const INTERROGATIVES: &[&str] = &["how", "what", "where", "when", "why", "which", "who"];

/// Generates up to `num_variations` diverse queries, always including the
/// original question first.
///
/// Oracle-generated rephrasings are preferred; rule-based variations fill
/// the remainder. Duplicates are dropped case-insensitively.
pub async fn generate_query_variations(
    oracle: Option<&dyn Oracle>,
    question: &str,
    num_variations: usize,
) -> Vec<String> {
    if question.trim().is_empty() {
        return vec![question.to_string()];
    }

    let mut variations = vec![question.to_string()];

    if let Some(oracle) = oracle {
        if num_variations > 1 {
            let generated = oracle_variations(oracle, question, num_variations - 1).await;
            variations.extend(generated);
        }
    }

    if variations.len() < num_variations {
        let remaining = num_variations - variations.len();
        variations.extend(rule_based_variations(question, remaining));
    }

    let deduped = dedup_case_insensitive(variations);
    let mut result = deduped;
    result.truncate(num_variations);
    debug!(question, count = result.len(), "query variations");
    result
}

async fn oracle_variations(oracle: &dyn Oracle, question: &str, count: usize) -> Vec<String> {
    let prompt = variation_prompt(question, count);
    let Ok(response) = oracle.complete(&prompt, ANALYTIC_TEMPERATURE).await else {
        return Vec::new();
    };

    json::extract_string_array(&response)
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| v.len() >= MIN_VARIATION_LEN)
        .take(count)
        .collect()
}

fn variation_prompt(question: &str, count: usize) -> String {
    format!(
        r#"Generate {count} diverse search query variations for this question about code.

Original Question: {question}

Create queries that:
1. Use different phrasings and synonyms
2. Explore different aspects or angles
3. Vary specificity (some more general, some more specific)
4. Use technical terminology vs. plain language
5. Focus on different components (functions, classes, patterns, etc.)

OUTPUT FORMAT: Output ONLY a valid JSON array of strings:
["query variation 1", "query variation 2", ...]"#
    )
}

/// Deterministic query variations derived from the question alone.
#[must_use]
pub fn rule_based_variations(question: &str, num_variations: usize) -> Vec<String> {
    if num_variations == 0 {
        return Vec::new();
    }

    let question_lower = question.to_lowercase();
    let mut variations: Vec<String> = Vec::new();

    // Implementation-focused forms for how/where/what questions
    if ["how", "where", "what"].iter().any(|w| question_lower.contains(w))
        && !question_lower.contains("implementation")
        && !question_lower.contains("code")
    {
        variations.push(format!("{question} implementation"));
        variations.push(format!("{question} code"));
    }

    // Keyword-fronted forms
    let keywords = extract_keywords(question, false);
    for keyword in keywords.iter().take(3) {
        if !question_lower.contains(keyword.as_str()) {
            variations.push(format!("{keyword} {question}"));
        }
    }

    // Technical-context suffixes
    for context in TECH_CONTEXTS {
        if variations.len() >= num_variations {
            break;
        }
        if !question_lower.contains(context) {
            variations.push(format!("{question} {context}"));
        }
    }

    // Declarative form
    let simplified = simplify_question(question);
    if !simplified.is_empty() && simplified.to_lowercase() != question_lower {
        variations.push(simplified);
    }

    let mut unique = Vec::new();
    let mut seen = BTreeSet::new();
    for v in variations {
        let key = v.to_lowercase();
        if key != question_lower && seen.insert(key) {
            unique.push(v);
        }
    }
    unique.truncate(num_variations);
    unique
}

/// Strips leading interrogatives and auxiliaries to form a declarative
/// search query.
#[must_use]
pub fn simplify_question(question: &str) -> String {
    let mut simplified = question.trim().trim_end_matches('?').trim();

    for word in INTERROGATIVES {
        if let Some(rest) = strip_leading_word(simplified, word) {
            simplified = rest;
            break;
        }
    }
    for word in ["is", "are", "does", "do"] {
        if let Some(rest) = strip_leading_word(simplified, word) {
            simplified = rest;
            break;
        }
    }

    simplified.trim().to_string()
}

fn strip_leading_word<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let lower = text.to_lowercase();
    if lower.starts_with(word) {
        let rest = &text[word.len()..];
        if rest.starts_with(' ') {
            return Some(rest.trim_start());
        }
    }
    None
}

/// Generates gap-filling queries from what previous iterations retrieved.
///
/// Derives found filenames, symbols, and chunk keywords, appends them to
/// the question, and asks the oracle to fill any remainder. Returns at
/// most `max_new_queries` queries.
pub async fn rewrite_queries_from_results(
    oracle: Option<&dyn Oracle>,
    original_queries: &[String],
    retrieved_chunks: &[SearchResult],
    question: &str,
    max_new_queries: usize,
) -> Vec<String> {
    if retrieved_chunks.is_empty() || max_new_queries == 0 {
        return Vec::new();
    }

    let question_lower = question.to_lowercase();

    let mut found_files: BTreeSet<String> = BTreeSet::new();
    let mut found_symbols: BTreeSet<String> = BTreeSet::new();
    let mut found_keywords: BTreeSet<String> = BTreeSet::new();

    for chunk in retrieved_chunks {
        if let Some(name) = chunk.file_path.rsplit(['/', '\\']).next() {
            if !name.is_empty() {
                found_files.insert(name.to_string());
            }
        }
        if let Some(symbol) = &chunk.symbol_name {
            found_symbols.insert(symbol.clone());
        }
        let prefix: String = chunk.text.chars().take(REWRITE_SCAN_CHARS).collect();
        for keyword in extract_keywords(&prefix, false).into_iter().take(5) {
            found_keywords.insert(keyword);
        }
    }

    let mut new_queries: Vec<String> = Vec::new();

    // Related-module forms from found filenames
    for file in found_files.iter().take(2) {
        let base = file.split('.').next().unwrap_or(file);
        if !base.is_empty() && !question_lower.contains(&base.to_lowercase()) {
            new_queries.push(format!("{question} {base} related"));
        }
    }

    // Found-symbol forms
    for symbol in found_symbols.iter().take(2) {
        if new_queries.len() >= max_new_queries {
            break;
        }
        if !question_lower.contains(&symbol.to_lowercase()) {
            new_queries.push(format!("{question} {symbol}"));
        }
    }

    // Found-keyword forms
    for keyword in found_keywords.iter().take(3) {
        if new_queries.len() >= max_new_queries {
            break;
        }
        if keyword.len() > 3 && !question_lower.contains(keyword.as_str()) {
            new_queries.push(format!("{question} {keyword}"));
        }
    }

    // Oracle gap-filling for the remainder
    if new_queries.len() < max_new_queries {
        if let Some(oracle) = oracle {
            let remaining = max_new_queries - new_queries.len();
            let prompt = gap_prompt(
                question,
                original_queries,
                &found_files,
                &found_symbols,
                remaining,
            );
            if let Ok(response) = oracle.complete(&prompt, ANALYTIC_TEMPERATURE).await {
                new_queries.extend(
                    json::extract_string_array(&response)
                        .into_iter()
                        .map(|q| q.trim().to_string())
                        .filter(|q| !q.is_empty())
                        .take(remaining),
                );
            }
        }
    }

    let mut result = dedup_case_insensitive(new_queries);
    result.truncate(max_new_queries);
    debug!(question, count = result.len(), "adaptive rewrite");
    result
}

fn gap_prompt(
    question: &str,
    original_queries: &[String],
    found_files: &BTreeSet<String>,
    found_symbols: &BTreeSet<String>,
    count: usize,
) -> String {
    let files: Vec<&str> = found_files.iter().take(5).map(String::as_str).collect();
    let symbols: Vec<&str> = found_symbols.iter().take(5).map(String::as_str).collect();
    let used: Vec<&str> = original_queries.iter().take(3).map(String::as_str).collect();

    format!(
        r#"Generate {count} new search queries to find additional relevant code.

Original Question: {question}
Queries Already Used: {}
Files Found: {}
Symbols Found: {}

Create queries that:
1. Explore related areas not yet covered
2. Use different terminology or synonyms
3. Focus on complementary aspects

OUTPUT FORMAT: Output ONLY a valid JSON array:
["new query 1", "new query 2", ...]"#,
        if used.is_empty() { "none".to_string() } else { used.join(", ") },
        if files.is_empty() { "none".to_string() } else { files.join(", ") },
        if symbols.is_empty() { "none".to_string() } else { symbols.join(", ") },
    )
}

/// Deduplicates queries case-insensitively, preserving first occurrence
/// order.
#[must_use]
pub fn dedup_case_insensitive(queries: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    queries
        .into_iter()
        .filter(|q| {
            let key = q.trim().to_lowercase();
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SearchSource;
    use crate::error::OracleError;
    use async_trait::async_trait;

    /// Oracle that returns a fixed response.
    struct FixedOracle(String);

    #[async_trait]
    impl Oracle for FixedOracle {
        async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String, OracleError> {
            Ok(self.0.clone())
        }
    }

    /// Oracle that always fails.
    struct FailingOracle;

    #[async_trait]
    impl Oracle for FailingOracle {
        async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String, OracleError> {
            Err(OracleError::Request("unavailable".to_string()))
        }
    }

    fn chunk_result(file: &str, symbol: Option<&str>, text: &str) -> SearchResult {
        SearchResult {
            chunk_id: format!("r:{file}:1:10"),
            text: text.to_string(),
            file_path: file.to_string(),
            start_line: 1,
            end_line: 10,
            symbol_name: symbol.map(ToString::to_string),
            sources: vec![SearchSource::Vector],
            vector_score: Some(0.8),
            lexical_score: None,
            combined_score: 0.8,
            query_sources: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_variations_include_original_first() {
        let variations = generate_query_variations(None, "Where is auth handled?", 3).await;
        assert_eq!(variations[0], "Where is auth handled?");
        assert_eq!(variations.len(), 3);
    }

    #[tokio::test]
    async fn test_oracle_variations_used() {
        let oracle = FixedOracle(r#"["authentication middleware", "login flow code"]"#.to_string());
        let variations =
            generate_query_variations(Some(&oracle), "Where is auth handled?", 3).await;
        assert_eq!(
            variations,
            vec![
                "Where is auth handled?",
                "authentication middleware",
                "login flow code"
            ]
        );
    }

    #[tokio::test]
    async fn test_oracle_failure_falls_back_to_rules() {
        let variations =
            generate_query_variations(Some(&FailingOracle), "Where is auth handled?", 3).await;
        assert_eq!(variations.len(), 3);
        assert_eq!(variations[0], "Where is auth handled?");
    }

    #[tokio::test]
    async fn test_short_oracle_entries_rejected() {
        let oracle = FixedOracle(r#"["ok", "valid long variation"]"#.to_string());
        let variations =
            generate_query_variations(Some(&oracle), "Where is auth handled?", 3).await;
        assert!(!variations.contains(&"ok".to_string()));
        assert!(variations.contains(&"valid long variation".to_string()));
    }

    #[tokio::test]
    async fn test_variations_deduped_case_insensitively() {
        let oracle = FixedOracle(r#"["WHERE IS AUTH HANDLED?", "token validation logic"]"#.to_string());
        let variations =
            generate_query_variations(Some(&oracle), "Where is auth handled?", 5).await;
        let lowered: Vec<String> = variations.iter().map(|v| v.to_lowercase()).collect();
        let unique: std::collections::HashSet<_> = lowered.iter().collect();
        assert_eq!(unique.len(), lowered.len());
    }

    #[tokio::test]
    async fn test_empty_question_passthrough() {
        let variations = generate_query_variations(None, "  ", 3).await;
        assert_eq!(variations, vec!["  "]);
    }

    #[test]
    fn test_rule_based_implementation_suffixes() {
        let variations = rule_based_variations("How is the config loaded", 5);
        assert!(variations.iter().any(|v| v.ends_with(" implementation")));
        assert!(variations.iter().any(|v| v.ends_with(" code")));
    }

    #[test]
    fn test_rule_based_respects_cap() {
        assert!(rule_based_variations("How is the config loaded", 2).len() <= 2);
        assert!(rule_based_variations("q", 0).is_empty());
    }

    #[test]
    fn test_rule_based_tech_contexts() {
        let variations = rule_based_variations("Where does rendering happen", 8);
        assert!(variations.iter().any(|v| v.ends_with(" function")));
    }

    #[test]
    fn test_simplify_question() {
        assert_eq!(
            simplify_question("Where is the token validated?"),
            "the token validated"
        );
        assert_eq!(simplify_question("How does caching work"), "caching work");
        assert_eq!(simplify_question("is caching enabled?"), "caching enabled");
    }

    #[tokio::test]
    async fn test_rewrite_from_empty_results() {
        let queries = rewrite_queries_from_results(None, &[], &[], "question", 3).await;
        assert!(queries.is_empty());
    }

    #[tokio::test]
    async fn test_rewrite_uses_found_files_and_symbols() {
        let chunks = vec![
            chunk_result("src/session.py", Some("create_session"), "def create_session(): ..."),
            chunk_result("src/cookies.py", None, "def set_cookie(): ..."),
        ];
        let queries = rewrite_queries_from_results(
            None,
            &["auth queries".to_string()],
            &chunks,
            "Where is auth handled",
            3,
        )
        .await;

        assert!(!queries.is_empty());
        assert!(queries.len() <= 3);
        assert!(queries.iter().any(|q| q.contains("cookies") || q.contains("session")));
    }

    #[tokio::test]
    async fn test_rewrite_oracle_tops_up() {
        let oracle = FixedOracle(r#"["token refresh flow"]"#.to_string());
        let chunks = vec![chunk_result("auth.py", None, "short")];
        let queries = rewrite_queries_from_results(
            Some(&oracle),
            &[],
            &chunks,
            "Where is auth handled",
            3,
        )
        .await;
        assert!(queries.iter().any(|q| q == "token refresh flow"));
    }

    #[test]
    fn test_dedup_case_insensitive() {
        let queries = vec![
            "Alpha".to_string(),
            "alpha".to_string(),
            " ".to_string(),
            "Beta".to_string(),
        ];
        assert_eq!(dedup_case_insensitive(queries), vec!["Alpha", "Beta"]);
    }
}
