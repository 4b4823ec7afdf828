//! Keyword extraction and query expansion.
//!
//! Turns a natural-language question into search terms: plain word tokens
//! minus stop words, split and whole camelCase/snake_case identifiers,
//! short uppercase acronyms, optionally widened with the static synonym
//! table.

use std::sync::OnceLock;

use regex::Regex;

use crate::tables::{QUERY_EXPANSIONS, STOP_WORDS};

/// Keyword cap without expansion.
const MAX_KEYWORDS: usize = 5;
/// Keyword cap with expansion.
const MAX_KEYWORDS_EXPANDED: usize = 8;
/// Minimum keyword length.
const MIN_KEYWORD_LEN: usize = 3;

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[a-zA-Z_][a-zA-Z0-9_]*\b").expect("valid regex"))
}

fn camel_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // camelCase and PascalCase: at least one internal hump
    RE.get_or_init(|| Regex::new(r"\b[a-zA-Z][a-z0-9]*(?:[A-Z][a-z0-9]+)+\b").expect("valid regex"))
}

fn camel_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Z]?[a-z]+|[A-Z]+").expect("valid regex"))
}

fn snake_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[a-z]+_[a-z_]+\b").expect("valid regex"))
}

fn acronym_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z]{2,4}\b").expect("valid regex"))
}

/// Extracts keywords from a question.
///
/// With `expand`, synonyms from the expansion table are appended after the
/// original keywords and the cap rises from 5 to 8.
#[must_use]
pub fn extract_keywords(question: &str, expand: bool) -> Vec<String> {
    let lowered = question.to_lowercase();
    let mut keywords: Vec<String> = Vec::new();
    let mut push = |kw: String| {
        if !keywords.contains(&kw) {
            keywords.push(kw);
        }
    };

    for m in word_re().find_iter(&lowered) {
        let word = m.as_str();
        if word.len() >= MIN_KEYWORD_LEN && !STOP_WORDS.contains(&word) {
            push(word.to_string());
        }
    }

    // camelCase / PascalCase identifiers: components and the whole word
    for m in camel_re().find_iter(question) {
        for part in camel_split_re().find_iter(m.as_str()) {
            if part.as_str().len() >= MIN_KEYWORD_LEN {
                push(part.as_str().to_lowercase());
            }
        }
        push(m.as_str().to_lowercase());
    }

    // snake_case identifiers: components and the whole word
    for m in snake_re().find_iter(&lowered) {
        for part in m.as_str().split('_') {
            if part.len() >= MIN_KEYWORD_LEN {
                push(part.to_string());
            }
        }
        push(m.as_str().to_string());
    }

    // Uppercase acronyms (API, SQL, JWT, HTTP)
    for m in acronym_re().find_iter(question) {
        push(m.as_str().to_lowercase());
    }

    if expand && !keywords.is_empty() {
        let expanded = expand_terms(&keywords);
        for term in expanded {
            if !keywords.contains(&term) {
                keywords.push(term);
            }
        }
        keywords.truncate(MAX_KEYWORDS_EXPANDED);
    } else {
        keywords.truncate(MAX_KEYWORDS);
    }

    keywords
}

/// Expands terms with synonyms from the static table.
///
/// An entry applies when its key is a substring of the term or the term is
/// a substring of the key. Original terms come first, expansions after, in
/// stable order.
#[must_use]
pub fn expand_terms(terms: &[String]) -> Vec<String> {
    let mut expanded: Vec<String> = terms.to_vec();
    let mut push = |term: &str| {
        if !expanded.iter().any(|t| t == term) {
            expanded.push(term.to_string());
        }
    };

    for term in terms {
        let term_lower = term.to_lowercase();
        if let Some((_, synonyms)) = QUERY_EXPANSIONS.iter().find(|(k, _)| *k == term_lower) {
            for synonym in *synonyms {
                push(synonym);
            }
        } else {
            for (key, synonyms) in QUERY_EXPANSIONS {
                if term_lower.contains(key) || key.contains(term_lower.as_str()) {
                    for synonym in *synonyms {
                        push(synonym);
                    }
                    push(key);
                }
            }
        }
    }

    expanded
}

/// Expands a question for the vector branch.
///
/// Appends synonyms of the top 3 extracted keywords that do not already
/// appear in the question, capped at 3 space-separated parts so the query
/// stays focused.
#[must_use]
pub fn expand_query_for_vector_search(question: &str) -> String {
    let keywords = extract_keywords(question, false);
    if keywords.is_empty() {
        return question.to_string();
    }

    let top: Vec<String> = keywords.into_iter().take(3).collect();
    let expanded = expand_terms(&top);
    let question_lower = question.to_lowercase();

    let mut parts = vec![question.to_string()];
    for term in expanded.iter().skip(top.len()).take(5) {
        if parts.len() >= 3 {
            break;
        }
        if !question_lower.contains(term.as_str()) {
            parts.push(term.clone());
        }
    }

    parts.join(" ")
}

/// Counts question tokens longer than 3 characters that also appear as
/// >3-character tokens in the text.
#[must_use]
pub fn shared_long_tokens(question: &str, text: &str) -> usize {
    let question_lower = question.to_lowercase();
    let text_lower = text.to_lowercase();

    let text_words: std::collections::HashSet<&str> = text_lower
        .split_whitespace()
        .filter(|w| w.len() > 3)
        .collect();

    let mut seen: std::collections::HashSet<&str> = std::collections::HashSet::new();
    question_lower
        .split_whitespace()
        .filter(|&w| w.len() > 3 && seen.insert(w))
        .filter(|&w| text_words.contains(w))
        .count()
}
