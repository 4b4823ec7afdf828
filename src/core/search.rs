//! Transient retrieval result types.

use serde::{Deserialize, Serialize};

/// Which retrieval branch produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    /// Dense (embedding) search.
    Vector,
    /// Sparse (full-text) search.
    Lexical,
}

/// A retrieval hit: one chunk with its scores and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Chunk identifier.
    pub chunk_id: String,
    /// Chunk text.
    pub text: String,
    /// Repo-relative file path.
    pub file_path: String,
    /// First line of the span, 1-indexed.
    pub start_line: usize,
    /// Last line of the span, inclusive.
    pub end_line: usize,
    /// Symbol name, when the chunk covers a definition.
    pub symbol_name: Option<String>,
    /// Branches that produced this hit.
    pub sources: Vec<SearchSource>,
    /// Raw similarity from the vector branch (1 - cosine distance).
    pub vector_score: Option<f64>,
    /// Raw rank score from the lexical branch.
    pub lexical_score: Option<f64>,
    /// Fused, reranked score. Higher is more relevant.
    pub combined_score: f64,
    /// Query variants that hit this chunk (multi-query path only).
    #[serde(default)]
    pub query_sources: Vec<String>,
}

impl SearchResult {
    /// Records a source branch, keeping the set free of duplicates.
    pub fn add_source(&mut self, source: SearchSource) {
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
    }

    /// True when both branches found this chunk.
    #[must_use]
    pub fn is_multi_source(&self) -> bool {
        self.sources.len() > 1
    }

    /// Records the query variant that found this chunk.
    pub fn add_query_source(&mut self, query: &str) {
        if !self.query_sources.iter().any(|q| q == query) {
            self.query_sources.push(query.to_string());
        }
    }
}
