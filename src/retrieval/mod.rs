//! Hybrid retrieval: dense and sparse search fused into one ranking.
//!
//! The vector branch embeds an expansion-widened form of the question and
//! searches the repository's namespace; the lexical branch runs a
//! full-text query per extracted keyword. Fusion, reranking, and span
//! deduplication produce the final top-k.

pub mod fusion;
pub mod keywords;

pub use fusion::{dedup_by_file_span, merge_and_rerank};
pub use keywords::{expand_query_for_vector_search, expand_terms, extract_keywords};

use tracing::debug;

use crate::config::Config;
use crate::core::{SearchResult, SearchSource};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::store::CorpusStore;
use crate::vector::VectorIndex;

/// Lexical searches run for this many top keywords.
const LEXICAL_KEYWORD_COUNT: usize = 4;

/// Hybrid retriever over one corpus store and vector index.
pub struct Retriever<'a> {
    store: &'a CorpusStore,
    index: &'a dyn VectorIndex,
    embedder: &'a dyn Embedder,
    config: &'a Config,
}

impl<'a> Retriever<'a> {
    /// Creates a retriever borrowing the shared handles.
    #[must_use]
    pub fn new(
        store: &'a CorpusStore,
        index: &'a dyn VectorIndex,
        embedder: &'a dyn Embedder,
        config: &'a Config,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
            config,
        }
    }

    /// Retrieves the top-k chunks for a question.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or either search branch fails.
    pub fn retrieve(&self, question: &str, repo_id: &str, k: usize) -> Result<Vec<SearchResult>> {
        // Dense branch: expanded query against the repo namespace
        let expanded_query = expand_query_for_vector_search(question);
        let embedding = self.embedder.embed(&expanded_query)?;
        let namespace = format!("repo_{repo_id}");
        let vector_hits = self.index.query(&namespace, &embedding, k)?;

        let vector_results: Vec<SearchResult> = vector_hits
            .into_iter()
            .map(|hit| SearchResult {
                chunk_id: hit.chunk_id.clone(),
                text: hit.document.clone(),
                file_path: hit.metadata.file_path.clone(),
                start_line: hit.metadata.start_line,
                end_line: hit.metadata.end_line,
                symbol_name: hit.metadata.symbol_name.clone(),
                sources: vec![SearchSource::Vector],
                vector_score: Some(f64::from(hit.similarity())),
                lexical_score: None,
                combined_score: 0.0,
                query_sources: Vec::new(),
            })
            .collect();

        // Sparse branch: one full-text query per top keyword
        let expanded_keywords = extract_keywords(question, true);
        let mut lexical_results = Vec::new();
        for keyword in expanded_keywords.iter().take(LEXICAL_KEYWORD_COUNT) {
            let hits = self.store.lexical_search(repo_id, keyword, k / 2)?;
            lexical_results.extend(hits);
        }

        let base_keywords = extract_keywords(question, false);
        debug!(
            question,
            vector = vector_results.len(),
            lexical = lexical_results.len(),
            "hybrid retrieval branches"
        );

        Ok(merge_and_rerank(
            vector_results,
            lexical_results,
            k,
            &base_keywords,
            Some(question),
            self.config,
        ))
    }
}
