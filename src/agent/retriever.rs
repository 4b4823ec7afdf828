//! Retriever stage: multi-query hybrid retrieval with accumulation.
//!
//! One pass per invocation. The first pass searches the planner's queries;
//! later passes search the verifier's follow-up queries. Every base query
//! is expanded into variations, and from the second pass on, adaptive
//! rewrites derived from already-retrieved chunks are added. Results
//! accumulate across passes, deduplicated by chunk id and capped at the
//! citation limit.

use std::collections::HashMap;

use tracing::debug;

use crate::config::Config;
use crate::core::{AgentState, SearchResult};
use crate::error::Result;
use crate::oracle::Oracle;
use crate::query::{dedup_case_insensitive, generate_query_variations, rewrite_queries_from_results};
use crate::retrieval::keywords::shared_long_tokens;
use crate::retrieval::Retriever;

/// Boost added when another query variant re-hits an accumulated chunk.
const RE_HIT_BOOST: f64 = 0.2;

/// Boost per additional query variant that found a chunk.
const MULTI_QUERY_BOOST: f64 = 0.3;

/// Boost per question token shared with the chunk text.
const QUESTION_TOKEN_BOOST: f64 = 0.1;

/// Adaptive rewrites added per follow-up pass.
const MAX_REWRITE_QUERIES: usize = 3;

/// Runs one retrieval pass and folds the results into the state.
///
/// # Errors
///
/// Returns an error if a search branch fails.
pub async fn retrieve(
    retriever: &Retriever<'_>,
    oracle: Option<&dyn Oracle>,
    config: &Config,
    state: &mut AgentState,
) -> Result<()> {
    let iteration = state.retrieval_iteration + 1;
    let base_queries = queries_for_iteration(state, iteration);

    let mut all_queries: Vec<String> = Vec::new();
    for base in &base_queries {
        let variations =
            generate_query_variations(oracle, base, config.query_variations).await;
        all_queries.extend(variations);
    }

    if iteration > 1 && !state.retrieved_chunks.is_empty() {
        let rewrites = rewrite_queries_from_results(
            oracle,
            &base_queries,
            &state.retrieved_chunks,
            &state.question,
            MAX_REWRITE_QUERIES,
        )
        .await;
        all_queries.extend(rewrites);
    }

    let unique_queries = dedup_case_insensitive(all_queries);
    let new_chunks = retrieve_multi_query(retriever, &unique_queries, config, state)?;
    let new_count = new_chunks.len();

    state.retrieved_chunks.extend(new_chunks);
    state.retrieved_chunks.truncate(config.max_citations);
    state.retrieval_iteration = iteration;

    debug!(
        iteration,
        queries = unique_queries.len(),
        new = new_count,
        total = state.retrieved_chunks.len(),
        "retrieval pass"
    );
    state.trace(format!(
        "Iteration {iteration}: used {} query variations, retrieved {new_count} new chunks ({} total)",
        unique_queries.len(),
        state.retrieved_chunks.len()
    ));

    Ok(())
}

/// Base queries for a pass: the plan on pass one, the verifier's follow-ups
/// afterwards, the bare question when neither offers any.
fn queries_for_iteration(state: &AgentState, iteration: usize) -> Vec<String> {
    if iteration == 1 {
        if let Some(plan) = &state.plan {
            if !plan.search_queries.is_empty() {
                return plan.search_queries.clone();
            }
        }
    } else if let Some(verification) = &state.verification {
        if !verification.follow_up_queries.is_empty() {
            return verification.follow_up_queries.clone();
        }
    }
    vec![state.question.clone()]
}

/// Searches every query, merging hits by chunk id with multi-query boosts.
fn retrieve_multi_query(
    retriever: &Retriever<'_>,
    queries: &[String],
    config: &Config,
    state: &AgentState,
) -> Result<Vec<SearchResult>> {
    let mut order: Vec<String> = Vec::new();
    let mut by_id: HashMap<String, SearchResult> = HashMap::new();

    for query in queries {
        let hits = retriever.retrieve(query, &state.repo_id, config.max_chunks_per_query)?;
        for mut hit in hits {
            if state.has_chunk(&hit.chunk_id) {
                continue;
            }
            if let Some(existing) = by_id.get_mut(&hit.chunk_id) {
                existing.add_query_source(query);
                existing.combined_score += RE_HIT_BOOST;
            } else {
                hit.add_query_source(query);
                order.push(hit.chunk_id.clone());
                by_id.insert(hit.chunk_id.clone(), hit);
            }
        }
    }

    let mut results: Vec<SearchResult> = order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect();

    if queries.len() > 1 && !results.is_empty() {
        #[allow(clippy::cast_precision_loss)]
        for result in &mut results {
            let query_count = result.query_sources.len();
            if query_count > 1 {
                result.combined_score += (query_count - 1) as f64 * MULTI_QUERY_BOOST;
            }
            let overlap = shared_long_tokens(&state.question, &result.text) as f64;
            result.combined_score += overlap * QUESTION_TOKEN_BOOST;
        }

        results.sort_by(|a, b| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(config.max_citations * 2);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChunkInfo, ChunkingMethod, CodeChunk, Plan, RepoMetadata, RepoStats, Verification};
    use crate::embedding::{Embedder, FallbackEmbedder};
    use crate::store::CorpusStore;
    use crate::vector::{DenseVectorIndex, VectorIndex, VectorMetadata};

    fn indexed_fixture() -> (CorpusStore, DenseVectorIndex, FallbackEmbedder, Config) {
        let mut store = CorpusStore::in_memory().unwrap();
        let mut index = DenseVectorIndex::in_memory().unwrap();
        let embedder = FallbackEmbedder::new(128);
        let config = Config::default();

        store
            .save_repo(&RepoMetadata {
                repo_id: "r1".to_string(),
                url: None,
                local_path: "/tmp/r1".to_string(),
                commit_hash: None,
                indexed_at: 1,
                stats: RepoStats::default(),
            })
            .unwrap();

        let texts = [
            ("auth.py", "def authenticate(user): validate the session token against the store"),
            ("db.py", "def connect(): open the database connection pool and ping it"),
            ("render.py", "def render(template): draw the html page for the browser"),
        ];
        let chunks: Vec<CodeChunk> = texts
            .iter()
            .map(|(file, text)| {
                CodeChunk::new(
                    "r1",
                    *file,
                    "python",
                    1,
                    20,
                    None,
                    *text,
                    ChunkInfo::new(ChunkingMethod::Ast),
                )
            })
            .collect();
        store.save_chunks(&chunks).unwrap();

        let ids: Vec<String> = chunks.iter().map(|c| c.chunk_id.clone()).collect();
        let docs: Vec<String> = chunks.iter().map(|c| c.chunk_text.clone()).collect();
        let metas: Vec<VectorMetadata> = chunks
            .iter()
            .map(|c| VectorMetadata {
                file_path: c.file_path.clone(),
                start_line: c.start_line,
                end_line: c.end_line,
                symbol_name: None,
                language: "python".to_string(),
            })
            .collect();
        let embeddings: Vec<Vec<f32>> =
            docs.iter().map(|d| embedder.embed(d).unwrap()).collect();
        index.add("repo_r1", &ids, &embeddings, &docs, &metas).unwrap();

        (store, index, embedder, config)
    }

    fn planned_state(question: &str, queries: &[&str]) -> AgentState {
        let mut state = AgentState::new(question, "r1");
        state.plan = Some(Plan {
            reasoning: "test".to_string(),
            search_queries: queries.iter().map(ToString::to_string).collect(),
            expected_files: Vec::new(),
        });
        state
    }

    #[tokio::test]
    async fn test_first_pass_uses_plan_queries() {
        let (store, index, embedder, config) = indexed_fixture();
        let retriever = Retriever::new(&store, &index, &embedder, &config);

        let mut state = planned_state("where is the session token validated", &["session token"]);
        retrieve(&retriever, None, &config, &mut state).await.unwrap();

        assert_eq!(state.retrieval_iteration, 1);
        assert!(!state.retrieved_chunks.is_empty());
        assert!(state.reasoning_trace.iter().any(|t| t.starts_with("Iteration 1")));
    }

    #[tokio::test]
    async fn test_accumulation_is_monotonic_and_capped() {
        let (store, index, embedder, config) = indexed_fixture();
        let retriever = Retriever::new(&store, &index, &embedder, &config);

        let mut state = planned_state("where is the session token validated", &["session token"]);
        retrieve(&retriever, None, &config, &mut state).await.unwrap();
        let after_first: Vec<String> = state
            .retrieved_chunks
            .iter()
            .map(|c| c.chunk_id.clone())
            .collect();

        state.verification = Some(Verification {
            is_grounded: false,
            unsupported_claims: Vec::new(),
            missing_information: Vec::new(),
            follow_up_queries: vec!["database connection pool".to_string()],
        });
        retrieve(&retriever, None, &config, &mut state).await.unwrap();

        assert_eq!(state.retrieval_iteration, 2);
        // Superset: every earlier chunk survives the second pass
        for id in &after_first {
            assert!(state.has_chunk(id));
        }
        assert!(state.retrieved_chunks.len() <= config.max_citations);
    }

    #[tokio::test]
    async fn test_later_pass_falls_back_to_question() {
        let (store, index, embedder, config) = indexed_fixture();
        let retriever = Retriever::new(&store, &index, &embedder, &config);

        let mut state = planned_state("database connection", &["database connection"]);
        retrieve(&retriever, None, &config, &mut state).await.unwrap();

        // Verification with no follow-ups: second pass searches the question
        state.verification = Some(Verification {
            is_grounded: false,
            ..Verification::default()
        });
        retrieve(&retriever, None, &config, &mut state).await.unwrap();
        assert_eq!(state.retrieval_iteration, 2);
    }

    #[tokio::test]
    async fn test_multi_query_hits_recorded() {
        let (store, index, embedder, config) = indexed_fixture();
        let retriever = Retriever::new(&store, &index, &embedder, &config);

        // Two near-identical base queries so variations overlap heavily
        let mut state = planned_state(
            "database connection pool",
            &["database connection pool", "database connection pooling"],
        );
        retrieve(&retriever, None, &config, &mut state).await.unwrap();

        let db_chunk = state
            .retrieved_chunks
            .iter()
            .find(|c| c.file_path == "db.py")
            .expect("db chunk retrieved");
        assert!(!db_chunk.query_sources.is_empty());
    }

    #[tokio::test]
    async fn test_empty_corpus_retrieves_nothing() {
        let store = CorpusStore::in_memory().unwrap();
        let index = DenseVectorIndex::in_memory().unwrap();
        let embedder = FallbackEmbedder::new(128);
        let config = Config::default();
        let retriever = Retriever::new(&store, &index, &embedder, &config);

        let mut state = planned_state("anything", &["anything"]);
        retrieve(&retriever, None, &config, &mut state).await.unwrap();
        assert!(state.retrieved_chunks.is_empty());
        assert_eq!(state.retrieval_iteration, 1);
    }
}
