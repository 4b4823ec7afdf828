//! The answering loop: plan, retrieve, synthesize, verify, finalize.
//!
//! Each stage is a function over [`AgentState`] consuming the oracle
//! capability; this module is the driver that dispatches on the
//! transition function. The loop re-enters retrieval only while the
//! verifier rejects the draft, supplies follow-up queries, and the
//! iteration budget remains, so it terminates in at most
//! `max_retrieval_iterations` verify cycles.

mod finalizer;
mod planner;
pub mod prompts;
mod retriever;
mod synthesizer;
mod verifier;

pub use finalizer::FinalizerMode;
pub use synthesizer::{NO_RESULTS_ANSWER, SYNTHESIS_ERROR_ANSWER};

use std::path::PathBuf;

use tracing::info;

use crate::config::Config;
use crate::core::AgentState;
use crate::embedding::Embedder;
use crate::error::{Result, StorageError};
use crate::oracle::Oracle;
use crate::retrieval::Retriever;
use crate::store::CorpusStore;
use crate::vector::VectorIndex;

/// The answering engine for one repository corpus.
pub struct AgentLoop<'a> {
    store: &'a CorpusStore,
    index: &'a dyn VectorIndex,
    embedder: &'a dyn Embedder,
    oracle: &'a dyn Oracle,
    config: &'a Config,
    finalizer_mode: FinalizerMode,
}

impl<'a> AgentLoop<'a> {
    /// Creates a loop over the shared handles.
    #[must_use]
    pub fn new(
        store: &'a CorpusStore,
        index: &'a dyn VectorIndex,
        embedder: &'a dyn Embedder,
        oracle: &'a dyn Oracle,
        config: &'a Config,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
            oracle,
            config,
            finalizer_mode: FinalizerMode::default(),
        }
    }

    /// Selects the finalizer output shape.
    #[must_use]
    pub const fn with_finalizer_mode(mut self, mode: FinalizerMode) -> Self {
        self.finalizer_mode = mode;
        self
    }

    /// Answers a question against an indexed repository.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::RepoNotFound`] for an unknown repository and
    /// propagates unrecovered retrieval/storage failures. Oracle failures
    /// are absorbed per stage and never surface from here.
    pub async fn answer(&self, question: &str, repo_id: &str) -> Result<AgentState> {
        let repo = self
            .store
            .get_repo(repo_id)?
            .ok_or_else(|| StorageError::RepoNotFound {
                repo_id: repo_id.to_string(),
            })?;
        let repo_root = PathBuf::from(&repo.local_path);

        let mut state = AgentState::new(question, repo_id);
        let retriever = Retriever::new(self.store, self.index, self.embedder, self.config);

        planner::plan(self.oracle, &mut state).await;

        loop {
            retriever::retrieve(&retriever, Some(self.oracle), self.config, &mut state).await?;
            synthesizer::synthesize(self.oracle, self.config, &mut state).await;

            // Nothing retrieved: no claims to verify
            if state.retrieved_chunks.is_empty() {
                break;
            }

            verifier::verify(self.oracle, &mut state).await;

            if !should_retrieve_more(&state, self.config) {
                break;
            }
        }

        finalizer::finalize(
            self.oracle,
            self.config,
            &repo_root,
            self.finalizer_mode,
            &mut state,
        )
        .await;

        info!(
            repo_id,
            iterations = state.retrieval_iteration,
            chunks = state.retrieved_chunks.len(),
            citations = state.citations.len(),
            "answer complete"
        );
        Ok(state)
    }
}

/// The verify transition: retrieve again only when the draft is not
/// grounded, the iteration budget remains, and the verifier supplied
/// follow-up queries.
#[must_use]
pub fn should_retrieve_more(state: &AgentState, config: &Config) -> bool {
    let Some(verification) = &state.verification else {
        return false;
    };
    !verification.is_grounded
        && state.retrieval_iteration < config.max_retrieval_iterations
        && !verification.follow_up_queries.is_empty()
}
