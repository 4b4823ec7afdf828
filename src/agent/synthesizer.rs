//! Synthesizer stage: draft a cited answer from the retrieved chunks.

use tracing::debug;

use super::prompts::synthesizer_prompt;
use crate::citation::{extract_citations, infer_citations};
use crate::config::{Config, ANALYTIC_TEMPERATURE};
use crate::context::pack_chunks;
use crate::core::AgentState;
use crate::oracle::Oracle;

/// Draft emitted when retrieval produced nothing.
pub const NO_RESULTS_ANSWER: &str = "No relevant code was found to answer this question.";

/// Draft emitted when the oracle fails.
pub const SYNTHESIS_ERROR_ANSWER: &str = "Error generating answer";

/// Packs the accumulated chunks, asks the oracle for a draft, and extracts
/// citations from it.
///
/// With no retrieved chunks the stage short-circuits with
/// [`NO_RESULTS_ANSWER`]; the driver then skips verification. Citation
/// extraction falls back to inference against the original (unpacked)
/// chunk list when the draft cites nothing parseable.
pub async fn synthesize(oracle: &dyn Oracle, config: &Config, state: &mut AgentState) {
    if state.retrieved_chunks.is_empty() {
        state.draft_answer = Some(NO_RESULTS_ANSWER.to_string());
        state.citations = Vec::new();
        state.trace("Synthesis skipped: no retrieved chunks");
        return;
    }

    let packed = pack_chunks(&state.retrieved_chunks, Some(&state.question), config);
    let truncated = packed.iter().filter(|p| p.truncated).count();
    if packed.len() < state.retrieved_chunks.len() || truncated > 0 {
        state.trace(format!(
            "Context optimization: {}/{} chunks selected, {truncated} truncated to fit context window",
            packed.len(),
            state.retrieved_chunks.len()
        ));
    } else {
        state.trace(format!(
            "Context optimization: all {} chunks fit within context window",
            packed.len()
        ));
    }

    let prompt = synthesizer_prompt(&state.question, &packed);
    let draft = match oracle.complete(&prompt, ANALYTIC_TEMPERATURE).await {
        Ok(text) => text,
        Err(e) => {
            debug!(error = %e, "synthesizer oracle failed");
            SYNTHESIS_ERROR_ANSWER.to_string()
        }
    };

    let mut citations = extract_citations(&draft);
    if citations.is_empty() {
        citations = infer_citations(&draft, &state.retrieved_chunks);
    }

    state.trace(format!("Generated answer with {} citations", citations.len()));
    state.draft_answer = Some(draft);
    state.citations = citations;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SearchResult, SearchSource};
    use crate::error::OracleError;
    use async_trait::async_trait;

    struct FixedOracle(String);

    #[async_trait]
    impl Oracle for FixedOracle {
        async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String, OracleError> {
            Ok(self.0.clone())
        }
    }

    struct FailingOracle;

    #[async_trait]
    impl Oracle for FailingOracle {
        async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String, OracleError> {
            Err(OracleError::Request("boom".to_string()))
        }
    }

    fn chunk(file: &str) -> SearchResult {
        SearchResult {
            chunk_id: format!("r:{file}:1:10"),
            text: "def handler(): pass".to_string(),
            file_path: file.to_string(),
            start_line: 1,
            end_line: 10,
            symbol_name: None,
            sources: vec![SearchSource::Vector],
            vector_score: Some(0.8),
            lexical_score: None,
            combined_score: 0.8,
            query_sources: Vec::new(),
        }
    }

    fn state_with_chunks(files: &[&str]) -> AgentState {
        let mut state = AgentState::new("how does the handler work", "r1");
        state.retrieved_chunks = files.iter().map(|f| chunk(f)).collect();
        state
    }

    #[tokio::test]
    async fn test_no_chunks_short_circuits() {
        let oracle = FixedOracle("should not be called".to_string());
        let mut state = AgentState::new("q", "r1");
        synthesize(&oracle, &Config::default(), &mut state).await;

        assert_eq!(state.draft_answer.as_deref(), Some(NO_RESULTS_ANSWER));
        assert!(state.citations.is_empty());
    }

    #[tokio::test]
    async fn test_draft_and_citations_extracted() {
        let oracle =
            FixedOracle("The handler lives at [handlers.py:1-10] and dispatches.".to_string());
        let mut state = state_with_chunks(&["handlers.py"]);
        synthesize(&oracle, &Config::default(), &mut state).await;

        assert!(state.draft_answer.as_deref().unwrap().contains("handlers.py"));
        assert_eq!(state.citations.len(), 1);
        assert_eq!(state.citations[0].file_path, "handlers.py");
    }

    #[tokio::test]
    async fn test_citation_inference_when_draft_has_none() {
        let oracle = FixedOracle("The handler dispatches requests.".to_string());
        let mut state = state_with_chunks(&["handlers.py", "other.py"]);
        synthesize(&oracle, &Config::default(), &mut state).await;

        // Falls back to citing retrieved chunks
        assert!(!state.citations.is_empty());
    }

    #[tokio::test]
    async fn test_oracle_failure_yields_error_answer() {
        let mut state = state_with_chunks(&["handlers.py"]);
        synthesize(&FailingOracle, &Config::default(), &mut state).await;
        assert_eq!(state.draft_answer.as_deref(), Some(SYNTHESIS_ERROR_ANSWER));
    }

    #[tokio::test]
    async fn test_trace_mentions_context_optimization() {
        let oracle = FixedOracle("answer [handlers.py:1]".to_string());
        let mut state = state_with_chunks(&["handlers.py"]);
        synthesize(&oracle, &Config::default(), &mut state).await;
        assert!(state
            .reasoning_trace
            .iter()
            .any(|t| t.starts_with("Context optimization")));
    }
}
