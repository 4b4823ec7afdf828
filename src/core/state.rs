//! Agent state: the record threaded through the answer pipeline.
//!
//! Fixed schema with explicit optional fields. The reasoning trace is
//! append-only and is the loop's observability contract: every stage pushes
//! at least one entry.

use serde::{Deserialize, Serialize};

use super::search::SearchResult;

/// The search plan produced by the planner stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Brief explanation of the planned approach.
    #[serde(default)]
    pub reasoning: String,
    /// Two to four specific search queries.
    #[serde(default)]
    pub search_queries: Vec<String>,
    /// File patterns the planner expects to find.
    #[serde(default)]
    pub expected_files: Vec<String>,
}

impl Plan {
    /// The plan used when the oracle's output cannot be parsed: search the
    /// question verbatim.
    #[must_use]
    pub fn fallback(question: &str) -> Self {
        Self {
            reasoning: "fallback: direct search using the question".to_string(),
            search_queries: vec![question.to_string()],
            expected_files: Vec::new(),
        }
    }

    /// True if this is the parse-failure fallback plan.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.reasoning.starts_with("fallback")
    }
}

/// The verifier's judgment of a draft answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    /// Whether every claim is anchored in retrieved code.
    #[serde(default = "default_grounded")]
    pub is_grounded: bool,
    /// Claims with no supporting chunk.
    #[serde(default)]
    pub unsupported_claims: Vec<String>,
    /// Information that would improve the answer.
    #[serde(default)]
    pub missing_information: Vec<String>,
    /// Queries to run if another retrieval pass is warranted.
    #[serde(default)]
    pub follow_up_queries: Vec<String>,
}

const fn default_grounded() -> bool {
    true
}

impl Default for Verification {
    /// Fail-open verification: grounded with empty lists, so an unusable
    /// verifier response can never loop forever.
    fn default() -> Self {
        Self {
            is_grounded: true,
            unsupported_claims: Vec::new(),
            missing_information: Vec::new(),
            follow_up_queries: Vec::new(),
        }
    }
}

/// A citation anchoring an answer claim to a source span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Repo-relative file path.
    pub file_path: String,
    /// First cited line, 1-indexed.
    pub start_line: usize,
    /// Last cited line; equals `start_line` for single-line citations.
    pub end_line: usize,
    /// The cited source text, hydrated by the finalizer (may be empty
    /// before hydration).
    #[serde(default)]
    pub text_snippet: String,
}

impl Citation {
    /// Creates a citation for a span. A missing end line collapses to the
    /// start line.
    #[must_use]
    pub fn new(file_path: impl Into<String>, start_line: usize, end_line: Option<usize>) -> Self {
        Self {
            file_path: file_path.into(),
            start_line,
            end_line: end_line.unwrap_or(start_line),
            text_snippet: String::new(),
        }
    }
}

/// State threaded through plan, retrieve, synthesize, verify, finalize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    /// The user's question.
    pub question: String,
    /// Target repository id.
    pub repo_id: String,
    /// Planner output.
    pub plan: Option<Plan>,
    /// Chunks accumulated across retrieval iterations, deduplicated by id.
    pub retrieved_chunks: Vec<SearchResult>,
    /// Retrieval passes completed so far (0 before the first pass).
    pub retrieval_iteration: usize,
    /// Synthesizer output awaiting verification.
    pub draft_answer: Option<String>,
    /// Verifier output.
    pub verification: Option<Verification>,
    /// The finalized answer document.
    pub final_answer: Option<String>,
    /// Citations extracted from the draft, hydrated by the finalizer.
    pub citations: Vec<Citation>,
    /// Append-only trace of short stage summaries.
    pub reasoning_trace: Vec<String>,
}

impl AgentState {
    /// Fresh state for a question against a repository.
    #[must_use]
    pub fn new(question: impl Into<String>, repo_id: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            repo_id: repo_id.into(),
            plan: None,
            retrieved_chunks: Vec::new(),
            retrieval_iteration: 0,
            draft_answer: None,
            verification: None,
            final_answer: None,
            citations: Vec::new(),
            reasoning_trace: Vec::new(),
        }
    }

    /// Appends a reasoning-trace entry.
    pub fn trace(&mut self, entry: impl Into<String>) {
        self.reasoning_trace.push(entry.into());
    }

    /// True if a chunk with the given id has already been retrieved.
    #[must_use]
    pub fn has_chunk(&self, chunk_id: &str) -> bool {
        self.retrieved_chunks.iter().any(|c| c.chunk_id == chunk_id)
    }
}
