//! Engine configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values, environment
//! variables (`REPOQA_` prefix), defaults.

use std::time::Duration;

use crate::error::Error;

/// Default target chunk size in tokens.
pub const DEFAULT_CHUNK_SIZE: usize = 1200;
/// Default overlap between size-based chunks in tokens.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
/// Chunks smaller than this are merged into a neighbor.
pub const DEFAULT_MIN_CHUNK_SIZE_TOKENS: usize = 50;
/// Maximum lines scanned above a definition for comments/docstrings.
pub const DEFAULT_MAX_CONTEXT_LINES: usize = 10;
/// Default results per hybrid search.
pub const DEFAULT_MAX_CHUNKS_PER_QUERY: usize = 12;
/// Cap on accumulated retrieved chunks (and therefore citations).
pub const DEFAULT_MAX_CITATIONS: usize = 15;
/// Weight of the vector branch during fusion.
pub const DEFAULT_VECTOR_WEIGHT: f64 = 0.7;
/// Weight of the lexical branch during fusion.
pub const DEFAULT_LEXICAL_WEIGHT: f64 = 0.3;
/// Maximum rank-based boost added to fused scores.
pub const DEFAULT_RANK_BOOST_FACTOR: f64 = 0.3;
/// Span-overlap fraction above which two chunks are duplicates.
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.5;
/// Boost per additional query keyword matched in a chunk.
pub const DEFAULT_MULTI_TERM_MATCH_BOOST: f64 = 0.15;
/// Penalty applied to test files for implementation questions.
pub const DEFAULT_TEST_FILE_PENALTY: f64 = -0.2;
/// Penalty applied to documentation files for implementation questions.
pub const DEFAULT_DOC_FILE_PENALTY: f64 = -0.15;
/// Boost per directory level closer to the repository root.
pub const DEFAULT_PATH_DEPTH_BOOST: f64 = 0.05;
/// Default maximum verify/retrieve iterations.
pub const DEFAULT_MAX_RETRIEVAL_ITERATIONS: usize = 3;
/// Default number of query variations per base query.
pub const DEFAULT_QUERY_VARIATIONS: usize = 3;
/// Default synthesizer context window in tokens.
pub const DEFAULT_CONTEXT_WINDOW_SIZE: usize = 8192;
/// Tokens reserved for the prompt template.
pub const DEFAULT_RESERVE_PROMPT_TOKENS: usize = 2000;
/// Tokens reserved for the oracle response.
pub const DEFAULT_RESERVE_RESPONSE_TOKENS: usize = 1000;
/// Smallest truncated chunk worth keeping.
pub const DEFAULT_MIN_CHUNK_TOKENS_AFTER_TRUNCATION: usize = 50;
/// Maximum length of a hydrated citation snippet in characters.
pub const DEFAULT_SNIPPET_LENGTH: usize = 300;
/// Default oracle request timeout in seconds.
pub const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 120;

/// Temperature for planning, synthesis, and verification prompts.
pub const ANALYTIC_TEMPERATURE: f32 = 0.0;
/// Temperature for summarization prompts.
pub const SUMMARY_TEMPERATURE: f32 = 0.3;

/// Configuration for the retrieval and answering engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Target chunk size in tokens.
    pub chunk_size: usize,
    /// Overlap between size-based chunks in tokens.
    pub chunk_overlap: usize,
    /// Minimum tokens before a chunk is merged into a neighbor.
    pub min_chunk_size_tokens: usize,
    /// Maximum lines to look back for comments/docstrings.
    pub max_context_lines: usize,
    /// Results per hybrid search.
    pub max_chunks_per_query: usize,
    /// Cap on accumulated retrieved chunks.
    pub max_citations: usize,
    /// Weight of the vector branch during fusion.
    pub vector_weight: f64,
    /// Weight of the lexical branch during fusion.
    pub lexical_weight: f64,
    /// Maximum rank-based boost added to fused scores.
    pub rank_boost_factor: f64,
    /// Span-overlap fraction above which two chunks are duplicates.
    pub overlap_threshold: f64,
    /// Boost per additional query keyword matched in a chunk.
    pub multi_term_match_boost: f64,
    /// Penalty applied to test files for implementation questions.
    pub test_file_penalty: f64,
    /// Penalty applied to documentation files for implementation questions.
    pub doc_file_penalty: f64,
    /// Boost per directory level closer to the repository root.
    pub path_depth_boost: f64,
    /// Maximum verify/retrieve iterations.
    pub max_retrieval_iterations: usize,
    /// Query variations generated per base query.
    pub query_variations: usize,
    /// Synthesizer context window in tokens.
    pub context_window_size: usize,
    /// Tokens reserved for the prompt template.
    pub reserve_prompt_tokens: usize,
    /// Tokens reserved for the oracle response.
    pub reserve_response_tokens: usize,
    /// Smallest truncated chunk worth keeping.
    pub min_chunk_tokens_after_truncation: usize,
    /// Maximum hydrated snippet length in characters.
    pub snippet_length: usize,
    /// Oracle request timeout.
    pub oracle_timeout: Duration,
    /// Oracle model identifier.
    pub oracle_model: String,
    /// Oracle API key (empty for keyless local backends).
    pub oracle_api_key: String,
    /// Optional base URL override for OpenAI-compatible backends.
    pub oracle_base_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            min_chunk_size_tokens: DEFAULT_MIN_CHUNK_SIZE_TOKENS,
            max_context_lines: DEFAULT_MAX_CONTEXT_LINES,
            max_chunks_per_query: DEFAULT_MAX_CHUNKS_PER_QUERY,
            max_citations: DEFAULT_MAX_CITATIONS,
            vector_weight: DEFAULT_VECTOR_WEIGHT,
            lexical_weight: DEFAULT_LEXICAL_WEIGHT,
            rank_boost_factor: DEFAULT_RANK_BOOST_FACTOR,
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            multi_term_match_boost: DEFAULT_MULTI_TERM_MATCH_BOOST,
            test_file_penalty: DEFAULT_TEST_FILE_PENALTY,
            doc_file_penalty: DEFAULT_DOC_FILE_PENALTY,
            path_depth_boost: DEFAULT_PATH_DEPTH_BOOST,
            max_retrieval_iterations: DEFAULT_MAX_RETRIEVAL_ITERATIONS,
            query_variations: DEFAULT_QUERY_VARIATIONS,
            context_window_size: DEFAULT_CONTEXT_WINDOW_SIZE,
            reserve_prompt_tokens: DEFAULT_RESERVE_PROMPT_TOKENS,
            reserve_response_tokens: DEFAULT_RESERVE_RESPONSE_TOKENS,
            min_chunk_tokens_after_truncation: DEFAULT_MIN_CHUNK_TOKENS_AFTER_TRUNCATION,
            snippet_length: DEFAULT_SNIPPET_LENGTH,
            oracle_timeout: Duration::from_secs(DEFAULT_ORACLE_TIMEOUT_SECS),
            oracle_model: "gpt-4o-mini".to_string(),
            oracle_api_key: String::new(),
            oracle_base_url: None,
        }
    }
}

impl Config {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a value fails validation.
    pub fn from_env() -> Result<Self, Error> {
        Self::builder().from_env().build()
    }

    /// Token budget available for packed chunks.
    #[must_use]
    pub const fn context_budget(&self) -> usize {
        self.context_window_size
            .saturating_sub(self.reserve_prompt_tokens)
            .saturating_sub(self.reserve_response_tokens)
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    max_chunks_per_query: Option<usize>,
    max_citations: Option<usize>,
    max_retrieval_iterations: Option<usize>,
    query_variations: Option<usize>,
    context_window_size: Option<usize>,
    reserve_prompt_tokens: Option<usize>,
    reserve_response_tokens: Option<usize>,
    oracle_timeout: Option<Duration>,
    oracle_model: Option<String>,
    oracle_api_key: Option<String>,
    oracle_base_url: Option<String>,
}

impl ConfigBuilder {
    /// Populates unset fields from `REPOQA_*` environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
            std::env::var(name).ok().and_then(|v| v.parse().ok())
        }

        if self.chunk_size.is_none() {
            self.chunk_size = parse_env("REPOQA_CHUNK_SIZE");
        }
        if self.chunk_overlap.is_none() {
            self.chunk_overlap = parse_env("REPOQA_CHUNK_OVERLAP");
        }
        if self.max_chunks_per_query.is_none() {
            self.max_chunks_per_query = parse_env("REPOQA_MAX_CHUNKS_PER_QUERY");
        }
        if self.max_citations.is_none() {
            self.max_citations = parse_env("REPOQA_MAX_CITATIONS");
        }
        if self.max_retrieval_iterations.is_none() {
            self.max_retrieval_iterations = parse_env("REPOQA_MAX_RETRIEVAL_ITERATIONS");
        }
        if self.query_variations.is_none() {
            self.query_variations = parse_env("REPOQA_QUERY_VARIATIONS");
        }
        if self.context_window_size.is_none() {
            self.context_window_size = parse_env("REPOQA_CONTEXT_WINDOW_SIZE");
        }
        if self.oracle_timeout.is_none() {
            self.oracle_timeout =
                parse_env::<u64>("REPOQA_ORACLE_TIMEOUT_SECS").map(Duration::from_secs);
        }
        if self.oracle_model.is_none() {
            self.oracle_model = std::env::var("REPOQA_ORACLE_MODEL").ok();
        }
        if self.oracle_api_key.is_none() {
            self.oracle_api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("REPOQA_API_KEY"))
                .ok();
        }
        if self.oracle_base_url.is_none() {
            self.oracle_base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("REPOQA_BASE_URL"))
                .ok();
        }
        self
    }

    /// Sets the target chunk size in tokens.
    #[must_use]
    pub const fn chunk_size(mut self, tokens: usize) -> Self {
        self.chunk_size = Some(tokens);
        self
    }

    /// Sets the chunk overlap in tokens.
    #[must_use]
    pub const fn chunk_overlap(mut self, tokens: usize) -> Self {
        self.chunk_overlap = Some(tokens);
        self
    }

    /// Sets the per-query result cap.
    #[must_use]
    pub const fn max_chunks_per_query(mut self, k: usize) -> Self {
        self.max_chunks_per_query = Some(k);
        self
    }

    /// Sets the accumulated-chunk cap.
    #[must_use]
    pub const fn max_citations(mut self, n: usize) -> Self {
        self.max_citations = Some(n);
        self
    }

    /// Sets the maximum verify/retrieve iterations.
    #[must_use]
    pub const fn max_retrieval_iterations(mut self, n: usize) -> Self {
        self.max_retrieval_iterations = Some(n);
        self
    }

    /// Sets the number of query variations per base query.
    #[must_use]
    pub const fn query_variations(mut self, n: usize) -> Self {
        self.query_variations = Some(n);
        self
    }

    /// Sets the synthesizer context window in tokens.
    #[must_use]
    pub const fn context_window_size(mut self, tokens: usize) -> Self {
        self.context_window_size = Some(tokens);
        self
    }

    /// Sets the prompt-template token reserve.
    #[must_use]
    pub const fn reserve_prompt_tokens(mut self, tokens: usize) -> Self {
        self.reserve_prompt_tokens = Some(tokens);
        self
    }

    /// Sets the response token reserve.
    #[must_use]
    pub const fn reserve_response_tokens(mut self, tokens: usize) -> Self {
        self.reserve_response_tokens = Some(tokens);
        self
    }

    /// Sets the oracle request timeout.
    #[must_use]
    pub const fn oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = Some(timeout);
        self
    }

    /// Sets the oracle model identifier.
    #[must_use]
    pub fn oracle_model(mut self, model: impl Into<String>) -> Self {
        self.oracle_model = Some(model.into());
        self
    }

    /// Sets the oracle API key.
    #[must_use]
    pub fn oracle_api_key(mut self, key: impl Into<String>) -> Self {
        self.oracle_api_key = Some(key.into());
        self
    }

    /// Sets the oracle base URL override.
    #[must_use]
    pub fn oracle_base_url(mut self, url: impl Into<String>) -> Self {
        self.oracle_base_url = Some(url.into());
        self
    }

    /// Builds the configuration, validating cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the overlap is not smaller than the
    /// chunk size or the context reserves exceed the window.
    pub fn build(self) -> Result<Config, Error> {
        let mut config = Config::default();
        if let Some(v) = self.chunk_size {
            config.chunk_size = v;
        }
        if let Some(v) = self.chunk_overlap {
            config.chunk_overlap = v;
        }
        if let Some(v) = self.max_chunks_per_query {
            config.max_chunks_per_query = v;
        }
        if let Some(v) = self.max_citations {
            config.max_citations = v;
        }
        if let Some(v) = self.max_retrieval_iterations {
            config.max_retrieval_iterations = v;
        }
        if let Some(v) = self.query_variations {
            config.query_variations = v;
        }
        if let Some(v) = self.context_window_size {
            config.context_window_size = v;
        }
        if let Some(v) = self.reserve_prompt_tokens {
            config.reserve_prompt_tokens = v;
        }
        if let Some(v) = self.reserve_response_tokens {
            config.reserve_response_tokens = v;
        }
        if let Some(v) = self.oracle_timeout {
            config.oracle_timeout = v;
        }
        if let Some(v) = self.oracle_model {
            config.oracle_model = v;
        }
        if let Some(v) = self.oracle_api_key {
            config.oracle_api_key = v;
        }
        if let Some(v) = self.oracle_base_url {
            config.oracle_base_url = Some(v);
        }

        if config.chunk_overlap >= config.chunk_size {
            return Err(Error::Config {
                message: format!(
                    "chunk_overlap ({}) must be less than chunk_size ({})",
                    config.chunk_overlap, config.chunk_size
                ),
            });
        }
        if config.context_budget() == 0 {
            return Err(Error::Config {
                message: "context window leaves no budget after reserves".to_string(),
            });
        }

        Ok(config)
    }
}
