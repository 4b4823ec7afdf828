//! Code chunk representation.
//!
//! A chunk is a contiguous, citable slice of one source file. The chunk id
//! `<repo>:<filename>:<startLine>:<endLine>` is unique within a repository;
//! line numbers are 1-indexed and inclusive.

use serde::{Deserialize, Serialize};

/// How a chunk was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingMethod {
    /// Grammar-driven chunking at definition boundaries.
    Ast,
    /// Sliding-window chunking by token count.
    Size,
}

/// Side metadata captured while chunking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    /// Strategy that produced the chunk.
    pub method: ChunkingMethod,
    /// Import statements of the file (at most 10).
    #[serde(default)]
    pub imports: Vec<String>,
    /// Parameters of the chunked definition (at most 5).
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Return type of the chunked definition, when the grammar exposes one.
    #[serde(default)]
    pub return_type: Option<String>,
    /// Whether a leading comment/docstring block was captured.
    #[serde(default)]
    pub has_context: bool,
    /// Whether this chunk is the union of merged small chunks.
    #[serde(default)]
    pub merged: bool,
    /// Symbols of the chunks that were merged into this one.
    #[serde(default)]
    pub merged_symbols: Vec<String>,
}

impl ChunkInfo {
    /// Info for a freshly produced chunk of the given method.
    #[must_use]
    pub const fn new(method: ChunkingMethod) -> Self {
        Self {
            method,
            imports: Vec::new(),
            parameters: Vec::new(),
            return_type: None,
            has_context: false,
            merged: false,
            merged_symbols: Vec::new(),
        }
    }
}

/// The atomic retrieval unit: a line span of one source file plus metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeChunk {
    /// `<repo>:<filename>:<startLine>:<endLine>`.
    pub chunk_id: String,
    /// Owning repository id.
    pub repo_id: String,
    /// Repo-relative file path.
    pub file_path: String,
    /// Language tag (e.g. "python", "rust").
    pub language: String,
    /// First line of the span, 1-indexed.
    pub start_line: usize,
    /// Last line of the span, inclusive; `end_line >= start_line`.
    pub end_line: usize,
    /// Name of the chunked function or class, when known.
    pub symbol_name: Option<String>,
    /// Chunk text: the source lines of the span, optionally prefixed by a
    /// captured leading comment/docstring block.
    pub chunk_text: String,
    /// Side metadata.
    pub info: ChunkInfo,
}

impl CodeChunk {
    /// Builds the chunk identifier for a span.
    ///
    /// Uses the file basename, matching the citation-friendly
    /// `repo:filename:start:end` shape.
    #[must_use]
    pub fn make_id(repo_id: &str, file_path: &str, start_line: usize, end_line: usize) -> String {
        let file_name = file_path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(file_path);
        format!("{repo_id}:{file_name}:{start_line}:{end_line}")
    }

    /// Creates a chunk and derives its id from the span.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo_id: impl Into<String>,
        file_path: impl Into<String>,
        language: impl Into<String>,
        start_line: usize,
        end_line: usize,
        symbol_name: Option<String>,
        chunk_text: impl Into<String>,
        info: ChunkInfo,
    ) -> Self {
        let repo_id = repo_id.into();
        let file_path = file_path.into();
        let chunk_id = Self::make_id(&repo_id, &file_path, start_line, end_line);
        Self {
            chunk_id,
            repo_id,
            file_path,
            language: language.into(),
            start_line,
            end_line,
            symbol_name,
            chunk_text: chunk_text.into(),
            info,
        }
    }

    /// Number of lines in the span.
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }
}
