//! Semantic chunking of source files.
//!
//! Two strategies: grammar-driven chunking at definition boundaries
//! ([`ast`]) for recognized languages, and token-bounded sliding-window
//! chunking ([`size`]) as the fallback. Both feed a merge pass that folds
//! undersized chunks into their neighbor.
//!
//! Chunking never fails the ingest pipeline: parser trouble falls through
//! to the size strategy, unreadable input yields an empty list.

pub mod ast;
pub mod size;

use tracing::{debug, warn};

use crate::config::Config;
use crate::core::CodeChunk;
use crate::tokens::count_tokens;

/// Chunk text may exceed the target size by at most this factor.
pub const MAX_SIZE_FACTOR: f64 = 1.5;

/// Merged chunks may occupy at most this fraction of the target size.
pub const MERGE_SIZE_FACTOR: f64 = 1.2;

/// File chunker with size and context settings.
#[derive(Debug, Clone)]
pub struct Chunker {
    /// Target chunk size in tokens.
    pub chunk_size: usize,
    /// Overlap between size-based chunks in tokens.
    pub chunk_overlap: usize,
    /// Chunks below this token count are merged into a neighbor.
    pub min_chunk_size_tokens: usize,
    /// Lines scanned above a definition for comments/docstrings.
    pub max_context_lines: usize,
}

impl Chunker {
    /// Creates a chunker from engine configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            min_chunk_size_tokens: config.min_chunk_size_tokens,
            max_context_lines: config.max_context_lines,
        }
    }

    /// Chunks one file into ordered [`CodeChunk`]s.
    ///
    /// Recognized languages go through the AST strategy first; anything
    /// else, and any file the parser rejects, is chunked by size. Small
    /// chunks are merged afterwards in both paths.
    #[must_use]
    pub fn chunk_file(
        &self,
        repo_id: &str,
        file_path: &str,
        bytes: &[u8],
        language: &str,
    ) -> Vec<CodeChunk> {
        if bytes.is_empty() {
            return Vec::new();
        }
        let content = String::from_utf8_lossy(bytes);

        if ast::supports_language(language) {
            match ast::chunk_with_grammar(self, repo_id, file_path, &content, language) {
                Ok(chunks) if !chunks.is_empty() => {
                    debug!(file_path, chunks = chunks.len(), "ast chunking");
                    return self.merge_small_chunks(chunks);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(file_path, error = %e, "ast chunking failed, falling back to size");
                }
            }
        }

        let chunks = size::chunk_by_size(self, repo_id, file_path, &content, language);
        debug!(file_path, chunks = chunks.len(), "size chunking");
        self.merge_small_chunks(chunks)
    }

    /// Folds chunks smaller than the minimum into the following chunk.
    ///
    /// Two adjacent chunks merge when the first is under
    /// `min_chunk_size_tokens` and the combined text stays within
    /// [`MERGE_SIZE_FACTOR`] of the target size. The merged chunk takes the
    /// union line span and records both symbols.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn merge_small_chunks(&self, chunks: Vec<CodeChunk>) -> Vec<CodeChunk> {
        if chunks.is_empty() {
            return chunks;
        }

        let limit = (self.chunk_size as f64 * MERGE_SIZE_FACTOR) as usize;
        let mut merged: Vec<CodeChunk> = Vec::with_capacity(chunks.len());
        let mut iter = chunks.into_iter().peekable();

        while let Some(current) = iter.next() {
            let current_tokens = count_tokens(&current.chunk_text);
            let combined = if current_tokens < self.min_chunk_size_tokens {
                iter.peek()
                    .map(|next| format!("{}\n\n{}", current.chunk_text, next.chunk_text))
                    .filter(|text| count_tokens(text) <= limit)
            } else {
                None
            };

            if let Some(text) = combined {
                if let Some(next) = iter.next() {
                    merged.push(merge_pair(current, next, text));
                    continue;
                }
            }
            merged.push(current);
        }

        merged
    }
}

fn merge_pair(first: CodeChunk, second: CodeChunk, combined_text: String) -> CodeChunk {
    let mut info = first.info.clone();
    info.merged = true;
    info.merged_symbols = [first.symbol_name.clone(), second.symbol_name.clone()]
        .into_iter()
        .flatten()
        .collect();

    CodeChunk::new(
        first.repo_id.clone(),
        first.file_path.clone(),
        first.language.clone(),
        first.start_line,
        second.end_line,
        first.symbol_name.clone().or(second.symbol_name),
        combined_text,
        info,
    )
}

/// Extracts import statements from file content (for chunk metadata).
#[must_use]
pub fn extract_imports(content: &str, language: &str) -> Vec<String> {
    let matches_import = |line: &str| -> bool {
        match language {
            "python" => {
                line.starts_with("import ")
                    || (line.starts_with("from ") && line.contains(" import "))
            }
            "javascript" | "typescript" => line.starts_with("import "),
            "java" => line.starts_with("import ") && line.ends_with(';'),
            "go" => line.starts_with("import "),
            "rust" => line.starts_with("use ") && line.ends_with(';'),
            _ => false,
        }
    };

    content
        .lines()
        .map(str::trim)
        .filter(|line| matches_import(line))
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChunkInfo, ChunkingMethod};

    fn chunker() -> Chunker {
        Chunker::from_config(&Config::default())
    }

    fn raw_chunk(start: usize, end: usize, text: &str) -> CodeChunk {
        CodeChunk::new(
            "repo",
            "file.py",
            "python",
            start,
            end,
            None,
            text,
            ChunkInfo::new(ChunkingMethod::Ast),
        )
    }

    #[test]
    fn test_empty_file_yields_no_chunks() {
        let chunks = chunker().chunk_file("repo", "empty.py", b"", "python");
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_unknown_language_uses_size_strategy() {
        let content = "line one\nline two\nline three\n";
        let chunks = chunker().chunk_file("repo", "notes.cfg", content.as_bytes(), "unknown");
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].info.method, ChunkingMethod::Size);
    }

    #[test]
    fn test_merge_small_into_next() {
        let small = raw_chunk(1, 2, "tiny");
        let big_text = "word ".repeat(100);
        let big = raw_chunk(3, 40, big_text.trim_end());

        let merged = chunker().merge_small_chunks(vec![small, big]);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].info.merged);
        assert_eq!(merged[0].start_line, 1);
        assert_eq!(merged[0].end_line, 40);
        assert!(merged[0].chunk_text.starts_with("tiny\n\n"));
        // Id reflects the union span
        assert_eq!(merged[0].chunk_id, "repo:file.py:1:40");
    }

    #[test]
    fn test_no_merge_when_first_is_large_enough() {
        let a_text = "word ".repeat(100);
        let a = raw_chunk(1, 20, a_text.trim_end());
        let b_text = "word ".repeat(100);
        let b = raw_chunk(21, 40, b_text.trim_end());

        let merged = chunker().merge_small_chunks(vec![a, b]);
        assert_eq!(merged.len(), 2);
        assert!(!merged[0].info.merged);
    }

    #[test]
    fn test_no_merge_when_combined_too_large() {
        let chunker = Chunker {
            chunk_size: 50,
            ..chunker()
        };

        let small = raw_chunk(1, 1, "tiny");
        let big_text = "word ".repeat(80);
        let big = raw_chunk(2, 40, big_text.trim_end());

        let merged = chunker.merge_small_chunks(vec![small, big]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_records_symbols() {
        let mut small = raw_chunk(1, 2, "tiny");
        small.symbol_name = Some("helper".to_string());
        let big_text = "word ".repeat(100);
        let mut big = raw_chunk(3, 40, big_text.trim_end());
        big.symbol_name = Some("main".to_string());

        let merged = chunker().merge_small_chunks(vec![small, big]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].symbol_name.as_deref(), Some("helper"));
        assert_eq!(merged[0].info.merged_symbols, vec!["helper", "main"]);
    }

    #[test]
    fn test_extract_imports_python() {
        let content = "import os\nfrom pathlib import Path\n\ndef f():\n    pass\n";
        let imports = extract_imports(content, "python");
        assert_eq!(imports, vec!["import os", "from pathlib import Path"]);
    }

    #[test]
    fn test_extract_imports_rust() {
        let content = "use std::fs;\nuse serde::Serialize;\n\nfn main() {}\n";
        let imports = extract_imports(content, "rust");
        assert_eq!(imports.len(), 2);
    }

    #[test]
    fn test_extract_imports_unknown_language() {
        assert!(extract_imports("import anything", "cobol").is_empty());
    }
}
