//! Token-bounded sliding-window chunking.
//!
//! The fallback strategy for unrecognized languages and files the grammar
//! cannot handle. Accumulates lines until the next line would exceed the
//! target token count, emits the chunk, and restarts with a trailing
//! overlap window sized in tokens. Together the windows cover every line
//! of the file; consecutive windows may overlap.

use super::{extract_imports, Chunker};
use crate::core::{ChunkInfo, ChunkingMethod, CodeChunk};
use crate::tokens::count_tokens;

/// Maximum imports recorded per chunk.
const MAX_IMPORTS: usize = 10;

/// Chunks a file by accumulating lines up to the token target.
#[must_use]
pub fn chunk_by_size(
    chunker: &Chunker,
    repo_id: &str,
    file_path: &str,
    content: &str,
    language: &str,
) -> Vec<CodeChunk> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let imports: Vec<String> = extract_imports(content, language)
        .into_iter()
        .take(MAX_IMPORTS)
        .collect();

    let make_info = || {
        let mut info = ChunkInfo::new(ChunkingMethod::Size);
        info.imports.clone_from(&imports);
        info
    };

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0usize;
    let mut start_line = 1usize;

    for (idx, &line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let line_tokens = count_tokens(line);

        if current_tokens + line_tokens > chunker.chunk_size && !current.is_empty() {
            chunks.push(CodeChunk::new(
                repo_id,
                file_path,
                language,
                start_line,
                line_no - 1,
                None,
                current.join("\n"),
                make_info(),
            ));

            // Trailing overlap window, sized in tokens
            let mut overlap_lines: Vec<&str> = Vec::new();
            let mut overlap_tokens = 0usize;
            for &prev in current.iter().rev() {
                let tokens = count_tokens(prev);
                if overlap_tokens + tokens > chunker.chunk_overlap {
                    break;
                }
                overlap_lines.insert(0, prev);
                overlap_tokens += tokens;
            }

            start_line = line_no - overlap_lines.len();
            overlap_lines.push(line);
            current = overlap_lines;
            current_tokens = overlap_tokens + line_tokens;
        } else {
            current.push(line);
            current_tokens += line_tokens;
        }
    }

    if !current.is_empty() {
        chunks.push(CodeChunk::new(
            repo_id,
            file_path,
            language,
            start_line,
            lines.len(),
            None,
            current.join("\n"),
            make_info(),
        ));
    }

    chunks
}
