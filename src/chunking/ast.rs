//! Grammar-driven chunking at definition boundaries.
//!
//! Parses recognized languages with tree-sitter and emits one chunk per
//! top-level definition, with a captured leading comment/docstring block
//! and signature metadata. Definitions that blow the token budget even
//! without context are skipped; the size strategy re-chunks such files.

use tree_sitter::{Language, Node, Parser};

use super::{extract_imports, Chunker, MAX_SIZE_FACTOR};
use crate::core::{ChunkInfo, ChunkingMethod, CodeChunk};
use crate::error::{ChunkingError, Result};
use crate::tokens::count_tokens;

/// Node kinds treated as chunkable definitions.
const DEFINITION_KINDS: &[&str] = &[
    "function_definition",
    "class_definition",
    "method_definition",
    "function_declaration",
    "class_declaration",
    "method_declaration",
    // Rust grammar equivalents
    "function_item",
    "struct_item",
    "impl_item",
];

/// Node kinds holding a definition's name.
const NAME_KINDS: &[&str] = &["identifier", "name", "type_identifier"];

/// Node kinds holding a definition's parameter list.
const PARAMETER_KINDS: &[&str] = &["parameters", "formal_parameters"];

/// Node kinds holding a definition's return type.
const RETURN_KINDS: &[&str] = &["type", "return_type", "type_annotation"];

/// Maximum imports recorded per chunk.
const MAX_IMPORTS: usize = 10;

/// Maximum parameters recorded per chunk.
const MAX_PARAMETERS: usize = 5;

/// True if the language has a grammar wired up.
#[must_use]
pub fn supports_language(language: &str) -> bool {
    grammar_for(language).is_some()
}

fn grammar_for(language: &str) -> Option<Language> {
    match language {
        "python" => Some(tree_sitter_python::LANGUAGE.into()),
        "javascript" => Some(tree_sitter_javascript::LANGUAGE.into()),
        "typescript" => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        "java" => Some(tree_sitter_java::LANGUAGE.into()),
        "go" => Some(tree_sitter_go::LANGUAGE.into()),
        "rust" => Some(tree_sitter_rust::LANGUAGE.into()),
        _ => None,
    }
}

/// Chunks a file at definition boundaries.
///
/// # Errors
///
/// Returns [`ChunkingError::Grammar`] if the grammar cannot be loaded and
/// [`ChunkingError::ParseFailed`] if the parser produces no tree. The
/// caller falls back to size chunking on either.
pub fn chunk_with_grammar(
    chunker: &Chunker,
    repo_id: &str,
    file_path: &str,
    content: &str,
    language: &str,
) -> Result<Vec<CodeChunk>> {
    let Some(grammar) = grammar_for(language) else {
        return Ok(Vec::new());
    };

    let mut parser = Parser::new();
    parser
        .set_language(&grammar)
        .map_err(|_| ChunkingError::Grammar {
            language: language.to_string(),
        })?;

    let tree = parser
        .parse(content, None)
        .ok_or_else(|| ChunkingError::ParseFailed {
            file_path: file_path.to_string(),
        })?;

    let lines: Vec<&str> = content.lines().collect();
    let imports: Vec<String> = extract_imports(content, language)
        .into_iter()
        .take(MAX_IMPORTS)
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let token_limit = (chunker.chunk_size as f64 * MAX_SIZE_FACTOR) as usize;

    let mut chunks = Vec::new();
    let root = tree.root_node();
    let mut cursor = root.walk();

    for child in root.children(&mut cursor) {
        if !DEFINITION_KINDS.contains(&child.kind()) {
            continue;
        }

        let start_line = child.start_position().row + 1;
        let end_line = child.end_position().row + 1;
        if start_line > end_line || end_line > lines.len() {
            continue;
        }

        let symbol_name = find_symbol(child, content);
        let (parameters, return_type) = extract_signature(child, content);
        let code = lines[start_line - 1..end_line].join("\n");
        let context = leading_context(&lines, start_line, chunker.max_context_lines);

        let (chunk_text, has_context) = if context.is_empty() {
            (code, false)
        } else {
            (format!("{context}\n{code}"), true)
        };

        // Over budget with context: retry bare. Still over: leave the file
        // segment to the size strategy.
        let (chunk_text, has_context) = if count_tokens(&chunk_text) > token_limit {
            let bare = lines[start_line - 1..end_line].join("\n");
            if count_tokens(&bare) > token_limit {
                continue;
            }
            (bare, false)
        } else {
            (chunk_text, has_context)
        };

        let mut info = ChunkInfo::new(ChunkingMethod::Ast);
        info.imports.clone_from(&imports);
        info.parameters = parameters;
        info.return_type = return_type;
        info.has_context = has_context;

        chunks.push(CodeChunk::new(
            repo_id,
            file_path,
            language,
            start_line,
            end_line,
            symbol_name,
            chunk_text,
            info,
        ));
    }

    Ok(chunks)
}

fn find_symbol(node: Node<'_>, content: &str) -> Option<String> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if NAME_KINDS.contains(&child.kind()) {
            return content.get(child.byte_range()).map(ToString::to_string);
        }
    }
    None
}

fn extract_signature(node: Node<'_>, content: &str) -> (Vec<String>, Option<String>) {
    let mut parameters = Vec::new();
    let mut return_type = None;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let kind = child.kind();
        if PARAMETER_KINDS.contains(&kind) {
            if let Some(text) = content.get(child.byte_range()) {
                parameters = text
                    .trim_start_matches('(')
                    .trim_end_matches(')')
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .take(MAX_PARAMETERS)
                    .map(ToString::to_string)
                    .collect();
            }
        } else if RETURN_KINDS.contains(&kind) && return_type.is_none() {
            return_type = content.get(child.byte_range()).map(ToString::to_string);
        }
    }

    (parameters, return_type)
}

/// Collects the comment/docstring block directly above a definition.
///
/// Scans upward from the line above the definition, at most
/// `max_context_lines` lines, taking comment-prefixed lines and blanks
/// interspersed among them; stops at the first other line. Blank edges are
/// trimmed so a run of only blanks yields no context.
fn leading_context(lines: &[&str], start_line: usize, max_context_lines: usize) -> String {
    if start_line <= 1 {
        return String::new();
    }

    let is_comment = |line: &str| {
        line.starts_with('#')
            || line.starts_with("//")
            || line.starts_with("/*")
            || line.starts_with('*')
            || line.starts_with("\"\"\"")
            || line.starts_with("'''")
    };

    let first_above = start_line - 2; // 0-indexed line above the definition
    let lowest = first_above.saturating_sub(max_context_lines.saturating_sub(1));

    let mut collected: Vec<&str> = Vec::new();
    for idx in (lowest..=first_above).rev() {
        let trimmed = lines[idx].trim();
        if is_comment(trimmed) {
            collected.push(lines[idx]);
        } else if trimmed.is_empty() {
            collected.push(lines[idx]);
        } else {
            break;
        }
    }

    collected.reverse();

    // Trim blank edges; blanks only count between comment lines
    let start = collected.iter().position(|l| !l.trim().is_empty());
    let end = collected.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(s), Some(e)) if collected[s..=e].iter().any(|l| is_comment(l.trim())) => {
            collected[s..=e].join("\n")
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn chunker() -> Chunker {
        Chunker::from_config(&Config::default())
    }

    fn chunk_python(content: &str) -> Vec<CodeChunk> {
        chunk_with_grammar(&chunker(), "repo", "mod.py", content, "python").unwrap()
    }

    #[test]
    fn test_supported_languages() {
        for lang in ["python", "javascript", "typescript", "java", "go", "rust"] {
            assert!(supports_language(lang), "{lang} should be supported");
        }
        assert!(!supports_language("cobol"));
    }

    #[test]
    fn test_python_functions_and_classes() {
        let content = "\
def first(a, b):
    return a + b


class Widget:
    def method(self):
        pass


def second():
    pass
";
        let chunks = chunk_python(content);
        assert_eq!(chunks.len(), 3);

        let symbols: Vec<_> = chunks.iter().filter_map(|c| c.symbol_name.as_deref()).collect();
        assert_eq!(symbols, vec!["first", "Widget", "second"]);
        assert!(chunks.iter().all(|c| c.info.method == ChunkingMethod::Ast));
    }

    #[test]
    fn test_ast_chunks_do_not_overlap() {
        let content = "\
def a():
    pass


def b():
    pass


def c():
    pass
";
        let chunks = chunk_python(content);
        for pair in chunks.windows(2) {
            assert!(pair[0].end_line < pair[1].start_line);
        }
    }

    #[test]
    fn test_line_ranges_are_valid() {
        let content = "def solo():\n    return 1\n";
        let chunks = chunk_python(content);
        assert_eq!(chunks.len(), 1);
        let line_count = content.lines().count();
        assert!(chunks[0].start_line >= 1);
        assert!(chunks[0].start_line <= chunks[0].end_line);
        assert!(chunks[0].end_line <= line_count);
    }

    #[test]
    fn test_leading_comment_becomes_context() {
        let content = "\
# Validates the session token.
# Raises on expiry.
def validate(token):
    return token
";
        let chunks = chunk_python(content);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].info.has_context);
        assert!(chunks[0].chunk_text.starts_with("# Validates the session token."));
        assert!(chunks[0].chunk_text.contains("def validate"));
    }

    #[test]
    fn test_context_stops_at_code_line() {
        let content = "\
x = compute()
# belongs to f
def f():
    pass
";
        let chunks = chunk_python(content);
        let f = chunks.iter().find(|c| c.symbol_name.as_deref() == Some("f")).unwrap();
        assert!(f.chunk_text.starts_with("# belongs to f"));
        assert!(!f.chunk_text.contains("compute"));
    }

    #[test]
    fn test_blank_lines_between_comments_kept() {
        let content = "\
# first comment

# second comment
def g():
    pass
";
        let chunks = chunk_python(content);
        assert!(chunks[0].chunk_text.contains("# first comment"));
        assert!(chunks[0].chunk_text.contains("# second comment"));
    }

    #[test]
    fn test_signature_extraction() {
        let content = "def add(a, b, c):\n    return a + b + c\n";
        let chunks = chunk_python(content);
        assert_eq!(chunks[0].info.parameters, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parameters_capped_at_five() {
        let content = "def many(a, b, c, d, e, f, g):\n    pass\n";
        let chunks = chunk_python(content);
        assert_eq!(chunks[0].info.parameters.len(), 5);
    }

    #[test]
    fn test_imports_recorded() {
        let content = "\
import os
import sys

def f():
    pass
";
        let chunks = chunk_python(content);
        assert_eq!(chunks[0].info.imports, vec!["import os", "import sys"]);
    }

    #[test]
    fn test_oversized_definition_skipped() {
        let chunker = Chunker {
            chunk_size: 10,
            ..chunker()
        };

        let body: String = (0..100).map(|i| format!("    x{i} = {i}\n")).collect();
        let content = format!("def huge():\n{body}");
        let chunks =
            chunk_with_grammar(&chunker, "repo", "big.py", &content, "python").unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_oversized_context_retried_without() {
        let chunker = Chunker {
            chunk_size: 20,
            ..chunker()
        };

        // Context pushes past the limit; the bare definition fits.
        let comment: String = (0..5)
            .map(|i| format!("# padding comment line number {i} with several words\n"))
            .collect();
        let content = format!("{comment}def small(a):\n    return a\n");
        let chunks =
            chunk_with_grammar(&chunker, "repo", "mod.py", &content, "python").unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(!chunks[0].info.has_context);
        assert!(chunks[0].chunk_text.starts_with("def small"));
    }

    #[test]
    fn test_rust_items() {
        let content = "\
fn main() {
    println!(\"hi\");
}

struct Config {
    value: u32,
}
";
        let chunks =
            chunk_with_grammar(&chunker(), "repo", "main.rs", content, "rust").unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].symbol_name.as_deref(), Some("main"));
        assert_eq!(chunks[1].symbol_name.as_deref(), Some("Config"));
    }

    #[test]
    fn test_go_functions() {
        let content = "\
package main

func Handler(w int) int {
\treturn w
}
";
        let chunks = chunk_with_grammar(&chunker(), "repo", "main.go", content, "go").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].symbol_name.as_deref(), Some("Handler"));
    }

    #[test]
    fn test_unsupported_language_yields_empty() {
        let chunks =
            chunk_with_grammar(&chunker(), "repo", "x.cfg", "key = value", "cfg").unwrap();
        assert!(chunks.is_empty());
    }
}
