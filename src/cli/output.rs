//! Output rendering for CLI results.

use crate::architecture::ArchitectureReport;
use crate::core::{AgentState, RepoMetadata};
use crate::error::Error;
use crate::ingest::{FileTree, IndexStatus};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// One JSON document.
    Json,
}

impl OutputFormat {
    /// Parses a format name, defaulting to text.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Renders an error for the chosen format.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => {
            serde_json::json!({ "error": error.to_string() }).to_string()
        }
    }
}

/// Renders an indexed repository line.
#[must_use]
pub fn render_repo(meta: &RepoMetadata) -> String {
    format!(
        "{}  {}  ({} files)",
        meta.repo_id, meta.local_path, meta.stats.total_files
    )
}

/// Renders the repository list.
#[must_use]
pub fn render_repo_list(repos: &[RepoMetadata], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(repos).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Text => {
            if repos.is_empty() {
                "No repositories indexed.".to_string()
            } else {
                repos.iter().map(render_repo).collect::<Vec<_>>().join("\n")
            }
        }
    }
}

/// Renders an indexing status.
#[must_use]
pub fn render_status(repo_id: &str, status: &IndexStatus, format: OutputFormat) -> String {
    match status {
        IndexStatus::NotFound => match format {
            OutputFormat::Text => format!("{repo_id}: not indexed"),
            OutputFormat::Json => {
                serde_json::json!({ "repo_id": repo_id, "status": "not_found" }).to_string()
            }
        },
        IndexStatus::Completed { meta, chunk_count } => match format {
            OutputFormat::Text => format!(
                "{repo_id}: indexed ({} files, {chunk_count} chunks)",
                meta.stats.total_files
            ),
            OutputFormat::Json => serde_json::json!({
                "repo_id": repo_id,
                "status": "completed",
                "stats": meta.stats,
                "chunk_count": chunk_count,
            })
            .to_string(),
        },
    }
}

/// Renders an architecture report.
#[must_use]
pub fn render_architecture(report: &ArchitectureReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Text => {
            let mut out = report.summary.clone();

            if !report.key_files.is_empty() {
                out.push_str("\n\nKey files:\n");
                for file in &report.key_files {
                    out.push_str(&format!("- {file}\n"));
                }
            }

            let mut tree = String::new();
            render_tree(&report.file_structure, 0, &mut tree);
            if !tree.is_empty() {
                out.push_str("\nStructure:\n");
                out.push_str(&tree);
            }

            out
        }
    }
}

/// Renders a file tree as an indented listing, directories first with a
/// trailing slash.
fn render_tree(tree: &FileTree, depth: usize, out: &mut String) {
    let FileTree::Directory(entries) = tree else {
        return;
    };
    let indent = "  ".repeat(depth);
    for (name, subtree) in entries {
        match subtree {
            FileTree::Directory(_) => {
                out.push_str(&format!("{indent}{name}/\n"));
                render_tree(subtree, depth + 1, out);
            }
            FileTree::File => out.push_str(&format!("{indent}{name}\n")),
        }
    }
}

/// Renders a finished answer, including the trace when verbose.
#[must_use]
pub fn render_answer(state: &AgentState, format: OutputFormat, verbose: bool) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(state).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Text => {
            let mut out = state.final_answer.clone().unwrap_or_default();
            if verbose {
                out.push_str("\n\n--- Reasoning trace ---\n");
                for entry in &state.reasoning_trace {
                    out.push_str(&format!("- {entry}\n"));
                }
            }
            out
        }
    }
}
