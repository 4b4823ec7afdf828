//! Architecture overview generation.
//!
//! Composes the repository's stats, key files, and directory structure
//! into a prompt and asks the oracle for a short onboarding-oriented
//! summary. Exploration of the tree degrades gracefully: a missing or
//! unreadable repository root yields an empty file view and the summary
//! is generated from the stats alone.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::SUMMARY_TEMPERATURE;
use crate::core::RepoStats;
use crate::error::{Result, StorageError};
use crate::ingest::{FileTree, FsSourceProvider};
use crate::oracle::Oracle;
use crate::store::CorpusStore;

/// Summary emitted when the oracle is unavailable.
pub const SUMMARY_UNAVAILABLE: &str = "Could not generate summary";

/// Key files included in the report and the prompt.
const MAX_KEY_FILES: usize = 10;

/// Depth of the reported directory structure.
const STRUCTURE_DEPTH: usize = 3;

/// Top-level entries included in the prompt.
const MAX_STRUCTURE_ENTRIES: usize = 10;

/// Languages included in the prompt.
const MAX_LANGUAGES: usize = 5;

/// An architecture overview of one indexed repository.
#[derive(Debug, Clone, Serialize)]
pub struct ArchitectureReport {
    /// Repository id.
    pub repo_id: String,
    /// Oracle-generated 2-3 paragraph overview.
    pub summary: String,
    /// Entry points and main modules.
    pub key_files: Vec<String>,
    /// Depth-limited directory structure.
    pub file_structure: FileTree,
}

/// Generates an architecture summary for an indexed repository.
///
/// # Errors
///
/// Returns [`StorageError::RepoNotFound`] for an unknown repository id.
/// Oracle failures are absorbed: the report carries
/// [`SUMMARY_UNAVAILABLE`] instead.
pub async fn generate_summary(
    store: &CorpusStore,
    oracle: &dyn Oracle,
    repo_id: &str,
) -> Result<ArchitectureReport> {
    let repo = store
        .get_repo(repo_id)?
        .ok_or_else(|| StorageError::RepoNotFound {
            repo_id: repo_id.to_string(),
        })?;

    let (key_files, file_structure) = match FsSourceProvider::new(&repo.local_path) {
        Ok(provider) => (
            provider.key_files(MAX_KEY_FILES),
            provider.file_structure(STRUCTURE_DEPTH),
        ),
        Err(e) => {
            debug!(repo_id, error = %e, "repository tree unavailable, summarizing from stats");
            (Vec::new(), FileTree::Directory(BTreeMap::new()))
        }
    };

    let prompt = summary_prompt(&repo.stats, &key_files, &file_structure);
    let summary = match oracle.complete(&prompt, SUMMARY_TEMPERATURE).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) | Err(_) => SUMMARY_UNAVAILABLE.to_string(),
    };

    info!(
        repo_id,
        key_files = key_files.len(),
        "architecture summary generated"
    );
    Ok(ArchitectureReport {
        repo_id: repo_id.to_string(),
        summary,
        key_files,
        file_structure,
    })
}

fn summary_prompt(stats: &RepoStats, key_files: &[String], file_structure: &FileTree) -> String {
    let languages = stats
        .by_language
        .iter()
        .take(MAX_LANGUAGES)
        .map(|(lang, count)| format!("{lang}: {count} files"))
        .collect::<Vec<_>>()
        .join(", ");

    let key_files_text = key_files
        .iter()
        .take(MAX_KEY_FILES)
        .map(|f| format!("- {f}"))
        .collect::<Vec<_>>()
        .join("\n");

    let structure_text = file_structure
        .top_level_entries()
        .into_iter()
        .take(MAX_STRUCTURE_ENTRIES)
        .map(|entry| format!("- {entry}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r"Analyze this codebase structure and generate a 2-3 paragraph architecture overview.

Repository Stats:
- Total files: {}
- Languages: {languages}

Key Files:
{key_files_text}

Top-level Structure:
{structure_text}

Focus on:
1. Overall architecture pattern (MVC, microservices, monolith, etc.)
2. Main components and their responsibilities
3. Technology stack
4. Data flow

Provide a clear, concise summary suitable for onboarding a new developer.",
        stats.total_files
    )
}
