//! Repository metadata and identity.

use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Length of a repository identifier in hex characters.
const REPO_ID_LEN: usize = 12;

/// Derives the stable 12-character hex identifier for a repository origin.
///
/// The origin is the clone URL or the absolute local path. The same origin
/// always yields the same id, so re-ingestion replaces the prior corpus.
///
/// # Examples
///
/// ```
/// use repoqa::core::repo_id_for;
///
/// let id = repo_id_for("/home/user/project");
/// assert_eq!(id.len(), 12);
/// assert_eq!(id, repo_id_for("/home/user/project"));
/// ```
#[must_use]
pub fn repo_id_for(origin: &str) -> String {
    let mut hasher = DefaultHasher::new();
    origin.hash(&mut hasher);
    let hex = format!("{:016x}", hasher.finish());
    hex[..REPO_ID_LEN].to_string()
}

/// Per-repository file statistics gathered at ingestion time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStats {
    /// Total files indexed.
    pub total_files: usize,
    /// File counts keyed by language tag.
    pub by_language: BTreeMap<String, usize>,
}

/// Metadata about an indexed repository.
///
/// Immutable once indexed: re-ingestion fully replaces the row, deletion
/// cascades to all owned chunks and the vector namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoMetadata {
    /// Stable identifier (12 hex chars of the origin).
    pub repo_id: String,
    /// Origin URL, if the repository came from a remote.
    pub url: Option<String>,
    /// Local filesystem root of the repository.
    pub local_path: String,
    /// Commit hash at ingestion time, when known.
    pub commit_hash: Option<String>,
    /// Unix timestamp of the ingestion.
    pub indexed_at: i64,
    /// File statistics.
    pub stats: RepoStats,
}

impl RepoMetadata {
    /// Creates metadata for a local repository rooted at `local_path`.
    #[must_use]
    pub fn local(local_path: impl Into<String>, stats: RepoStats) -> Self {
        let local_path = local_path.into();
        Self {
            repo_id: repo_id_for(&local_path),
            url: None,
            local_path,
            commit_hash: None,
            indexed_at: now_unix(),
            stats,
        }
    }

    /// The vector index namespace owned by this repository.
    #[must_use]
    pub fn namespace(&self) -> String {
        format!("repo_{}", self.repo_id)
    }
}

/// Current Unix timestamp in seconds.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub(crate) fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_id_is_stable() {
        assert_eq!(repo_id_for("https://example.com/a.git"), repo_id_for("https://example.com/a.git"));
    }

    #[test]
    fn test_repo_id_length_and_charset() {
        let id = repo_id_for("/tmp/some/repo");
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_repo_id_differs_by_origin() {
        assert_ne!(repo_id_for("/repo/a"), repo_id_for("/repo/b"));
    }

    #[test]
    fn test_namespace_format() {
        let meta = RepoMetadata::local("/tmp/repo", RepoStats::default());
        assert_eq!(meta.namespace(), format!("repo_{}", meta.repo_id));
    }

    #[test]
    fn test_stats_roundtrip_json() {
        let mut stats = RepoStats {
            total_files: 3,
            by_language: BTreeMap::new(),
        };
        stats.by_language.insert("python".to_string(), 2);
        stats.by_language.insert("go".to_string(), 1);

        let json = serde_json::to_string(&stats).unwrap();
        let back: RepoStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
