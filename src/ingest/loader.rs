//! Source providers: enumerating the files of a repository.
//!
//! The engine consumes `(relative_path, bytes)` pairs; where they come
//! from is a provider concern. [`FsSourceProvider`] walks a local tree,
//! skipping vendored directories, lock files, binaries, and hidden
//! entries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;
use walkdir::WalkDir;

use crate::core::RepoStats;
use crate::error::{IndexError, Result};
use crate::tables::{
    BINARY_EXTENSIONS, IGNORE_DIRS, IGNORE_FILES, KEY_FILE_PATTERNS, SOURCE_EXTENSIONS,
};

/// Bytes sniffed when deciding whether an extensionless file is text.
const TEXT_SNIFF_BYTES: usize = 512;

/// Key files reported per matching pattern.
const KEY_FILES_PER_PATTERN: usize = 2;

/// A depth-limited view of the repository tree.
///
/// Directories map entry names to subtrees; files are leaves. Serializes
/// to the nested-object shape clients expect (`null` for files).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FileTree {
    /// A directory and its visible entries.
    Directory(BTreeMap<String, FileTree>),
    /// A file leaf.
    File,
}

impl FileTree {
    /// Names of the top-level entries, directories carrying a trailing
    /// slash. Empty for a file leaf.
    #[must_use]
    pub fn top_level_entries(&self) -> Vec<String> {
        match self {
            Self::File => Vec::new(),
            Self::Directory(entries) => entries
                .iter()
                .map(|(name, tree)| match tree {
                    Self::Directory(_) => format!("{name}/"),
                    Self::File => name.clone(),
                })
                .collect(),
        }
    }
}

/// One source file, path relative to the repository root.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Repo-relative path with `/` separators.
    pub relative_path: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
    /// Language tag derived from the extension.
    pub language: String,
}

/// Trait for repository content sources.
pub trait SourceProvider {
    /// The origin string identifying the repository (URL or absolute
    /// path); the repo id is derived from it.
    fn origin(&self) -> &str;

    /// Enumerates the indexable files.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be enumerated at all;
    /// individual unreadable files are skipped with a log line.
    fn files(&self) -> Result<Vec<SourceFile>>;
}

/// Filesystem walk over a local repository.
pub struct FsSourceProvider {
    root: PathBuf,
    origin: String,
}

impl FsSourceProvider {
    /// Creates a provider rooted at a local directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist or is not a directory.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(IndexError::SourceUnavailable {
                path: root.display().to_string(),
            }
            .into());
        }
        let origin = root
            .canonicalize()
            .unwrap_or_else(|_| root.clone())
            .display()
            .to_string();
        Ok(Self { root, origin })
    }

    /// Lists repository files, optionally filtered by pattern.
    ///
    /// A pattern containing `*` is matched as a glob against the file
    /// name (e.g. `*.py`); any other pattern is a substring match against
    /// the relative path. Hidden entries and vendored directories are
    /// skipped; unlike [`files`](Self::files), the result is not limited
    /// to indexable source files.
    #[must_use]
    pub fn list_files(&self, pattern: Option<&str>) -> Vec<String> {
        let mut paths: Vec<String> = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(Self::should_descend)
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                !entry.file_name().to_string_lossy().starts_with('.')
            })
            .map(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.root)
                    .unwrap_or_else(|_| entry.path())
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .filter(|relative| match pattern {
                None => true,
                Some(pattern) if pattern.contains('*') => {
                    let name = relative.rsplit('/').next().unwrap_or(relative);
                    wildcard_match(pattern, name)
                }
                Some(pattern) => relative.contains(pattern),
            })
            .collect();

        paths.sort();
        paths
    }

    /// Builds the directory structure of the repository, at most
    /// `max_depth` levels deep. Hidden entries and vendored directories
    /// are skipped.
    #[must_use]
    pub fn file_structure(&self, max_depth: usize) -> FileTree {
        FileTree::Directory(build_tree(&self.root, 0, max_depth))
    }

    /// Identifies key files (entry points, main modules), at most
    /// [`KEY_FILES_PER_PATTERN`] per pattern and `top_n` overall.
    #[must_use]
    pub fn key_files(&self, top_n: usize) -> Vec<String> {
        let files = self.list_files(None);
        let mut key_files: Vec<String> = Vec::new();

        for pattern in KEY_FILE_PATTERNS {
            let mut per_pattern = 0;
            for file in &files {
                if key_files.len() >= top_n {
                    return key_files;
                }
                if per_pattern >= KEY_FILES_PER_PATTERN {
                    break;
                }
                let name = file.rsplit('/').next().unwrap_or(file).to_lowercase();
                if name.contains(pattern) && !key_files.contains(file) {
                    key_files.push(file.clone());
                    per_pattern += 1;
                }
            }
        }

        key_files
    }

    fn should_descend(entry: &walkdir::DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if entry.depth() == 0 {
            return true;
        }
        if entry.file_type().is_dir() {
            return !name.starts_with('.') && !IGNORE_DIRS.contains(&name.as_ref());
        }
        true
    }

    fn wants_file(path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if name.starts_with('.') || IGNORE_FILES.contains(&name.as_str()) {
            return false;
        }

        match path.extension().map(|e| e.to_string_lossy().to_lowercase()) {
            Some(ext) if BINARY_EXTENSIONS.contains(&ext.as_str()) => false,
            Some(ext) => SOURCE_EXTENSIONS.contains(&ext.as_str()),
            None => is_text_file(path),
        }
    }
}

impl SourceProvider for FsSourceProvider {
    fn origin(&self) -> &str {
        &self.origin
    }

    fn files(&self) -> Result<Vec<SourceFile>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(Self::should_descend)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !Self::wants_file(entry.path()) {
                continue;
            }

            let bytes = match std::fs::read(entry.path()) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "skipping unreadable file");
                    continue;
                }
            };

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");

            files.push(SourceFile {
                language: language_from_extension(entry.path()).to_string(),
                relative_path: relative,
                bytes,
            });
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(files)
    }
}

/// Builds one level of the repository tree.
fn build_tree(path: &Path, depth: usize, max_depth: usize) -> BTreeMap<String, FileTree> {
    let mut tree = BTreeMap::new();
    if depth >= max_depth {
        return tree;
    }
    let Ok(entries) = std::fs::read_dir(path) else {
        return tree;
    };

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || IGNORE_DIRS.contains(&name.as_str()) {
            continue;
        }
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            tree.insert(
                name,
                FileTree::Directory(build_tree(&entry.path(), depth + 1, max_depth)),
            );
        } else {
            tree.insert(name, FileTree::File);
        }
    }

    tree
}

/// Glob match supporting `*` (any run of characters).
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut mark = 0usize;

    while ti < text.len() {
        if pi < pattern.len() && (pattern[pi] == text[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < pattern.len() && pattern[pi] == '*' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }
    while pi < pattern.len() && pattern[pi] == '*' {
        pi += 1;
    }
    pi == pattern.len()
}

/// Checks a sample of the file for binary content.
fn is_text_file(path: &Path) -> bool {
    use std::io::Read;

    let Ok(mut file) = std::fs::File::open(path) else {
        return false;
    };
    let mut sample = [0u8; TEXT_SNIFF_BYTES];
    let Ok(read) = file.read(&mut sample) else {
        return false;
    };
    let sample = &sample[..read];
    !sample.contains(&0) && std::str::from_utf8(sample).is_ok()
}

/// Maps a file extension to its language tag.
#[must_use]
pub fn language_from_extension(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("py") => "python",
        Some("js" | "jsx") => "javascript",
        Some("ts" | "tsx") => "typescript",
        Some("java") => "java",
        Some("go") => "go",
        Some("rs") => "rust",
        Some("c" | "h") => "c",
        Some("cpp" | "hpp") => "cpp",
        Some("cs") => "csharp",
        Some("php") => "php",
        Some("rb") => "ruby",
        Some("swift") => "swift",
        Some("kt") => "kotlin",
        Some("scala") => "scala",
        Some("sh" | "bash") => "bash",
        Some("sql") => "sql",
        Some("md") => "markdown",
        Some("yaml" | "yml") => "yaml",
        Some("json") => "json",
        Some("xml") => "xml",
        Some("html") => "html",
        Some("css") => "css",
        _ => "unknown",
    }
}

/// Computes per-language file counts.
#[must_use]
pub fn repo_stats(files: &[SourceFile]) -> RepoStats {
    let mut stats = RepoStats {
        total_files: files.len(),
        ..RepoStats::default()
    };
    for file in files {
        *stats.by_language.entry(file.language.clone()).or_insert(0) += 1;
    }
    stats
}
