//! Static pattern tables used by retrieval, packing, and ingestion.
//!
//! These are data, not logic: the retriever, packer, and loader consult them
//! but never hard-code them, so the vocabularies can evolve without touching
//! the algorithms.

/// Stop words dropped during keyword extraction.
///
/// English interrogatives, auxiliary verbs, articles, and common
/// prepositions.
pub static STOP_WORDS: &[&str] = &[
    "how", "what", "where", "when", "why", "who", "which", "is", "are", "the",
    "a", "an", "in", "on", "at", "to", "for", "of", "with", "by", "from",
    "does", "do", "did", "can", "could", "would", "should", "will", "be",
];

/// Synonym groups for query expansion, keyed by canonical technical term.
///
/// A keyword matches an entry when the key is a substring of the keyword or
/// the keyword is a substring of the key.
pub static QUERY_EXPANSIONS: &[(&str, &[&str])] = &[
    // Authentication & security
    ("auth", &["authentication", "login", "session", "token", "jwt", "oauth", "credential"]),
    ("authentication", &["auth", "login", "session", "token", "jwt", "oauth", "credential"]),
    ("login", &["authentication", "auth", "session", "credential", "signin"]),
    ("session", &["authentication", "auth", "login", "token", "cookie"]),
    ("token", &["jwt", "authentication", "auth", "session", "bearer"]),
    // Database & storage
    ("database", &["db", "datastore", "storage", "persistence", "repository"]),
    ("db", &["database", "datastore", "storage", "persistence"]),
    ("query", &["search", "filter", "select", "find", "retrieve"]),
    ("storage", &["database", "db", "persistence", "cache"]),
    // API & HTTP
    ("api", &["endpoint", "route", "handler", "controller", "service"]),
    ("endpoint", &["api", "route", "handler", "controller"]),
    ("route", &["endpoint", "api", "handler", "path", "url"]),
    ("request", &["http", "api", "endpoint", "call"]),
    ("response", &["return", "output", "result", "reply"]),
    // Error handling
    ("error", &["exception", "failure", "issue", "problem", "bug"]),
    ("exception", &["error", "failure", "throw", "catch"]),
    ("validation", &["validate", "check", "verify", "sanitize"]),
    // Configuration & setup
    ("config", &["configuration", "settings", "options", "parameters"]),
    ("setup", &["initialize", "configure", "install", "bootstrap"]),
    ("init", &["initialize", "setup", "bootstrap", "start"]),
    // Data processing
    ("process", &["handle", "execute", "run", "perform", "do"]),
    ("handle", &["process", "manage", "deal", "execute"]),
    ("transform", &["convert", "change", "modify", "map"]),
    // Testing
    ("test", &["testing", "spec", "unit", "integration", "assert"]),
    ("testing", &["test", "spec", "unit", "integration"]),
    // Common architecture terms
    ("middleware", &["interceptor", "filter", "handler", "processor"]),
    ("service", &["api", "handler", "controller", "manager"]),
    ("model", &["schema", "entity", "data", "structure"]),
    ("view", &["template", "render", "display", "ui"]),
    ("controller", &["handler", "endpoint", "route", "service"]),
];

/// Path fragments that mark a file as a test file.
pub static TEST_FILE_PATTERNS: &[&str] = &[
    "test_", "_test", "spec_", "_spec", ".test.", ".spec.",
    "tests/", "test/", "__tests__/", "specs/", "spec/",
];

/// Path fragments that mark a file as documentation.
pub static DOC_FILE_PATTERNS: &[&str] = &[
    "readme", "changelog", "license", "contributing", "docs/",
    "documentation/", ".md", ".txt", ".rst",
];

/// Basenames that usually anchor a codebase (entry points, routing, docs).
pub static KEY_FILE_PATTERNS: &[&str] = &[
    "main.", "app.", "__init__.", "index.js", "index.ts",
    "server.", "api.", "routes.", "views.",
    "main.java", "application.java", "readme.md",
];

/// Directory names skipped during the repository walk.
pub static IGNORE_DIRS: &[&str] = &[
    "node_modules", ".git", "__pycache__", "venv", "env", ".venv", ".env",
    "dist", "build", ".idea", ".vscode", ".pytest_cache", ".mypy_cache",
    "coverage", "htmlcov", ".tox", ".eggs", "target", "bin", "obj",
    ".gradle", ".mvn",
];

/// File names skipped during the repository walk (lock files, OS litter).
pub static IGNORE_FILES: &[&str] = &[
    "package-lock.json", "yarn.lock", "poetry.lock", "Pipfile.lock",
    "Gemfile.lock", "composer.lock", "Cargo.lock",
    ".DS_Store", "Thumbs.db", ".gitignore", ".dockerignore",
];

/// Extensions that are never text.
pub static BINARY_EXTENSIONS: &[&str] = &[
    "pyc", "pyo", "so", "dylib", "dll", "exe", "bin", "dat",
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    "zip", "tar", "gz", "rar", "7z",
    "jpg", "jpeg", "png", "gif", "bmp", "svg", "ico",
    "mp3", "mp4", "avi", "mov", "wav",
    "ttf", "woff", "woff2", "eot",
];

/// Extensions indexed as source material.
pub static SOURCE_EXTENSIONS: &[&str] = &[
    "py", "js", "jsx", "ts", "tsx", "java", "go", "rs", "c", "cpp",
    "h", "hpp", "cs", "php", "rb", "swift", "kt", "scala", "sh",
    "bash", "sql", "md", "txt", "yaml", "yml", "json", "xml", "html",
    "css", "scss", "less", "vue", "svelte",
];

/// Returns true if a path looks like a test file.
#[must_use]
pub fn is_test_file(file_path: &str) -> bool {
    let lower = file_path.to_lowercase();
    TEST_FILE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Returns true if a path looks like documentation.
#[must_use]
pub fn is_doc_file(file_path: &str) -> bool {
    let lower = file_path.to_lowercase();
    DOC_FILE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Returns true if a basename matches a key-file pattern.
#[must_use]
pub fn is_key_file(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    KEY_FILE_PATTERNS.iter().any(|p| lower.contains(p))
}
