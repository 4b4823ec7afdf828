//! Database schema for the corpus store.

/// SQL schema for the corpus database.
///
/// `chunks_fts` mirrors `chunks(chunk_id, chunk_text)` and is refreshed in
/// the same transaction as every chunk write, so the lexical index can never
/// drift from the chunk rows.
pub const SCHEMA_SQL: &str = r"
-- Indexed repositories
CREATE TABLE IF NOT EXISTS repos (
    repo_id TEXT PRIMARY KEY,
    url TEXT,
    local_path TEXT NOT NULL,
    commit_hash TEXT,
    indexed_at TIMESTAMP,
    stats TEXT
);

-- Code chunks, owned by their repository
CREATE TABLE IF NOT EXISTS chunks (
    chunk_id TEXT PRIMARY KEY,
    repo_id TEXT NOT NULL,
    file_path TEXT NOT NULL,
    language TEXT,
    start_line INTEGER,
    end_line INTEGER,
    symbol_name TEXT,
    chunk_text TEXT,
    metadata TEXT,
    FOREIGN KEY (repo_id) REFERENCES repos(repo_id)
);

CREATE INDEX IF NOT EXISTS idx_chunks_repo ON chunks(repo_id);
CREATE INDEX IF NOT EXISTS idx_chunks_file ON chunks(file_path);
CREATE INDEX IF NOT EXISTS idx_chunks_symbol ON chunks(symbol_name);

-- Full-text index over chunk text
CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
    chunk_id UNINDEXED,
    chunk_text,
    tokenize='porter unicode61'
);
";
