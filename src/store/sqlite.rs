//! `SQLite` corpus store.
//!
//! Persists repository metadata and chunk rows, and maintains the FTS5
//! lexical index in lockstep with the chunk rows. Writers serialize per
//! repository; readers are safe concurrently under WAL.

// SQLite stores integers as i64; the stored values are non-negative line
// numbers and counts that fit in usize.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use crate::core::{ChunkInfo, ChunkingMethod, CodeChunk, RepoMetadata, RepoStats, SearchResult, SearchSource};
use crate::error::{Result, StorageError};
use crate::store::schema::SCHEMA_SQL;

/// SQLite-backed corpus store.
///
/// # Examples
///
/// ```no_run
/// use repoqa::store::CorpusStore;
///
/// let store = CorpusStore::open("corpus.db").unwrap();
/// assert!(store.list_repos().unwrap().is_empty());
/// ```
pub struct CorpusStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl CorpusStore {
    /// Opens or creates the corpus database at the given path.
    ///
    /// Enables WAL mode and foreign keys, and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::Database(e.to_string()))?;
            }
        }

        let conn = Connection::open(&path).map_err(StorageError::from)?;
        conn.execute("PRAGMA foreign_keys = ON;", [])
            .map_err(StorageError::from)?;
        let _: String = conn
            .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))
            .map_err(StorageError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(StorageError::from)?;

        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// Creates an in-memory corpus store. Useful for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        conn.execute("PRAGMA foreign_keys = ON;", [])
            .map_err(StorageError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(StorageError::from)?;
        Ok(Self { conn, path: None })
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ==================== Repository Operations ====================

    /// Upserts repository metadata by repo id.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn save_repo(&mut self, meta: &RepoMetadata) -> Result<()> {
        let stats = serde_json::to_string(&meta.stats).map_err(StorageError::from)?;
        self.conn
            .execute(
                r"
            INSERT OR REPLACE INTO repos (repo_id, url, local_path, commit_hash, indexed_at, stats)
            VALUES (?, ?, ?, ?, ?, ?)
        ",
                params![
                    meta.repo_id,
                    meta.url,
                    meta.local_path,
                    meta.commit_hash,
                    meta.indexed_at,
                    stats,
                ],
            )
            .map_err(StorageError::from)?;
        Ok(())
    }

    /// Fetches repository metadata by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_repo(&self, repo_id: &str) -> Result<Option<RepoMetadata>> {
        let result = self
            .conn
            .query_row(
                r"
            SELECT repo_id, url, local_path, commit_hash, indexed_at, stats
            FROM repos WHERE repo_id = ?
        ",
                params![repo_id],
                Self::row_to_repo,
            )
            .optional()
            .map_err(StorageError::from)?;
        Ok(result)
    }

    /// Lists all indexed repositories, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_repos(&self) -> Result<Vec<RepoMetadata>> {
        let mut stmt = self
            .conn
            .prepare(
                r"
            SELECT repo_id, url, local_path, commit_hash, indexed_at, stats
            FROM repos ORDER BY indexed_at DESC
        ",
            )
            .map_err(StorageError::from)?;

        let repos = stmt
            .query_map([], Self::row_to_repo)
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;
        Ok(repos)
    }

    fn row_to_repo(row: &rusqlite::Row<'_>) -> rusqlite::Result<RepoMetadata> {
        let stats_json: Option<String> = row.get(5)?;
        let stats = stats_json
            .and_then(|s| serde_json::from_str::<RepoStats>(&s).ok())
            .unwrap_or_default();
        Ok(RepoMetadata {
            repo_id: row.get(0)?,
            url: row.get(1)?,
            local_path: row.get(2)?,
            commit_hash: row.get(3)?,
            indexed_at: row.get(4)?,
            stats,
        })
    }

    // ==================== Chunk Operations ====================

    /// Upserts chunks and refreshes their FTS rows in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any write fails; the transaction is rolled back.
    pub fn save_chunks(&mut self, chunks: &[CodeChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction().map_err(StorageError::from)?;
        {
            let mut chunk_stmt = tx
                .prepare(
                    r"
                INSERT OR REPLACE INTO chunks
                    (chunk_id, repo_id, file_path, language, start_line, end_line,
                     symbol_name, chunk_text, metadata)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
                )
                .map_err(StorageError::from)?;
            let mut fts_delete = tx
                .prepare("DELETE FROM chunks_fts WHERE chunk_id = ?")
                .map_err(StorageError::from)?;
            let mut fts_insert = tx
                .prepare("INSERT INTO chunks_fts (chunk_id, chunk_text) VALUES (?, ?)")
                .map_err(StorageError::from)?;

            for chunk in chunks {
                let metadata = serde_json::to_string(&chunk.info).map_err(StorageError::from)?;
                chunk_stmt
                    .execute(params![
                        chunk.chunk_id,
                        chunk.repo_id,
                        chunk.file_path,
                        chunk.language,
                        chunk.start_line as i64,
                        chunk.end_line as i64,
                        chunk.symbol_name,
                        chunk.chunk_text,
                        metadata,
                    ])
                    .map_err(StorageError::from)?;
                fts_delete
                    .execute(params![chunk.chunk_id])
                    .map_err(StorageError::from)?;
                fts_insert
                    .execute(params![chunk.chunk_id, chunk.chunk_text])
                    .map_err(StorageError::from)?;
            }
        }
        tx.commit().map_err(StorageError::from)?;
        Ok(())
    }

    /// Fetches a chunk by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_chunk(&self, chunk_id: &str) -> Result<Option<CodeChunk>> {
        let result = self
            .conn
            .query_row(
                r"
            SELECT chunk_id, repo_id, file_path, language, start_line, end_line,
                   symbol_name, chunk_text, metadata
            FROM chunks WHERE chunk_id = ?
        ",
                params![chunk_id],
                Self::row_to_chunk,
            )
            .optional()
            .map_err(StorageError::from)?;
        Ok(result)
    }

    /// Counts the chunks owned by a repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn chunk_count(&self, repo_id: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM chunks WHERE repo_id = ?",
                params![repo_id],
                |row| row.get(0),
            )
            .map_err(StorageError::from)?;
        Ok(count as usize)
    }

    fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<CodeChunk> {
        let metadata: Option<String> = row.get(8)?;
        let info = metadata
            .and_then(|m| serde_json::from_str::<ChunkInfo>(&m).ok())
            .unwrap_or_else(|| ChunkInfo::new(ChunkingMethod::Size));
        Ok(CodeChunk {
            chunk_id: row.get(0)?,
            repo_id: row.get(1)?,
            file_path: row.get(2)?,
            language: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            start_line: row.get::<_, i64>(4)? as usize,
            end_line: row.get::<_, i64>(5)? as usize,
            symbol_name: row.get(6)?,
            chunk_text: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            info,
        })
    }

    // ==================== Lexical Search ====================

    /// Full-text search over chunk text, scoped to one repository.
    ///
    /// The term is quoted per word so FTS5 operators in user text are
    /// treated as literals. Results are ordered best match first; the
    /// returned `lexical_score` is the negated FTS rank, so larger means
    /// more relevant.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn lexical_search(
        &self,
        repo_id: &str,
        term: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let fts_query = term
            .split_whitespace()
            .map(|word| format!("\"{}\"", word.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(" OR ");

        if fts_query.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self
            .conn
            .prepare(
                r"
            SELECT c.chunk_id, c.file_path, c.start_line, c.end_line,
                   c.symbol_name, c.chunk_text, chunks_fts.rank
            FROM chunks_fts
            JOIN chunks c ON c.chunk_id = chunks_fts.chunk_id
            WHERE chunks_fts MATCH ? AND c.repo_id = ?
            ORDER BY chunks_fts.rank
            LIMIT ?
        ",
            )
            .map_err(StorageError::from)?;

        // An FTS5 syntax error from pathological input (a bare "*" or a
        // term that tokenizes to nothing) means "no match", not a storage
        // failure.
        let collected = stmt
            .query_map(params![fts_query, repo_id, limit as i64], |row| {
                let rank: f64 = row.get(6)?;
                Ok(SearchResult {
                    chunk_id: row.get(0)?,
                    file_path: row.get(1)?,
                    start_line: row.get::<_, i64>(2)? as usize,
                    end_line: row.get::<_, i64>(3)? as usize,
                    symbol_name: row.get(4)?,
                    text: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                    sources: vec![SearchSource::Lexical],
                    vector_score: None,
                    lexical_score: Some(-rank),
                    combined_score: 0.0,
                    query_sources: Vec::new(),
                })
            })
            .and_then(std::iter::Iterator::collect::<std::result::Result<Vec<_>, _>>);

        match collected {
            Ok(results) => Ok(results),
            Err(e) if e.to_string().contains("fts5") => Ok(Vec::new()),
            Err(e) => Err(StorageError::from(e).into()),
        }
    }

    // ==================== Deletion ====================

    /// Deletes a repository, its chunks, and their FTS rows.
    ///
    /// The caller is responsible for dropping the vector namespace, which
    /// lives in its own index.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::RepoNotFound`] if the repository does not
    /// exist, or a database error if the cascade fails.
    pub fn delete_repo(&mut self, repo_id: &str) -> Result<()> {
        let tx = self.conn.transaction().map_err(StorageError::from)?;
        tx.execute(
            "DELETE FROM chunks_fts WHERE chunk_id IN (SELECT chunk_id FROM chunks WHERE repo_id = ?)",
            params![repo_id],
        )
        .map_err(StorageError::from)?;
        tx.execute("DELETE FROM chunks WHERE repo_id = ?", params![repo_id])
            .map_err(StorageError::from)?;
        let deleted = tx
            .execute("DELETE FROM repos WHERE repo_id = ?", params![repo_id])
            .map_err(StorageError::from)?;
        tx.commit().map_err(StorageError::from)?;

        if deleted == 0 {
            return Err(StorageError::RepoNotFound {
                repo_id: repo_id.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
