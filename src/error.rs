//! Error types for the retrieval and answering engine.
//!
//! This module provides a comprehensive error hierarchy using `thiserror`
//! covering storage, chunking, indexing, oracle, and agent failures.
//!
//! Only surface operations (`index`, `answer`, `delete`, `list`, `status`)
//! let fatal kinds propagate; internal helpers recover locally with typed
//! defaults.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for engine operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Corpus store errors (database operations).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Chunking errors (parsing, size bounds).
    #[error("chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    /// Ingestion pipeline errors.
    #[error("indexing error: {0}")]
    Index(#[from] IndexError),

    /// Oracle (chat completion backend) errors.
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// Agent loop errors.
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Corpus store and vector index errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection or query error.
    #[error("database error: {0}")]
    Database(String),

    /// Repository id absent from the corpus store.
    #[error("repository not found: {repo_id}")]
    RepoNotFound {
        /// The repository id that was not found.
        repo_id: String,
    },

    /// Chunk id absent from the corpus store.
    #[error("chunk not found: {chunk_id}")]
    ChunkNotFound {
        /// The chunk id that was not found.
        chunk_id: String,
    },

    /// Serialization/deserialization error for stored JSON columns.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Vector namespace operation failed.
    #[error("vector index error: {0}")]
    VectorIndex(String),
}

/// Chunking errors.
#[derive(Error, Debug)]
pub enum ChunkingError {
    /// Grammar for the language could not be loaded into the parser.
    #[error("parser rejected grammar for language: {language}")]
    Grammar {
        /// Language whose grammar failed to load.
        language: String,
    },

    /// Tree-sitter failed to produce a tree.
    #[error("parse failed for {file_path}")]
    ParseFailed {
        /// File that failed to parse.
        file_path: String,
    },

    /// Invalid chunking configuration.
    #[error("invalid chunk configuration: {reason}")]
    InvalidConfig {
        /// Reason the configuration is invalid.
        reason: String,
    },
}

/// Ingestion pipeline errors. Wraps any fatal chunker/embedder/store error.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Source root does not exist or is not readable.
    #[error("source path not readable: {path}")]
    SourceUnavailable {
        /// Path that could not be read.
        path: String,
    },

    /// Embedding generation failed during ingestion.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Store writes failed; the partial corpus has been rolled back.
    #[error("corpus write failed: {0}")]
    Store(String),
}

/// Oracle errors: timeouts, transport failures, and unusable responses.
#[derive(Error, Debug)]
pub enum OracleError {
    /// The request did not complete within the configured deadline.
    #[error("oracle timed out after {seconds}s")]
    Timeout {
        /// The deadline in seconds.
        seconds: u64,
    },

    /// Transport or API error from the backend.
    #[error("oracle request failed: {0}")]
    Request(String),

    /// The response could not be parsed as the expected structure.
    #[error("oracle response unparseable: {0}")]
    Parse(String),
}

/// Agent loop errors. Any unrecovered error from the loop surfaces here.
#[derive(Error, Debug)]
pub enum AgentError {
    /// A stage failed in a way its typed default could not absorb.
    #[error("stage {stage} failed: {reason}")]
    StageFailed {
        /// Name of the failing stage.
        stage: &'static str,
        /// Reason for the failure.
        reason: String,
    },

    /// The loop was asked to answer against a repository that is not indexed.
    #[error("repository not indexed: {repo_id}")]
    RepoNotIndexed {
        /// Repository id.
        repo_id: String,
    },
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Database(err.to_string()))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for IndexError {
    fn from(err: std::io::Error) -> Self {
        Self::SourceUnavailable {
            path: err.to_string(),
        }
    }
}
