//! Corpus persistence: repository metadata, chunk rows, and the lexical
//! full-text index.
//!
//! The store is the sole owner of the metadata database. Chunk rows and
//! FTS rows are written in the same transaction; deleting a repository
//! leaves no orphans in either.

pub mod schema;
mod sqlite;

pub use sqlite::CorpusStore;
