//! Ingestion: turning a repository into a searchable corpus.
//!
//! A [`SourceProvider`] yields `(path, bytes)` pairs; the
//! [`IndexPipeline`] chunks, embeds, and persists them. Only one
//! ingestion should run per repo id at a time; re-ingestion fully
//! replaces the prior corpus.

pub mod loader;
pub mod pipeline;

pub use loader::{language_from_extension, FileTree, FsSourceProvider, SourceFile, SourceProvider};
pub use pipeline::{IndexPipeline, IndexStatus};
