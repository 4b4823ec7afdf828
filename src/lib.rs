//! # repoqa
//!
//! Grounded question answering over source repositories.
//!
//! A repository is ingested into a corpus of semantically chunked code;
//! questions are answered by an agentic loop that plans search queries,
//! retrieves chunks through hybrid dense+lexical search, drafts an answer
//! under a token budget, and verifies that every claim is anchored in
//! retrieved code before finalizing with hydrated citations.
//!
//! ## Subsystems
//!
//! - **Chunking**: AST-guided chunks at definition boundaries with
//!   comment/docstring context, size-based sliding windows as fallback
//! - **Corpus store**: `SQLite` metadata plus an FTS5 lexical index
//! - **Vector index**: per-repository cosine namespaces
//! - **Retrieval**: query expansion, weighted fusion with co-occurrence
//!   bonus, reranking, span deduplication
//! - **Agent loop**: plan, retrieve, synthesize, verify, finalize

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]

pub mod agent;
pub mod architecture;
pub mod chunking;
pub mod citation;
pub mod cli;
pub mod config;
pub mod context;
pub mod core;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod oracle;
pub mod query;
pub mod retrieval;
pub mod store;
pub mod tables;
pub mod tokens;
pub mod vector;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

pub use config::Config;
pub use core::{AgentState, Citation, CodeChunk, Plan, RepoMetadata, SearchResult, Verification};

pub use agent::{AgentLoop, FinalizerMode};
pub use architecture::ArchitectureReport;
pub use chunking::Chunker;
pub use embedding::{create_embedder, Embedder, FallbackEmbedder, DEFAULT_DIMENSIONS};
pub use ingest::{FileTree, FsSourceProvider, IndexPipeline, IndexStatus, SourceProvider};
pub use oracle::{OpenAiOracle, Oracle};
pub use retrieval::Retriever;
pub use store::CorpusStore;
pub use vector::{DenseVectorIndex, VectorIndex};

#[cfg(feature = "fastembed-embeddings")]
pub use embedding::FastEmbedEmbedder;
