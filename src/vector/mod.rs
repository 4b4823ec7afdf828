//! Vector index: the dense-retrieval collaborator.
//!
//! Namespaced per repository (`repo_<id>`), cosine metric, opaque to the
//! rest of the engine. [`DenseVectorIndex`] is the in-tree implementation:
//! embeddings persisted as blobs with a brute-force cosine scan, which is
//! exact and fast enough for per-repository corpora.

mod dense;

pub use dense::DenseVectorIndex;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Chunk metadata carried alongside each vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorMetadata {
    /// Repo-relative file path.
    pub file_path: String,
    /// First line of the chunk span.
    pub start_line: usize,
    /// Last line of the chunk span.
    pub end_line: usize,
    /// Symbol name, when the chunk covers a definition.
    pub symbol_name: Option<String>,
    /// Language tag.
    pub language: String,
}

/// One vector-search hit.
#[derive(Debug, Clone)]
pub struct VectorHit {
    /// Chunk identifier.
    pub chunk_id: String,
    /// Cosine distance; similarity is `1.0 - distance`.
    pub distance: f32,
    /// The stored document (chunk text).
    pub document: String,
    /// The stored metadata.
    pub metadata: VectorMetadata,
}

impl VectorHit {
    /// Similarity of this hit (`1.0 - distance`).
    #[must_use]
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}

/// Trait for per-repository vector namespaces.
///
/// Callers must not assume atomicity across namespaces.
pub trait VectorIndex {
    /// Creates the namespace if it does not exist (cosine metric).
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace cannot be created.
    fn create_or_open(&mut self, namespace: &str) -> Result<()>;

    /// Adds vectors to a namespace. All slices must have equal length.
    ///
    /// # Errors
    ///
    /// Returns an error on length mismatch or write failure.
    fn add(
        &mut self,
        namespace: &str,
        ids: &[String],
        embeddings: &[Vec<f32>],
        documents: &[String],
        metadatas: &[VectorMetadata],
    ) -> Result<()>;

    /// Returns the `k` nearest vectors by cosine distance, best first.
    ///
    /// An absent namespace yields an empty result, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan fails.
    fn query(&self, namespace: &str, embedding: &[f32], k: usize) -> Result<Vec<VectorHit>>;

    /// Fetches vectors by id (distance is reported as 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn get(&self, namespace: &str, ids: &[String]) -> Result<Vec<VectorHit>>;

    /// Drops a namespace and all its vectors. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    fn delete(&mut self, namespace: &str) -> Result<()>;

    /// True if the namespace exists.
    fn has_namespace(&self, namespace: &str) -> bool;
}
