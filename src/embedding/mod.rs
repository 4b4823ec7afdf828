//! Embedding generation for the dense retrieval branch.
//!
//! The embedder is a black-box capability: `embed` one text or a batch,
//! report the dimension. The default is a deterministic hash-based
//! embedder; real semantic embeddings are available behind the
//! `fastembed-embeddings` feature.

mod fallback;

#[cfg(feature = "fastembed-embeddings")]
mod fastembed_impl;

pub use fallback::FallbackEmbedder;

#[cfg(feature = "fastembed-embeddings")]
pub use fastembed_impl::FastEmbedEmbedder;

use crate::error::Result;

/// Embedding dimensions of the default models (all-MiniLM-L6-v2 and the
/// hash fallback).
pub const DEFAULT_DIMENSIONS: usize = 384;

/// Number of texts embedded per batch call.
pub const EMBED_BATCH_SIZE: usize = 32;

/// Trait for embedding generators.
///
/// Implementations must be `Send + Sync` so ingestion can embed chunk
/// batches in parallel.
pub trait Embedder: Send + Sync {
    /// Returns the embedding dimension.
    fn dimensions(&self) -> usize;

    /// Embeds a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds many texts, processing [`EMBED_BATCH_SIZE`] at a time.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails for any batch.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            for text in batch {
                all.push(self.embed(text)?);
            }
        }
        Ok(all)
    }
}

/// Creates the default embedder for the enabled features.
///
/// # Errors
///
/// Returns an error if embedder initialization fails (the fallback never
/// fails).
#[cfg(feature = "fastembed-embeddings")]
pub fn create_embedder() -> Result<Box<dyn Embedder>> {
    Ok(Box::new(FastEmbedEmbedder::new()?))
}

/// Creates the default embedder for the enabled features.
///
/// # Errors
///
/// Returns an error if embedder initialization fails (the fallback never
/// fails).
#[cfg(not(feature = "fastembed-embeddings"))]
pub fn create_embedder() -> Result<Box<dyn Embedder>> {
    Ok(Box::new(FallbackEmbedder::new(DEFAULT_DIMENSIONS)))
}

/// Computes cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths or zero-magnitude vectors.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
