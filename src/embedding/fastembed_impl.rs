//! `FastEmbed` embedder (feature: `fastembed-embeddings`).
//!
//! Uses all-MiniLM-L6-v2 (384 dimensions). The model is downloaded on
//! first use and cached locally.

use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::embedding::{Embedder, DEFAULT_DIMENSIONS, EMBED_BATCH_SIZE};
use crate::error::{IndexError, Result};

/// Semantic embedder backed by `FastEmbed`.
pub struct FastEmbedEmbedder {
    // TextEmbedding::embed takes &mut self
    model: Mutex<TextEmbedding>,
}

impl FastEmbedEmbedder {
    /// Initializes the all-MiniLM-L6-v2 model.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be downloaded or loaded.
    pub fn new() -> Result<Self> {
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false),
        )
        .map_err(|e| IndexError::Embedding(e.to_string()))?;

        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl Embedder for FastEmbedEmbedder {
    fn dimensions(&self) -> usize {
        DEFAULT_DIMENSIONS
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut model = self
            .model
            .lock()
            .map_err(|e| IndexError::Embedding(e.to_string()))?;
        let mut out = model
            .embed(vec![text], None)
            .map_err(|e| IndexError::Embedding(e.to_string()))?;
        out.pop()
            .ok_or_else(|| IndexError::Embedding("model returned no embedding".to_string()).into())
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut model = self
            .model
            .lock()
            .map_err(|e| IndexError::Embedding(e.to_string()))?;
        model
            .embed(texts.to_vec(), Some(EMBED_BATCH_SIZE))
            .map_err(|e| IndexError::Embedding(e.to_string()).into())
    }
}
