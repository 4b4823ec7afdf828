//! The indexing pipeline: source files to a searchable corpus.
//!
//! Re-ingesting a repository replaces its corpus wholesale. On any failure
//! after writes begin, the partial corpus is deleted, so the store holds
//! either a complete corpus or none.

use rayon::prelude::*;
use tracing::{info, warn};

use super::loader::{repo_stats, SourceProvider};
use crate::chunking::Chunker;
use crate::config::Config;
use crate::core::{repo_id_for, CodeChunk, RepoMetadata};
use crate::embedding::Embedder;
use crate::error::{IndexError, Result};
use crate::store::CorpusStore;
use crate::vector::{VectorIndex, VectorMetadata};

/// Indexing status of a repository.
#[derive(Debug, Clone)]
pub enum IndexStatus {
    /// No corpus for this repo id.
    NotFound,
    /// A complete corpus exists.
    Completed {
        /// Repository metadata.
        meta: RepoMetadata,
        /// Number of chunks in the corpus.
        chunk_count: usize,
    },
}

/// Orchestrates chunking, embedding, and persistence for one repository.
pub struct IndexPipeline<'a> {
    store: &'a mut CorpusStore,
    index: &'a mut dyn VectorIndex,
    embedder: &'a dyn Embedder,
    config: &'a Config,
}

impl<'a> IndexPipeline<'a> {
    /// Creates a pipeline over the shared handles.
    pub fn new(
        store: &'a mut CorpusStore,
        index: &'a mut dyn VectorIndex,
        embedder: &'a dyn Embedder,
        config: &'a Config,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
            config,
        }
    }

    /// Indexes a repository, replacing any prior corpus for the same id.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] (wrapped) if enumeration, embedding, or
    /// persistence fails; partial writes are rolled back first.
    pub fn index(&mut self, provider: &dyn SourceProvider) -> Result<RepoMetadata> {
        let origin = provider.origin().to_string();
        let repo_id = repo_id_for(&origin);
        let namespace = format!("repo_{repo_id}");

        let files = provider.files()?;
        let stats = repo_stats(&files);
        info!(repo_id, files = stats.total_files, "indexing repository");

        let chunker = Chunker::from_config(self.config);
        let mut chunks: Vec<CodeChunk> = files
            .par_iter()
            .flat_map(|file| {
                chunker.chunk_file(&repo_id, &file.relative_path, &file.bytes, &file.language)
            })
            .collect();
        chunks.sort_by(|a, b| {
            a.file_path
                .cmp(&b.file_path)
                .then(a.start_line.cmp(&b.start_line))
        });
        info!(repo_id, chunks = chunks.len(), "chunking complete");

        let meta = RepoMetadata {
            repo_id: repo_id.clone(),
            url: None,
            local_path: origin,
            commit_hash: None,
            indexed_at: crate::core::repo::now_unix(),
            stats,
        };

        // Replace any prior corpus before writing the new one
        if self.store.get_repo(&repo_id)?.is_some() {
            self.store.delete_repo(&repo_id)?;
        }
        self.index.delete(&namespace)?;

        if let Err(e) = self.write_corpus(&meta, &chunks, &namespace) {
            warn!(repo_id, error = %e, "indexing failed, rolling back partial corpus");
            let _ = self.store.delete_repo(&repo_id);
            let _ = self.index.delete(&namespace);
            return Err(e);
        }

        info!(repo_id, "indexing complete");
        Ok(meta)
    }

    fn write_corpus(
        &mut self,
        meta: &RepoMetadata,
        chunks: &[CodeChunk],
        namespace: &str,
    ) -> Result<()> {
        self.store.save_repo(meta)?;
        self.store.save_chunks(chunks)?;

        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.chunk_text.as_str()).collect();
        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .map_err(|e| IndexError::Embedding(e.to_string()))?;

        let ids: Vec<String> = chunks.iter().map(|c| c.chunk_id.clone()).collect();
        let documents: Vec<String> = chunks.iter().map(|c| c.chunk_text.clone()).collect();
        let metadatas: Vec<VectorMetadata> = chunks
            .iter()
            .map(|c| VectorMetadata {
                file_path: c.file_path.clone(),
                start_line: c.start_line,
                end_line: c.end_line,
                symbol_name: c.symbol_name.clone(),
                language: c.language.clone(),
            })
            .collect();

        self.index
            .add(namespace, &ids, &embeddings, &documents, &metadatas)?;
        Ok(())
    }

    /// Reports the indexing status of a repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn status(&self, repo_id: &str) -> Result<IndexStatus> {
        match self.store.get_repo(repo_id)? {
            None => Ok(IndexStatus::NotFound),
            Some(meta) => {
                let chunk_count = self.store.chunk_count(repo_id)?;
                Ok(IndexStatus::Completed { meta, chunk_count })
            }
        }
    }

    /// Deletes a repository corpus and its vector namespace.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StorageError::RepoNotFound`] for unknown
    /// ids.
    pub fn delete(&mut self, repo_id: &str) -> Result<()> {
        self.store.delete_repo(repo_id)?;
        self.index.delete(&format!("repo_{repo_id}"))?;
        info!(repo_id, "repository deleted");
        Ok(())
    }
}
