//! SQLite-backed dense vector index with brute-force cosine scan.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use super::{VectorHit, VectorIndex, VectorMetadata};
use crate::embedding::cosine_similarity;
use crate::error::{Result, StorageError};

const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS namespaces (
    name TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS vectors (
    namespace TEXT NOT NULL,
    chunk_id TEXT NOT NULL,
    embedding BLOB NOT NULL,
    dimensions INTEGER NOT NULL,
    document TEXT NOT NULL,
    metadata TEXT NOT NULL,
    PRIMARY KEY (namespace, chunk_id)
);

CREATE INDEX IF NOT EXISTS idx_vectors_namespace ON vectors(namespace);
";

/// Dense vector index persisted in `SQLite`.
///
/// Embeddings are stored as little-endian f32 blobs. Queries scan the
/// namespace and rank by cosine distance.
///
/// # Examples
///
/// ```
/// use repoqa::vector::{DenseVectorIndex, VectorIndex, VectorMetadata};
///
/// let mut index = DenseVectorIndex::in_memory().unwrap();
/// index.create_or_open("repo_abc").unwrap();
/// index.add(
///     "repo_abc",
///     &["c1".to_string()],
///     &[vec![1.0, 0.0]],
///     &["fn main() {}".to_string()],
///     &[VectorMetadata::default()],
/// ).unwrap();
///
/// let hits = index.query("repo_abc", &[1.0, 0.0], 1).unwrap();
/// assert_eq!(hits[0].chunk_id, "c1");
/// ```
pub struct DenseVectorIndex {
    conn: Connection,
}

impl DenseVectorIndex {
    /// Opens or creates the vector database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::VectorIndex(e.to_string()))?;
            }
        }
        let conn = Connection::open(path).map_err(StorageError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(StorageError::from)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory vector index. Useful for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(StorageError::from)?;
        Ok(Self { conn })
    }

    fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
        blob.chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    fn row_to_hit(row: &rusqlite::Row<'_>, distance: f32) -> rusqlite::Result<VectorHit> {
        let metadata_json: String = row.get(2)?;
        let metadata = serde_json::from_str(&metadata_json).unwrap_or_default();
        Ok(VectorHit {
            chunk_id: row.get(0)?,
            distance,
            document: row.get(1)?,
            metadata,
        })
    }
}

impl VectorIndex for DenseVectorIndex {
    fn create_or_open(&mut self, namespace: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO namespaces (name) VALUES (?)",
                params![namespace],
            )
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn add(
        &mut self,
        namespace: &str,
        ids: &[String],
        embeddings: &[Vec<f32>],
        documents: &[String],
        metadatas: &[VectorMetadata],
    ) -> Result<()> {
        if ids.len() != embeddings.len()
            || ids.len() != documents.len()
            || ids.len() != metadatas.len()
        {
            return Err(StorageError::VectorIndex(format!(
                "length mismatch: {} ids, {} embeddings, {} documents, {} metadatas",
                ids.len(),
                embeddings.len(),
                documents.len(),
                metadatas.len()
            ))
            .into());
        }

        self.create_or_open(namespace)?;

        let tx = self.conn.transaction().map_err(StorageError::from)?;
        {
            let mut stmt = tx
                .prepare(
                    r"
                INSERT OR REPLACE INTO vectors
                    (namespace, chunk_id, embedding, dimensions, document, metadata)
                VALUES (?, ?, ?, ?, ?, ?)
            ",
                )
                .map_err(StorageError::from)?;

            for i in 0..ids.len() {
                let blob = Self::embedding_to_blob(&embeddings[i]);
                let metadata =
                    serde_json::to_string(&metadatas[i]).map_err(StorageError::from)?;
                stmt.execute(params![
                    namespace,
                    ids[i],
                    blob,
                    embeddings[i].len() as i64,
                    documents[i],
                    metadata,
                ])
                .map_err(StorageError::from)?;
            }
        }
        tx.commit().map_err(StorageError::from)?;
        Ok(())
    }

    fn query(&self, namespace: &str, embedding: &[f32], k: usize) -> Result<Vec<VectorHit>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT chunk_id, document, metadata, embedding FROM vectors WHERE namespace = ?",
            )
            .map_err(StorageError::from)?;

        let mut hits = stmt
            .query_map(params![namespace], |row| {
                let blob: Vec<u8> = row.get(3)?;
                let stored = Self::blob_to_embedding(&blob);
                let distance = 1.0 - cosine_similarity(embedding, &stored);
                Self::row_to_hit(row, distance)
            })
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    fn get(&self, namespace: &str, ids: &[String]) -> Result<Vec<VectorHit>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT chunk_id, document, metadata FROM vectors WHERE namespace = ? AND chunk_id = ?",
            )
            .map_err(StorageError::from)?;

        let mut hits = Vec::new();
        for id in ids {
            let hit = stmt
                .query_row(params![namespace, id], |row| Self::row_to_hit(row, 0.0))
                .optional()
                .map_err(StorageError::from)?;
            if let Some(hit) = hit {
                hits.push(hit);
            }
        }
        Ok(hits)
    }

    fn delete(&mut self, namespace: &str) -> Result<()> {
        let tx = self.conn.transaction().map_err(StorageError::from)?;
        tx.execute("DELETE FROM vectors WHERE namespace = ?", params![namespace])
            .map_err(StorageError::from)?;
        tx.execute("DELETE FROM namespaces WHERE name = ?", params![namespace])
            .map_err(StorageError::from)?;
        tx.commit().map_err(StorageError::from)?;
        Ok(())
    }

    fn has_namespace(&self, namespace: &str) -> bool {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM namespaces WHERE name = ?",
                params![namespace],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| count > 0)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(file: &str) -> VectorMetadata {
        VectorMetadata {
            file_path: file.to_string(),
            start_line: 1,
            end_line: 10,
            symbol_name: None,
            language: "python".to_string(),
        }
    }

    fn setup_with_vectors() -> DenseVectorIndex {
        let mut index = DenseVectorIndex::in_memory().unwrap();
        index
            .add(
                "repo_abc",
                &["c1".to_string(), "c2".to_string(), "c3".to_string()],
                &[
                    vec![1.0, 0.0, 0.0],
                    vec![0.0, 1.0, 0.0],
                    vec![0.9, 0.1, 0.0],
                ],
                &[
                    "doc one".to_string(),
                    "doc two".to_string(),
                    "doc three".to_string(),
                ],
                &[meta("a.py"), meta("b.py"), meta("c.py")],
            )
            .unwrap();
        index
    }

    #[test]
    fn test_query_orders_by_distance() {
        let index = setup_with_vectors();
        let hits = index.query("repo_abc", &[1.0, 0.0, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].chunk_id, "c1");
        assert_eq!(hits[1].chunk_id, "c3");
        assert!(hits[0].distance <= hits[1].distance);
        assert!((hits[0].similarity() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_query_truncates_to_k() {
        let index = setup_with_vectors();
        let hits = index.query("repo_abc", &[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_query_missing_namespace_is_empty() {
        let index = DenseVectorIndex::in_memory().unwrap();
        assert!(index.query("repo_none", &[1.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_metadata_roundtrip() {
        let index = setup_with_vectors();
        let hits = index.get("repo_abc", &["c2".to_string()]).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.file_path, "b.py");
        assert_eq!(hits[0].document, "doc two");
    }

    #[test]
    fn test_get_skips_missing_ids() {
        let index = setup_with_vectors();
        let hits = index
            .get("repo_abc", &["c1".to_string(), "ghost".to_string()])
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_add_length_mismatch_rejected() {
        let mut index = DenseVectorIndex::in_memory().unwrap();
        let result = index.add(
            "repo_abc",
            &["c1".to_string()],
            &[],
            &["doc".to_string()],
            &[meta("a.py")],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_delete_namespace() {
        let mut index = setup_with_vectors();
        assert!(index.has_namespace("repo_abc"));

        index.delete("repo_abc").unwrap();
        assert!(!index.has_namespace("repo_abc"));
        assert!(index.query("repo_abc", &[1.0, 0.0, 0.0], 3).unwrap().is_empty());

        // Idempotent
        index.delete("repo_abc").unwrap();
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let mut index = setup_with_vectors();
        index
            .add(
                "repo_other",
                &["x1".to_string()],
                &[vec![1.0, 0.0, 0.0]],
                &["other doc".to_string()],
                &[meta("x.py")],
            )
            .unwrap();

        let hits = index.query("repo_other", &[1.0, 0.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "x1");
    }

    #[test]
    fn test_upsert_replaces_vector() {
        let mut index = setup_with_vectors();
        index
            .add(
                "repo_abc",
                &["c1".to_string()],
                &[vec![0.0, 0.0, 1.0]],
                &["updated doc".to_string()],
                &[meta("a.py")],
            )
            .unwrap();

        let hits = index.query("repo_abc", &[0.0, 0.0, 1.0], 1).unwrap();
        assert_eq!(hits[0].chunk_id, "c1");
        assert_eq!(hits[0].document, "updated doc");
    }
}
