//! SQLite-backed vector index.
//!
//! Embeddings are stored as little-endian f32 BLOBs and ranked by cosine
//! similarity with a full scan of the collection, which is plenty for one
//! document per university.

use crate::embeddings::EmbeddingProvider;
use crate::vector_index::{VectorHit, VectorIndex, VectorMetadata, VectorRecord};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use uniguide_core::{AppError, AppResult};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS collections (
        name TEXT PRIMARY KEY,
        embedding_model TEXT NOT NULL,
        dimensions INTEGER NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL
            REFERENCES collections(name) ON DELETE CASCADE ON UPDATE CASCADE,
        id TEXT NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL,
        metadata TEXT NOT NULL,
        PRIMARY KEY (collection, id)
    );
"#;

/// Vector index stored in a single SQLite file.
pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SqliteVectorIndex {
    /// Open (or create) the index file.
    pub fn open(db_path: &Path, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::VectorIndex(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path).map_err(|e| {
            AppError::VectorIndex(format!("Failed to open vector index {:?}: {}", db_path, e))
        })?;

        tracing::debug!("Opened vector index at {:?}", db_path);
        Self::init(conn, embedder)
    }

    /// Open a private in-memory index.
    pub fn open_in_memory(embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let conn = Connection::open_in_memory().map_err(index_err)?;
        Self::init(conn, embedder)
    }

    fn init(conn: Connection, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(index_err)?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::VectorIndex(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::VectorIndex("Vector index lock poisoned".to_string()))
    }

    fn exists(&self, name: &str) -> AppResult<bool> {
        let conn = self.lock()?;
        collection_row_exists(&conn, name)
    }

    fn require_collection(&self, name: &str) -> AppResult<()> {
        if self.exists(name)? {
            Ok(())
        } else {
            Err(AppError::VectorIndex(format!(
                "Collection '{}' does not exist",
                name
            )))
        }
    }

    /// Model and dimensions a collection was built with.
    fn stored_embedding(&self, name: &str) -> AppResult<Option<(String, usize)>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT embedding_model, dimensions FROM collections WHERE name = ?1",
            [name],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize)),
        )
        .optional()
        .map_err(index_err)
    }

    /// Require a collection built with the current embedder.
    ///
    /// Vectors from another model or dimension count are not comparable, so a
    /// stale collection must be rebuilt rather than silently queried.
    fn require_compatible(&self, name: &str) -> AppResult<()> {
        let (model, dimensions) = self.stored_embedding(name)?.ok_or_else(|| {
            AppError::VectorIndex(format!("Collection '{}' does not exist", name))
        })?;

        if model != self.embedder.model_name() || dimensions != self.embedder.dimensions() {
            return Err(AppError::VectorIndex(format!(
                "Collection '{}' was built with {} ({} dimensions) but the current embedder is {} ({} dimensions); run `uniguide rebuild`",
                name,
                model,
                dimensions,
                self.embedder.model_name(),
                self.embedder.dimensions()
            )));
        }
        Ok(())
    }

    fn insert_rows(
        &self,
        collection: &str,
        records: &[VectorRecord],
        embeddings: &[Vec<f32>],
    ) -> AppResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(index_err)?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO documents (collection, id, text, embedding, metadata)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(index_err)?;

            for (record, embedding) in records.iter().zip(embeddings) {
                let metadata = serde_json::to_string(&record.metadata)?;
                stmt.execute(params![
                    collection,
                    record.id,
                    record.text,
                    embedding_to_bytes(embedding),
                    metadata,
                ])
                .map_err(|e| match e.sqlite_error_code() {
                    Some(rusqlite::ErrorCode::ConstraintViolation) => AppError::VectorIndex(
                        format!("Duplicate document id '{}' in '{}'", record.id, collection),
                    ),
                    _ => index_err(e),
                })?;
            }
        }

        tx.commit().map_err(index_err)?;
        Ok(())
    }

    fn rank(
        &self,
        collection: &str,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<VectorHit>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, embedding, metadata FROM documents
                 WHERE collection = ?1 ORDER BY rowid",
            )
            .map_err(index_err)?;

        let rows = stmt
            .query_map([collection], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(index_err)?;

        let mut hits = Vec::new();
        for row in rows {
            let (id, bytes, metadata_json) = row.map_err(index_err)?;
            let embedding = bytes_to_embedding(&bytes)?;
            if embedding.len() != query_embedding.len() {
                return Err(AppError::VectorIndex(format!(
                    "Query embedding dimension mismatch for '{}': expected {}, got {}",
                    id,
                    embedding.len(),
                    query_embedding.len()
                )));
            }
            let metadata: VectorMetadata = serde_json::from_str(&metadata_json)?;

            hits.push(VectorHit {
                id,
                metadata,
                score: cosine_similarity(query_embedding, &embedding),
            });
        }

        // Stable sort keeps insertion order among equal scores
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);

        Ok(hits)
    }
}

#[async_trait::async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn create_collection(&self, name: &str) -> AppResult<()> {
        let conn = self.lock()?;
        if collection_row_exists(&conn, name)? {
            return Err(AppError::VectorIndex(format!(
                "Collection '{}' already exists",
                name
            )));
        }

        conn.execute(
            "INSERT INTO collections (name, embedding_model, dimensions, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                name,
                self.embedder.model_name(),
                self.embedder.dimensions() as i64,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(index_err)?;

        tracing::debug!("Created collection '{}'", name);
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> AppResult<bool> {
        let conn = self.lock()?;
        let removed = conn
            .execute("DELETE FROM collections WHERE name = ?1", [name])
            .map_err(index_err)?;

        if removed > 0 {
            tracing::debug!("Deleted collection '{}'", name);
        }
        Ok(removed > 0)
    }

    async fn collection_exists(&self, name: &str) -> AppResult<bool> {
        self.exists(name)
    }

    async fn add_documents(&self, collection: &str, records: &[VectorRecord]) -> AppResult<()> {
        self.require_compatible(collection)?;
        if records.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != records.len() {
            return Err(AppError::Embedding(format!(
                "Provider returned {} embeddings for {} documents",
                embeddings.len(),
                records.len()
            )));
        }

        self.insert_rows(collection, records, &embeddings)?;

        tracing::debug!("Added {} documents to '{}'", records.len(), collection);
        Ok(())
    }

    async fn query(&self, collection: &str, text: &str, top_k: usize) -> AppResult<Vec<VectorHit>> {
        self.require_compatible(collection)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(text).await?;
        let hits = self.rank(collection, &query_embedding, top_k)?;

        tracing::debug!(
            "Retrieved {} documents from '{}' (requested top-{})",
            hits.len(),
            collection,
            top_k
        );
        Ok(hits)
    }

    async fn count(&self, collection: &str) -> AppResult<usize> {
        self.require_collection(collection)?;

        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                [collection],
                |row| row.get(0),
            )
            .map_err(index_err)?;

        Ok(count as usize)
    }

    async fn promote_collection(&self, staging: &str, live: &str) -> AppResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(index_err)?;

        if !collection_row_exists(&tx, staging)? {
            return Err(AppError::VectorIndex(format!(
                "Cannot promote missing collection '{}'",
                staging
            )));
        }

        tx.execute("DELETE FROM collections WHERE name = ?1", [live])
            .map_err(index_err)?;
        tx.execute(
            "UPDATE collections SET name = ?1 WHERE name = ?2",
            params![live, staging],
        )
        .map_err(index_err)?;

        tx.commit().map_err(index_err)?;

        tracing::info!("Promoted collection '{}' to '{}'", staging, live);
        Ok(())
    }

    async fn created_at(&self, collection: &str) -> AppResult<Option<DateTime<Utc>>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT created_at FROM collections WHERE name = ?1",
                [collection],
                |row| row.get(0),
            )
            .optional()
            .map_err(index_err)?;

        match raw {
            Some(raw) => DateTime::parse_from_rfc3339(&raw)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|e| AppError::VectorIndex(format!("Invalid created_at '{}': {}", raw, e))),
            None => Ok(None),
        }
    }

    async fn collection_model(&self, collection: &str) -> AppResult<Option<String>> {
        Ok(self.stored_embedding(collection)?.map(|(model, _)| model))
    }

    fn embedding_model(&self) -> String {
        self.embedder.model_name().to_string()
    }
}

fn index_err(e: rusqlite::Error) -> AppError {
    AppError::VectorIndex(e.to_string())
}

fn collection_row_exists(conn: &Connection, name: &str) -> AppResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM collections WHERE name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()
        .map_err(index_err)?;
    Ok(found.is_some())
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::VectorIndex(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::ollama::OllamaProvider;
    use crate::embeddings::providers::trigram::TrigramProvider;
    use crate::vector_index::document_id;
    use tempfile::TempDir;

    fn index() -> SqliteVectorIndex {
        SqliteVectorIndex::open_in_memory(Arc::new(TrigramProvider::new(256))).unwrap()
    }

    fn record(id: i64, name: &str, text: &str) -> VectorRecord {
        VectorRecord {
            id: document_id(id),
            text: text.to_string(),
            metadata: VectorMetadata {
                university_id: id,
                name: name.to_string(),
                country: "Unknown".to_string(),
                ranking: 9999,
            },
        }
    }

    #[tokio::test]
    async fn test_add_query_count() {
        let index = index();
        index.create_collection("universities").await.unwrap();
        index
            .add_documents(
                "universities",
                &[
                    record(1, "Robotics Tech", "Majors offered: Robotics, Mechatronics"),
                    record(2, "Law School", "Majors offered: Law, Political Science"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(index.count("universities").await.unwrap(), 2);

        let hits = index
            .query("universities", "best robotics programs", 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "uni_1");
        assert_eq!(hits[0].metadata.name, "Robotics Tech");
        assert!(hits[0].score >= hits[1].score);

        let top_one = index.query("universities", "law", 1).await.unwrap();
        assert_eq!(top_one.len(), 1);
    }

    #[tokio::test]
    async fn test_query_empty_collection() {
        let index = index();
        index.create_collection("universities").await.unwrap();

        let hits = index.query("universities", "anything", 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_missing_collection_errors() {
        let index = index();
        assert!(index.query("nope", "text", 5).await.is_err());
        assert!(index.count("nope").await.is_err());
        assert!(index.add_documents("nope", &[record(1, "A", "a")]).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let index = index();
        index.create_collection("universities").await.unwrap();

        assert!(index.delete_collection("universities").await.unwrap());
        assert!(!index.delete_collection("universities").await.unwrap());
        assert!(!index.collection_exists("universities").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_existing_collection_fails() {
        let index = index();
        index.create_collection("universities").await.unwrap();
        assert!(index.create_collection("universities").await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_id_fails_whole_batch() {
        let index = index();
        index.create_collection("universities").await.unwrap();
        index
            .add_documents("universities", &[record(1, "A", "alpha")])
            .await
            .unwrap();

        let err = index
            .add_documents("universities", &[record(2, "B", "beta"), record(1, "A", "alpha")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Duplicate document id 'uni_1'"));
        assert_eq!(index.count("universities").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_promote_replaces_live_collection() {
        let index = index();
        index.create_collection("live").await.unwrap();
        index.add_documents("live", &[record(1, "Old", "old data")]).await.unwrap();

        index.create_collection("live__staging").await.unwrap();
        index
            .add_documents(
                "live__staging",
                &[record(2, "New A", "new a"), record(3, "New B", "new b")],
            )
            .await
            .unwrap();

        index.promote_collection("live__staging", "live").await.unwrap();

        assert_eq!(index.count("live").await.unwrap(), 2);
        assert!(!index.collection_exists("live__staging").await.unwrap());
        let hits = index.query("live", "new", 5).await.unwrap();
        assert!(hits.iter().all(|h| h.id != "uni_1"));
    }

    #[tokio::test]
    async fn test_promote_missing_staging_keeps_live() {
        let index = index();
        index.create_collection("live").await.unwrap();
        index.add_documents("live", &[record(1, "Old", "old")]).await.unwrap();

        assert!(index.promote_collection("missing", "live").await.is_err());
        assert_eq!(index.count("live").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_file_index_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".uniguide").join("vectors.sqlite");
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(64));

        {
            let index = SqliteVectorIndex::open(&path, embedder.clone()).unwrap();
            index.create_collection("universities").await.unwrap();
            index
                .add_documents("universities", &[record(1, "A", "alpha")])
                .await
                .unwrap();
        }

        let reopened = SqliteVectorIndex::open(&path, embedder).unwrap();
        assert_eq!(reopened.count("universities").await.unwrap(), 1);
        assert!(reopened.created_at("universities").await.unwrap().is_some());
        assert_eq!(reopened.embedding_model(), "trigram-v1");
    }

    #[tokio::test]
    async fn test_query_rejects_collection_from_other_embedder() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vectors.sqlite");

        {
            let index = SqliteVectorIndex::open(&path, Arc::new(TrigramProvider::new(64))).unwrap();
            index.create_collection("universities").await.unwrap();
            index
                .add_documents(
                    "universities",
                    &[
                        record(1, "Robotics Tech", "Majors offered: Robotics"),
                        record(2, "Law School", "Majors offered: Law"),
                    ],
                )
                .await
                .unwrap();
        }

        let resized = SqliteVectorIndex::open(&path, Arc::new(TrigramProvider::new(128))).unwrap();
        let err = resized.query("universities", "robotics", 5).await.unwrap_err();
        assert!(matches!(err, AppError::VectorIndex(_)));
        assert!(err.to_string().contains("64 dimensions"));
        assert!(resized
            .add_documents("universities", &[record(3, "C", "gamma")])
            .await
            .is_err());

        let ollama = OllamaProvider::new(None, "nomic-embed-text", 64).unwrap();
        let switched = SqliteVectorIndex::open(&path, Arc::new(ollama)).unwrap();
        assert!(switched.query("universities", "robotics", 5).await.is_err());
        assert_eq!(
            switched.collection_model("universities").await.unwrap().as_deref(),
            Some("trigram-v1")
        );
        assert_eq!(switched.embedding_model(), "nomic-embed-text");
    }

    #[test]
    fn test_embedding_bytes_roundtrip() {
        let embedding = vec![0.5, -1.25, 3.0];
        let bytes = embedding_to_bytes(&embedding);
        assert_eq!(bytes.len(), 12);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), embedding);
        assert!(bytes_to_embedding(&bytes[..5]).is_err());
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
