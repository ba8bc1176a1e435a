//! Vector index abstraction for university documents.
//!
//! Defines a trait for provider-agnostic vector storage and retrieval. The
//! index embeds text itself, so callers hand over documents and questions as
//! plain strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uniguide_core::AppResult;

/// Ranking stored in metadata when a university has none.
pub const UNRANKED_SENTINEL: i64 = 9999;

/// Typed metadata stored next to every document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub university_id: i64,
    pub name: String,
    /// Country name, or `"Unknown"`
    pub country: String,
    /// Current rank, or [`UNRANKED_SENTINEL`]
    pub ranking: i64,
}

/// A document ready to be indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    /// Stable identifier, `uni_<university id>`
    pub id: String,
    pub text: String,
    pub metadata: VectorMetadata,
}

/// One query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorHit {
    pub id: String,
    pub metadata: VectorMetadata,
    /// Cosine similarity to the query
    pub score: f32,
}

/// Build the stable document identifier for a university.
pub fn document_id(university_id: i64) -> String {
    format!("uni_{}", university_id)
}

/// Trait for vector index backends.
///
/// Collections are named and independently created and dropped. Methods take
/// `&self`; backends handle their own interior locking.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create an empty collection. Fails if it already exists.
    async fn create_collection(&self, name: &str) -> AppResult<()>;

    /// Drop a collection and its documents.
    ///
    /// Returns whether anything was dropped; a missing collection is not an error.
    async fn delete_collection(&self, name: &str) -> AppResult<bool>;

    async fn collection_exists(&self, name: &str) -> AppResult<bool>;

    /// Embed and insert documents. A duplicate id fails the whole call.
    async fn add_documents(&self, collection: &str, records: &[VectorRecord]) -> AppResult<()>;

    /// Return up to `top_k` documents ordered by descending similarity.
    async fn query(&self, collection: &str, text: &str, top_k: usize) -> AppResult<Vec<VectorHit>>;

    /// Number of documents in a collection.
    async fn count(&self, collection: &str) -> AppResult<usize>;

    /// Atomically replace `live` with the contents of `staging`.
    ///
    /// Readers see either the old or the new collection, never an empty one.
    async fn promote_collection(&self, staging: &str, live: &str) -> AppResult<()>;

    /// When a collection was created, if the backend records it.
    async fn created_at(&self, _collection: &str) -> AppResult<Option<DateTime<Utc>>> {
        Ok(None)
    }

    /// Embedding model a collection was built with, if the backend records it.
    async fn collection_model(&self, _collection: &str) -> AppResult<Option<String>> {
        Ok(None)
    }

    /// Label of the embedding model used by this index.
    fn embedding_model(&self) -> String;
}
