//! Retrieval layer for UniGuide.
//!
//! Turns catalog rows into searchable documents and answers questions with
//! retrieval-augmented generation:
//! - Document building (`document`)
//! - Embedding providers (`embeddings`)
//! - Vector storage behind the `VectorIndex` trait, backed by SQLite
//! - The chat assistant, index rebuilds and statistics (`rag`)

pub mod document;
pub mod embeddings;
pub mod rag;
pub mod sqlite_index;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use document::{build_document, build_metadata, build_record};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use rag::{
    suggestions, ChatFailure, ChatOutcome, ChatSettings, FailureKind, IndexStats, KnowledgeIndex,
    UniversityAssistant,
};
pub use sqlite_index::SqliteVectorIndex;
pub use vector_index::{VectorHit, VectorIndex, VectorMetadata, VectorRecord, UNRANKED_SENTINEL};
