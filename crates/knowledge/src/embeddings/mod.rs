//! Embedding generation for university documents and questions.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
