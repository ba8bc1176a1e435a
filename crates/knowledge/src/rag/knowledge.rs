//! The searchable side of the assistant: relational store plus vector index.
//!
//! Owns rebuilds and statistics. Kept separate from the chat assistant so
//! admin commands can run without a configured language model.

use crate::document::build_record;
use crate::embeddings::create_provider;
use crate::sqlite_index::SqliteVectorIndex;
use crate::vector_index::{VectorHit, VectorIndex, VectorRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uniguide_catalog::Catalog;
use uniguide_core::{AppConfig, AppError, AppResult};

/// Suffix of the collection a rebuild writes into before promotion.
const STAGING_SUFFIX: &str = "__staging";

/// Snapshot of the live collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub total_documents: usize,
    pub collection_name: String,
    pub embedding_model: String,
    pub built_at: Option<DateTime<Utc>>,
}

/// Relational store and vector index behind one collection name.
pub struct KnowledgeIndex {
    catalog: Arc<Catalog>,
    index: Arc<dyn VectorIndex>,
    collection: String,
    batch_size: usize,
}

impl KnowledgeIndex {
    pub fn new(
        catalog: Arc<Catalog>,
        index: Arc<dyn VectorIndex>,
        collection: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            catalog,
            index,
            collection: collection.into(),
            batch_size: batch_size.max(1),
        }
    }

    /// Open the configured database and vector index.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let catalog = Catalog::open(&config.database_path())?;
        let embedder = create_provider(&config.embedding)?;
        let index = SqliteVectorIndex::open(&config.index_path(), embedder)?;

        Ok(Self::new(
            Arc::new(catalog),
            Arc::new(index),
            config.collection_name.clone(),
            config.embedding.batch_size,
        ))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn staging_collection(&self) -> String {
        format!("{}{}", self.collection, STAGING_SUFFIX)
    }

    /// Nearest documents in the live collection.
    pub async fn search(&self, question: &str, top_k: usize) -> AppResult<Vec<VectorHit>> {
        self.index.query(&self.collection, question, top_k).await
    }

    /// Rebuild the live collection from the relational store.
    ///
    /// Returns `false` when anything failed; the previous live collection is
    /// then left untouched.
    pub async fn rebuild(&self) -> bool {
        match self.try_rebuild().await {
            Ok(count) => {
                info!("Vector index rebuilt with {} universities", count);
                true
            }
            Err(e) => {
                error!("Failed to rebuild vector index: {}", e);
                false
            }
        }
    }

    /// Rebuild and report the number of indexed universities.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn try_rebuild(&self) -> AppResult<usize> {
        let staging = self.staging_collection();

        if self.index.delete_collection(&staging).await? {
            warn!("Dropped leftover staging collection '{}'", staging);
        }
        self.index.create_collection(&staging).await?;

        let result = self.populate(&staging).await;
        let count = match result {
            Ok(count) => count,
            Err(e) => {
                if let Err(cleanup) = self.index.delete_collection(&staging).await {
                    warn!("Failed to drop staging collection '{}': {}", staging, cleanup);
                }
                return Err(e);
            }
        };

        self.index
            .promote_collection(&staging, &self.collection)
            .await?;
        Ok(count)
    }

    async fn populate(&self, collection: &str) -> AppResult<usize> {
        let universities = self.catalog.load_universities(None)?;
        if universities.is_empty() {
            warn!("No universities in the database; the index will be empty");
            return Ok(0);
        }

        let records: Vec<VectorRecord> = universities.iter().map(build_record).collect();
        let batches = records.len().div_ceil(self.batch_size);

        for (i, batch) in records.chunks(self.batch_size).enumerate() {
            self.index.add_documents(collection, batch).await?;
            debug!("Indexed batch {}/{} ({} documents)", i + 1, batches, batch.len());
        }

        Ok(records.len())
    }

    /// Build the live collection if it does not exist yet.
    ///
    /// Returns whether a build happened.
    pub async fn ensure_index(&self) -> AppResult<bool> {
        if self.index.collection_exists(&self.collection).await? {
            debug!("Collection '{}' already exists", self.collection);
            return Ok(false);
        }

        info!("Collection '{}' not found, building it", self.collection);
        self.try_rebuild().await?;
        Ok(true)
    }

    /// Statistics for the live collection, or `None` when it cannot be read.
    pub async fn get_stats(&self) -> Option<IndexStats> {
        match self.try_stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!("Failed to read index statistics: {}", e);
                None
            }
        }
    }

    async fn try_stats(&self) -> AppResult<IndexStats> {
        if !self.index.collection_exists(&self.collection).await? {
            return Err(AppError::VectorIndex(format!(
                "Collection '{}' does not exist",
                self.collection
            )));
        }

        Ok(IndexStats {
            total_documents: self.index.count(&self.collection).await?,
            collection_name: self.collection.clone(),
            embedding_model: self
                .index
                .collection_model(&self.collection)
                .await?
                .unwrap_or_else(|| self.index.embedding_model()),
            built_at: self.index.created_at(&self.collection).await?,
        })
    }
}
