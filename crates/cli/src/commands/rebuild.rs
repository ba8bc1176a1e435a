//! Rebuild command handler.

use clap::Args;
use uniguide_core::{config::AppConfig, AppError, AppResult};
use uniguide_knowledge::KnowledgeIndex;

/// Rebuild the vector index from the database
#[derive(Args, Debug)]
pub struct RebuildCommand {}

impl RebuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing rebuild command");

        config.validate_embedding()?;
        let knowledge = KnowledgeIndex::from_config(config)?;

        println!("Rebuilding vector index from {}", config.database_path().display());
        println!(
            "Universities in database: {}",
            knowledge.catalog().count_universities()?
        );

        if !knowledge.rebuild().await {
            return Err(AppError::VectorIndex(
                "Vector index rebuild failed; see the log for details".to_string(),
            ));
        }

        println!("Vector index rebuilt successfully");
        if let Some(stats) = knowledge.get_stats().await {
            println!("  Collection:      {}", stats.collection_name);
            println!("  Documents:       {}", stats.total_documents);
            println!("  Embedding model: {}", stats.embedding_model);
        }

        Ok(())
    }
}
