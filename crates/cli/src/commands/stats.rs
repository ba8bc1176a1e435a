//! Stats and suggestions command handlers.

use clap::Args;
use uniguide_core::{config::AppConfig, AppResult};
use uniguide_knowledge::{suggestions, KnowledgeIndex};

/// Show vector index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let knowledge = KnowledgeIndex::from_config(config)?;
        let stats = knowledge.get_stats().await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }

        match stats {
            Some(stats) => {
                println!("Collection:      {}", stats.collection_name);
                println!("Documents:       {}", stats.total_documents);
                println!("Embedding model: {}", stats.embedding_model);
                if let Some(built_at) = stats.built_at {
                    println!("Built at:        {}", built_at.to_rfc3339());
                }
            }
            None => println!("Vector index not built yet. Run `uniguide rebuild`."),
        }

        Ok(())
    }
}

/// Show example questions
#[derive(Args, Debug)]
pub struct SuggestionsCommand {}

impl SuggestionsCommand {
    pub fn execute(&self) -> AppResult<()> {
        for (i, question) in suggestions().iter().enumerate() {
            println!("{}. {}", i + 1, question);
        }
        Ok(())
    }
}
