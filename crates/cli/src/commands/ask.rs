//! Ask command handler.
//!
//! Runs one chat turn against the assistant.

use clap::Args;
use uniguide_core::{config::AppConfig, AppResult};
use uniguide_knowledge::UniversityAssistant;

/// Ask a question about universities
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Print the typed outcome as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        config.validate()?;
        let assistant = UniversityAssistant::from_config(config)?;

        // A missing index shows up as a retrieval failure in the answer
        if let Err(e) = assistant.ensure_index().await {
            tracing::warn!("Could not build the vector index: {}", e);
        }

        let outcome = assistant.chat(&self.question).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            println!("{}", outcome.render());
        }

        Ok(())
    }
}
