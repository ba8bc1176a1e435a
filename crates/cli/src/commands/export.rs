//! Export command handler.

use clap::Args;
use std::path::PathBuf;
use uniguide_catalog::{Catalog, DEFAULT_EXPORT_FILE};
use uniguide_core::{config::AppConfig, AppResult};

/// Export the database to JSON
#[derive(Args, Debug)]
pub struct ExportCommand {
    /// Output file, relative to the workspace unless absolute
    #[arg(short, long, default_value = DEFAULT_EXPORT_FILE)]
    pub output: PathBuf,
}

impl ExportCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing export command");

        let output = if self.output.is_absolute() {
            self.output.clone()
        } else {
            config.workspace.join(&self.output)
        };

        let catalog = Catalog::open(&config.database_path())?;
        let summary = catalog.export_to_file(&output)?;

        for table in &summary.tables {
            println!("  {:<35} {:>6}", table.table, table.count);
        }
        println!(
            "Exported {} records to {}",
            summary.total,
            summary.path.display()
        );

        Ok(())
    }
}
