//! Create-tables command handler.

use clap::Args;
use std::path::Path;
use uniguide_catalog::Catalog;
use uniguide_core::{config::AppConfig, AppResult};

/// Create the database tables
#[derive(Args, Debug)]
pub struct CreateTablesCommand {}

impl CreateTablesCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing create-tables command");

        let db_path = config.database_path();
        let tables = create_tables(&db_path)?;

        println!("Database: {}", db_path.display());
        println!("Tables ready: {}", tables.join(", "));
        println!();
        println!("Next steps:");
        println!("  1. Load university data into the database");
        println!("  2. Run `uniguide rebuild` to build the vector index");
        println!("  3. Ask a question with `uniguide ask \"...\"`");

        Ok(())
    }
}

fn create_tables(db_path: &Path) -> AppResult<Vec<&'static str>> {
    let catalog = Catalog::open(db_path)?;
    catalog.create_tables()
}
