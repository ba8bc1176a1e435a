//! UniGuide CLI
//!
//! Main entry point for the uniguide command-line tool.
//! Answers university comparison questions and runs the admin tasks that
//! keep the vector index in step with the database.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AskCommand, CountriesCommand, CreateTablesCommand, ExportCommand, RebuildCommand,
    StatsCommand, SuggestionsCommand, UniversitiesCommand,
};
use std::path::PathBuf;
use uniguide_core::{config::AppConfig, logging, AppResult};

/// UniGuide - compare universities with retrieval-augmented answers
#[derive(Parser, Debug)]
#[command(name = "uniguide")]
#[command(about = "Compare universities with retrieval-augmented answers", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// LLM provider (gemini, ollama)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question about universities
    Ask(AskCommand),

    /// Rebuild the vector index from the database
    Rebuild(RebuildCommand),

    /// Export the database to JSON
    Export(ExportCommand),

    /// Create the database tables
    CreateTables(CreateTablesCommand),

    /// Show vector index statistics
    Stats(StatsCommand),

    /// Show example questions
    Suggestions(SuggestionsCommand),

    /// Browse universities in the database
    Universities(UniversitiesCommand),

    /// List countries with university counts
    Countries(CountriesCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ask(_) => "ask",
            Commands::Rebuild(_) => "rebuild",
            Commands::Export(_) => "export",
            Commands::CreateTables(_) => "create-tables",
            Commands::Stats(_) => "stats",
            Commands::Suggestions(_) => "suggestions",
            Commands::Universities(_) => "universities",
            Commands::Countries(_) => "countries",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Defaults, config file and environment, then CLI overrides
    let config = AppConfig::load_from(cli.workspace, cli.config)?.with_overrides(
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("UniGuide CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Database: {:?}", config.database_path());
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_uniguide_dir()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Rebuild(cmd) => cmd.execute(&config).await,
        Commands::Export(cmd) => cmd.execute(&config),
        Commands::CreateTables(cmd) => cmd.execute(&config),
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Suggestions(cmd) => cmd.execute(),
        Commands::Universities(cmd) => cmd.execute(&config),
        Commands::Countries(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
