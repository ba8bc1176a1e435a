//! Command handlers for the UniGuide CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod browse;
pub mod export;
pub mod rebuild;
pub mod stats;
pub mod tables;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use browse::{CountriesCommand, UniversitiesCommand};
pub use export::ExportCommand;
pub use rebuild::RebuildCommand;
pub use stats::{StatsCommand, SuggestionsCommand};
pub use tables::CreateTablesCommand;
