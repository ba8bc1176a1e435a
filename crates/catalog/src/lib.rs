//! Relational store for UniGuide.
//!
//! Holds the normalized university data (countries, programs, majors,
//! rankings and admission requirements) in SQLite and exposes:
//! - Schema bootstrap (`create_tables`)
//! - Bulk aggregate loading for document building and retrieval
//! - Read-only browsing queries
//! - Dependency-ordered JSON export

pub mod export;
pub mod models;
pub mod schema;
pub mod store;

pub use export::{ExportRecord, ExportSummary, TableCount, DEFAULT_EXPORT_FILE};
pub use models::{
    AdmissionRequirement, CountrySummary, Country, Criteria, Major, NewOffering, NewUniversity,
    Program, ProgramOffering, Ranking, RankingEntry, RankingSource, RequirementEntry, University,
    UniversityFilter, UniversityProgram, UniversityRecord, UniversitySummary,
};
pub use schema::TABLES;
pub use store::Catalog;
