//! SQLite schema for the university catalog.

use rusqlite::Connection;
use uniguide_core::{AppError, AppResult};

/// Entity tables in dependency order: referenced tables come first.
pub const TABLES: [&str; 9] = [
    "countries",
    "ranking_sources",
    "majors",
    "programs",
    "criteria",
    "universities",
    "rankings",
    "university_programs",
    "university_admission_requirements",
];

const TABLE_DDL: [(&str, &str); 9] = [
    (
        "countries",
        "CREATE TABLE IF NOT EXISTS countries (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        )",
    ),
    (
        "ranking_sources",
        "CREATE TABLE IF NOT EXISTS ranking_sources (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT
        )",
    ),
    (
        "majors",
        "CREATE TABLE IF NOT EXISTS majors (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        )",
    ),
    (
        "programs",
        "CREATE TABLE IF NOT EXISTS programs (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            level TEXT
        )",
    ),
    (
        "criteria",
        "CREATE TABLE IF NOT EXISTS criteria (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            unit TEXT,
            description TEXT
        )",
    ),
    (
        "universities",
        "CREATE TABLE IF NOT EXISTS universities (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            short_name TEXT,
            country_id INTEGER REFERENCES countries(id) ON DELETE CASCADE,
            founded_year INTEGER,
            website TEXT,
            description TEXT
        )",
    ),
    (
        "rankings",
        "CREATE TABLE IF NOT EXISTS rankings (
            id INTEGER PRIMARY KEY,
            university_id INTEGER REFERENCES universities(id) ON DELETE CASCADE,
            ranking_sources_id INTEGER REFERENCES ranking_sources(id) ON DELETE CASCADE,
            fyear INTEGER,
            frank INTEGER
        )",
    ),
    (
        "university_programs",
        "CREATE TABLE IF NOT EXISTS university_programs (
            id INTEGER PRIMARY KEY,
            university_id INTEGER REFERENCES universities(id) ON DELETE CASCADE,
            program_id INTEGER REFERENCES programs(id) ON DELETE CASCADE,
            major_id INTEGER REFERENCES majors(id) ON DELETE CASCADE,
            tuition_fee REAL,
            duration TEXT
        )",
    ),
    (
        "university_admission_requirements",
        "CREATE TABLE IF NOT EXISTS university_admission_requirements (
            id INTEGER PRIMARY KEY,
            university_id INTEGER REFERENCES universities(id) ON DELETE CASCADE,
            criteria_id INTEGER REFERENCES criteria(id) ON DELETE CASCADE,
            program_id INTEGER REFERENCES programs(id) ON DELETE CASCADE,
            value TEXT
        )",
    ),
];

const INDEX_DDL: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_universities_country ON universities(country_id);
    CREATE INDEX IF NOT EXISTS idx_rankings_university ON rankings(university_id);
    CREATE INDEX IF NOT EXISTS idx_rankings_source ON rankings(ranking_sources_id);
    CREATE INDEX IF NOT EXISTS idx_university_programs_university ON university_programs(university_id);
    CREATE INDEX IF NOT EXISTS idx_university_programs_major ON university_programs(major_id);
    CREATE INDEX IF NOT EXISTS idx_admission_reqs_university ON university_admission_requirements(university_id);
"#;

/// Create every catalog table and index if missing.
///
/// Returns the names of the tables processed, in creation order. Running it
/// against an existing database changes nothing.
pub fn create_tables(conn: &Connection) -> AppResult<Vec<&'static str>> {
    let mut processed = Vec::with_capacity(TABLE_DDL.len());

    for (table, ddl) in TABLE_DDL {
        tracing::debug!("Creating {} table", table);
        conn.execute(ddl, []).map_err(|e| {
            AppError::Database(format!("Failed to create table {}: {}", table, e))
        })?;
        processed.push(table);
    }

    conn.execute_batch(INDEX_DDL)
        .map_err(|e| AppError::Database(format!("Failed to create indexes: {}", e)))?;

    tracing::info!("Catalog schema ready ({} tables)", processed.len());
    Ok(processed)
}
