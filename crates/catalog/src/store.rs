//! SQLite-backed catalog store.

use crate::models::{
    AdmissionRequirement, Country, CountrySummary, Criteria, Major, NewOffering, NewUniversity,
    Program, ProgramOffering, Ranking, RankingEntry, RankingSource, RequirementEntry, University,
    UniversityFilter, UniversityProgram, UniversityRecord, UniversitySummary,
};
use crate::schema;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uniguide_core::{AppError, AppResult};

/// Handle to the relational store.
///
/// The connection sits behind a mutex so the catalog can be shared between
/// async tasks. Every method locks for the duration of one call only.
pub struct Catalog {
    conn: Mutex<Connection>,
}

impl Catalog {
    /// Open (or create) a catalog database file.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Database(format!("Failed to create database directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path).map_err(|e| {
            AppError::Database(format!("Failed to open database {:?}: {}", db_path, e))
        })?;

        tracing::debug!("Opened catalog at {:?}", db_path);
        Self::from_connection(conn)
    }

    /// Open a private in-memory catalog.
    pub fn open_in_memory() -> AppResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Database("Catalog connection lock poisoned".to_string()))
    }

    /// Create every table and index if missing; see [`schema::create_tables`].
    pub fn create_tables(&self) -> AppResult<Vec<&'static str>> {
        let conn = self.lock()?;
        schema::create_tables(&conn)
    }

    pub fn count_universities(&self) -> AppResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM universities", [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }

    /// Load universities with all related rows.
    ///
    /// `None` loads every university; `Some(ids)` loads exactly those that
    /// exist. Results are ordered by ascending id regardless of the order of
    /// `ids`. Each relation is fetched with a single query.
    pub fn load_universities(&self, ids: Option<&[i64]>) -> AppResult<Vec<UniversityRecord>> {
        if matches!(ids, Some(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;

        let universities = query_universities(&conn, ids)?;
        if universities.is_empty() {
            return Ok(Vec::new());
        }

        let country_ids: Vec<i64> = {
            let mut ids: Vec<i64> = universities.iter().filter_map(|u| u.country_id).collect();
            ids.sort_unstable();
            ids.dedup();
            ids
        };
        let countries = query_countries(&conn, &country_ids)?;

        let mut rankings = query_rankings(&conn, ids)?;
        let mut programs = query_offerings(&conn, ids)?;
        let mut requirements = query_requirements(&conn, ids)?;

        let records: Vec<UniversityRecord> = universities
            .into_iter()
            .map(|university| {
                let id = university.id;
                let country = university
                    .country_id
                    .and_then(|cid| countries.get(&cid).cloned());

                UniversityRecord {
                    university,
                    country,
                    rankings: rankings.remove(&id).unwrap_or_default(),
                    programs: programs.remove(&id).unwrap_or_default(),
                    requirements: requirements.remove(&id).unwrap_or_default(),
                }
            })
            .collect();

        tracing::debug!("Loaded {} university records", records.len());
        Ok(records)
    }

    /// Fetch one university with all related rows.
    pub fn get_university(&self, id: i64) -> AppResult<Option<UniversityRecord>> {
        Ok(self.load_universities(Some(&[id]))?.into_iter().next())
    }

    /// List universities ordered by name.
    pub fn list_universities(&self, filter: &UniversityFilter) -> AppResult<Vec<UniversitySummary>> {
        let conn = self.lock()?;

        let country = filter
            .country
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));
        let limit: i64 = filter.limit.map(|l| l as i64).unwrap_or(-1);

        let mut stmt = conn.prepare(
            "SELECT u.id, u.name, u.short_name, c.name, u.founded_year,
                    (SELECT MIN(r.frank) FROM rankings r WHERE r.university_id = u.id),
                    (SELECT COUNT(*) FROM university_programs up WHERE up.university_id = u.id)
             FROM universities u
             LEFT JOIN countries c ON c.id = u.country_id
             WHERE (?1 IS NULL OR c.name = ?1 COLLATE NOCASE)
               AND (?2 IS NULL
                    OR u.name LIKE ?2 ESCAPE '\\'
                    OR u.short_name LIKE ?2 ESCAPE '\\'
                    OR u.description LIKE ?2 ESCAPE '\\')
             ORDER BY u.name COLLATE NOCASE, u.id
             LIMIT ?3",
        )?;

        let rows = stmt.query_map(params![country, search, limit], |row| {
            Ok(UniversitySummary {
                id: row.get(0)?,
                name: row.get(1)?,
                short_name: row.get(2)?,
                country: row.get(3)?,
                founded_year: row.get(4)?,
                best_rank: row.get(5)?,
                program_count: row.get(6)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// List countries with their university counts, ordered by name.
    pub fn list_countries(&self) -> AppResult<Vec<CountrySummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.name, COUNT(u.id)
             FROM countries c
             LEFT JOIN universities u ON u.country_id = c.id
             GROUP BY c.id, c.name
             ORDER BY c.name COLLATE NOCASE, c.id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(CountrySummary {
                id: row.get(0)?,
                name: row.get(1)?,
                university_count: row.get(2)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn insert_country(&self, name: &str) -> AppResult<i64> {
        self.insert("INSERT INTO countries (name) VALUES (?1)", params![name])
    }

    pub fn insert_ranking_source(&self, name: &str, description: Option<&str>) -> AppResult<i64> {
        self.insert(
            "INSERT INTO ranking_sources (name, description) VALUES (?1, ?2)",
            params![name, description],
        )
    }

    pub fn insert_major(&self, name: &str) -> AppResult<i64> {
        self.insert("INSERT INTO majors (name) VALUES (?1)", params![name])
    }

    pub fn insert_program(&self, name: &str, level: Option<&str>) -> AppResult<i64> {
        self.insert(
            "INSERT INTO programs (name, level) VALUES (?1, ?2)",
            params![name, level],
        )
    }

    pub fn insert_criteria(
        &self,
        name: &str,
        unit: Option<&str>,
        description: Option<&str>,
    ) -> AppResult<i64> {
        self.insert(
            "INSERT INTO criteria (name, unit, description) VALUES (?1, ?2, ?3)",
            params![name, unit, description],
        )
    }

    pub fn insert_university(&self, university: &NewUniversity) -> AppResult<i64> {
        self.insert(
            "INSERT INTO universities (name, short_name, country_id, founded_year, website, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                university.name,
                university.short_name,
                university.country_id,
                university.founded_year,
                university.website,
                university.description,
            ],
        )
    }

    pub fn insert_ranking(
        &self,
        university_id: i64,
        source_id: Option<i64>,
        year: Option<i32>,
        rank: Option<i64>,
    ) -> AppResult<i64> {
        self.insert(
            "INSERT INTO rankings (university_id, ranking_sources_id, fyear, frank)
             VALUES (?1, ?2, ?3, ?4)",
            params![university_id, source_id, year, rank],
        )
    }

    pub fn insert_offering(&self, offering: &NewOffering) -> AppResult<i64> {
        self.insert(
            "INSERT INTO university_programs (university_id, program_id, major_id, tuition_fee, duration)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                offering.university_id,
                offering.program_id,
                offering.major_id,
                offering.tuition_fee,
                offering.duration,
            ],
        )
    }

    pub fn insert_requirement(
        &self,
        university_id: i64,
        criteria_id: Option<i64>,
        program_id: Option<i64>,
        value: Option<&str>,
    ) -> AppResult<i64> {
        self.insert(
            "INSERT INTO university_admission_requirements (university_id, criteria_id, program_id, value)
             VALUES (?1, ?2, ?3, ?4)",
            params![university_id, criteria_id, program_id, value],
        )
    }

    fn insert(&self, sql: &str, params: impl rusqlite::Params) -> AppResult<i64> {
        let conn = self.lock()?;
        conn.execute(sql, params)?;
        Ok(conn.last_insert_rowid())
    }
}

/// Build `WHERE <column> IN (?, ?, ...)`, or nothing when loading everything.
fn id_filter(column: &str, ids: Option<&[i64]>) -> String {
    match ids {
        Some(ids) => {
            let placeholders = vec!["?"; ids.len()].join(", ");
            format!(" WHERE {} IN ({})", column, placeholders)
        }
        None => String::new(),
    }
}

fn id_params(ids: Option<&[i64]>) -> impl rusqlite::Params + '_ {
    params_from_iter(ids.unwrap_or(&[]).iter())
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn query_universities(conn: &Connection, ids: Option<&[i64]>) -> AppResult<Vec<University>> {
    let sql = format!(
        "SELECT id, name, short_name, country_id, founded_year, website, description
         FROM universities{} ORDER BY id",
        id_filter("id", ids)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(id_params(ids), |row| {
        Ok(University {
            id: row.get(0)?,
            name: row.get(1)?,
            short_name: row.get(2)?,
            country_id: row.get(3)?,
            founded_year: row.get(4)?,
            website: row.get(5)?,
            description: row.get(6)?,
        })
    })?;

    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn query_countries(conn: &Connection, ids: &[i64]) -> AppResult<HashMap<i64, Country>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let sql = format!("SELECT id, name FROM countries{}", id_filter("id", Some(ids)));
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
        Ok(Country {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;

    let mut countries = HashMap::new();
    for country in rows {
        let country = country?;
        countries.insert(country.id, country);
    }
    Ok(countries)
}

fn query_rankings(
    conn: &Connection,
    ids: Option<&[i64]>,
) -> AppResult<HashMap<i64, Vec<RankingEntry>>> {
    let sql = format!(
        "SELECT r.id, r.university_id, r.ranking_sources_id, r.fyear, r.frank,
                s.id, s.name, s.description
         FROM rankings r
         LEFT JOIN ranking_sources s ON s.id = r.ranking_sources_id{}
         ORDER BY r.id",
        id_filter("r.university_id", ids)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(id_params(ids), |row| {
        let source = match row.get::<_, Option<i64>>(5)? {
            Some(id) => Some(RankingSource {
                id,
                name: row.get(6)?,
                description: row.get(7)?,
            }),
            None => None,
        };

        Ok(RankingEntry {
            ranking: Ranking {
                id: row.get(0)?,
                university_id: row.get(1)?,
                source_id: row.get(2)?,
                year: row.get(3)?,
                rank: row.get(4)?,
            },
            source,
        })
    })?;

    group_by_university(rows, |entry| entry.ranking.university_id)
}

fn query_offerings(
    conn: &Connection,
    ids: Option<&[i64]>,
) -> AppResult<HashMap<i64, Vec<ProgramOffering>>> {
    let sql = format!(
        "SELECT up.id, up.university_id, up.program_id, up.major_id, up.tuition_fee, up.duration,
                p.id, p.name, p.level,
                m.id, m.name
         FROM university_programs up
         LEFT JOIN programs p ON p.id = up.program_id
         LEFT JOIN majors m ON m.id = up.major_id{}
         ORDER BY up.id",
        id_filter("up.university_id", ids)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(id_params(ids), |row| {
        Ok(ProgramOffering {
            offering: UniversityProgram {
                id: row.get(0)?,
                university_id: row.get(1)?,
                program_id: row.get(2)?,
                major_id: row.get(3)?,
                tuition_fee: row.get(4)?,
                duration: row.get(5)?,
            },
            program: program_at(row, 6)?,
            major: match row.get::<_, Option<i64>>(9)? {
                Some(id) => Some(Major {
                    id,
                    name: row.get(10)?,
                }),
                None => None,
            },
        })
    })?;

    group_by_university(rows, |entry| entry.offering.university_id)
}

fn query_requirements(
    conn: &Connection,
    ids: Option<&[i64]>,
) -> AppResult<HashMap<i64, Vec<RequirementEntry>>> {
    let sql = format!(
        "SELECT ar.id, ar.university_id, ar.criteria_id, ar.program_id, ar.value,
                c.id, c.name, c.unit, c.description,
                p.id, p.name, p.level
         FROM university_admission_requirements ar
         LEFT JOIN criteria c ON c.id = ar.criteria_id
         LEFT JOIN programs p ON p.id = ar.program_id{}
         ORDER BY ar.id",
        id_filter("ar.university_id", ids)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(id_params(ids), |row| {
        let criteria = match row.get::<_, Option<i64>>(5)? {
            Some(id) => Some(Criteria {
                id,
                name: row.get(6)?,
                unit: row.get(7)?,
                description: row.get(8)?,
            }),
            None => None,
        };

        Ok(RequirementEntry {
            requirement: AdmissionRequirement {
                id: row.get(0)?,
                university_id: row.get(1)?,
                criteria_id: row.get(2)?,
                program_id: row.get(3)?,
                value: row.get(4)?,
            },
            criteria,
            program: program_at(row, 9)?,
        })
    })?;

    group_by_university(rows, |entry| entry.requirement.university_id)
}

/// Read an optional LEFT JOINed program starting at column `start`.
fn program_at(row: &Row<'_>, start: usize) -> rusqlite::Result<Option<Program>> {
    match row.get::<_, Option<i64>>(start)? {
        Some(id) => Ok(Some(Program {
            id,
            name: row.get(start + 1)?,
            level: row.get(start + 2)?,
        })),
        None => Ok(None),
    }
}

fn group_by_university<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
    university_id: impl Fn(&T) -> i64,
) -> AppResult<HashMap<i64, Vec<T>>> {
    let mut grouped: HashMap<i64, Vec<T>> = HashMap::new();
    for row in rows {
        let row = row?;
        grouped.entry(university_id(&row)).or_default().push(row);
    }
    Ok(grouped)
}
