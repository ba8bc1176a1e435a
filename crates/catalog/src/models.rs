//! Catalog entities and read models.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Country {
    pub id: i64,
    pub name: String,
}

/// A ranking publisher such as QS or THE.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingSource {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// A field of study.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Major {
    pub id: i64,
    pub name: String,
}

/// A degree category; `level` is Bachelor, Master, PhD and so on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub id: i64,
    pub name: String,
    pub level: Option<String>,
}

/// An admission requirement category (IELTS, GPA, SAT...).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Criteria {
    pub id: i64,
    pub name: String,
    pub unit: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct University {
    pub id: i64,
    pub name: String,
    pub short_name: Option<String>,
    pub country_id: Option<i64>,
    pub founded_year: Option<i32>,
    pub website: Option<String>,
    pub description: Option<String>,
}

/// One (university, source, year, rank) fact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub id: i64,
    pub university_id: i64,
    pub source_id: Option<i64>,
    pub year: Option<i32>,
    pub rank: Option<i64>,
}

/// A university offering a (program, major) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniversityProgram {
    pub id: i64,
    pub university_id: i64,
    pub program_id: Option<i64>,
    pub major_id: Option<i64>,
    pub tuition_fee: Option<f64>,
    pub duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdmissionRequirement {
    pub id: i64,
    pub university_id: i64,
    pub criteria_id: Option<i64>,
    pub program_id: Option<i64>,
    pub value: Option<String>,
}

/// A ranking joined with its publisher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub ranking: Ranking,
    pub source: Option<RankingSource>,
}

/// A program offering joined with its program and major.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramOffering {
    pub offering: UniversityProgram,
    pub program: Option<Program>,
    pub major: Option<Major>,
}

/// An admission requirement joined with its criteria and program.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementEntry {
    pub requirement: AdmissionRequirement,
    pub criteria: Option<Criteria>,
    pub program: Option<Program>,
}

/// A university with every related row loaded.
///
/// Related collections keep storage order (ascending id).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniversityRecord {
    pub university: University,
    pub country: Option<Country>,
    pub rankings: Vec<RankingEntry>,
    pub programs: Vec<ProgramOffering>,
    pub requirements: Vec<RequirementEntry>,
}

impl UniversityRecord {
    pub fn new(university: University) -> Self {
        Self {
            university,
            country: None,
            rankings: Vec::new(),
            programs: Vec::new(),
            requirements: Vec::new(),
        }
    }

    pub fn country_name(&self) -> Option<&str> {
        self.country.as_ref().map(|c| c.name.as_str())
    }

    /// The ranking with the most recent year.
    ///
    /// Ties keep the first stored ranking. Rankings without a year sort
    /// below every dated one.
    pub fn current_ranking(&self) -> Option<&RankingEntry> {
        let mut current: Option<&RankingEntry> = None;
        for entry in &self.rankings {
            match current {
                Some(best) if entry.ranking.year <= best.ranking.year => {}
                _ => current = Some(entry),
            }
        }
        current
    }

    /// Mean tuition across all offerings that have a fee.
    pub fn average_tuition(&self) -> Option<f64> {
        let fees: Vec<f64> = self
            .programs
            .iter()
            .filter_map(|p| p.offering.tuition_fee)
            .collect();

        if fees.is_empty() {
            return None;
        }

        Some(fees.iter().sum::<f64>() / fees.len() as f64)
    }
}

/// Fields for inserting a university.
#[derive(Debug, Clone, Default)]
pub struct NewUniversity {
    pub name: String,
    pub short_name: Option<String>,
    pub country_id: Option<i64>,
    pub founded_year: Option<i32>,
    pub website: Option<String>,
    pub description: Option<String>,
}

impl NewUniversity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Fields for inserting a program offering.
#[derive(Debug, Clone, Default)]
pub struct NewOffering {
    pub university_id: i64,
    pub program_id: Option<i64>,
    pub major_id: Option<i64>,
    pub tuition_fee: Option<f64>,
    pub duration: Option<String>,
}

/// Filters for the university listing.
#[derive(Debug, Clone, Default)]
pub struct UniversityFilter {
    /// Exact country name, case-insensitive
    pub country: Option<String>,

    /// Substring matched against name, short name and description
    pub search: Option<String>,

    /// Maximum rows; `None` lists everything
    pub limit: Option<usize>,
}

/// One row of the university listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniversitySummary {
    pub id: i64,
    pub name: String,
    pub short_name: Option<String>,
    pub country: Option<String>,
    pub founded_year: Option<i32>,
    /// Numerically lowest rank across all sources and years
    pub best_rank: Option<i64>,
    pub program_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountrySummary {
    pub id: i64,
    pub name: String,
    pub university_count: i64,
}
