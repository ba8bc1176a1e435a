//! Document builder: one flat text block per university.
//!
//! The text is what gets embedded, so every line is always present; missing
//! data renders as a fixed placeholder instead of being dropped.

use crate::vector_index::{document_id, VectorMetadata, VectorRecord, UNRANKED_SENTINEL};
use uniguide_catalog::UniversityRecord;

/// Offerings considered when listing majors.
const MAX_MAJOR_OFFERINGS: usize = 5;

/// Render the document text for one university.
pub fn build_document(record: &UniversityRecord) -> String {
    let university = &record.university;
    let current = record.current_ranking();

    let majors: Vec<&str> = record
        .programs
        .iter()
        .take(MAX_MAJOR_OFFERINGS)
        .filter_map(|p| p.major.as_ref().map(|m| m.name.as_str()))
        .collect();

    let rank = current
        .and_then(|entry| entry.ranking.rank)
        .map(|rank| rank.to_string());
    let source = current
        .and_then(|entry| entry.source.as_ref())
        .map(|source| source.name.as_str());
    let tuition = record.average_tuition().map(format_tuition);

    let lines = [
        format!("Name: {}", university.name),
        format!("Short name: {}", or_placeholder(university.short_name.as_deref(), "N/A")),
        format!("Country: {}", or_placeholder(record.country_name(), "Unknown")),
        format!(
            "Description: {}",
            or_placeholder(university.description.as_deref(), "No description available")
        ),
        format!(
            "Majors offered: {}",
            if majors.is_empty() {
                "Not updated yet".to_string()
            } else {
                majors.join(", ")
            }
        ),
        format!("World ranking: {}", or_placeholder(rank.as_deref(), "Unranked")),
        format!("Ranking source: {}", or_placeholder(source, "N/A")),
        format!(
            "Founded: {}",
            university
                .founded_year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "Unknown".to_string())
        ),
        format!("Average tuition: {}", or_placeholder(tuition.as_deref(), "No data")),
        format!("Website: {}", or_placeholder(university.website.as_deref(), "Not available")),
    ];

    lines.join("\n")
}

/// Metadata stored next to the document in the vector index.
pub fn build_metadata(record: &UniversityRecord) -> VectorMetadata {
    VectorMetadata {
        university_id: record.university.id,
        name: record.university.name.clone(),
        country: or_placeholder(record.country_name(), "Unknown").to_string(),
        ranking: record
            .current_ranking()
            .and_then(|entry| entry.ranking.rank)
            .unwrap_or(UNRANKED_SENTINEL),
    }
}

/// Document plus metadata under the university's stable id.
pub fn build_record(record: &UniversityRecord) -> VectorRecord {
    VectorRecord {
        id: document_id(record.university.id),
        text: build_document(record),
        metadata: build_metadata(record),
    }
}

/// Format a yearly fee as `$12,345/year`.
pub fn format_tuition(amount: f64) -> String {
    format!("${}/year", group_thousands(amount.round() as i64))
}

/// Blank strings count as missing.
pub(crate) fn or_placeholder<'a>(value: Option<&'a str>, placeholder: &'a str) -> &'a str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(placeholder)
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
