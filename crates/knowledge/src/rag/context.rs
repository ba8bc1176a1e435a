//! Context rendering for the answer prompt.
//!
//! Each retrieved university becomes one block of facts. Blocks are read
//! from the relational store, not from the indexed document text, so the
//! model always sees current data.

use crate::document::{format_tuition, or_placeholder};
use uniguide_catalog::UniversityRecord;

/// Offerings and requirements considered per university.
const MAX_LISTED_ITEMS: usize = 3;

/// Description characters kept before the ellipsis.
const DESCRIPTION_LIMIT: usize = 200;

const RULE: &str = "========================================";

/// Render the context for every retrieved university, in order.
pub fn build_context(records: &[UniversityRecord]) -> String {
    records.iter().map(university_block).collect()
}

fn university_block(record: &UniversityRecord) -> String {
    let university = &record.university;
    let current = record.current_ranking();

    let rank = current
        .and_then(|entry| entry.ranking.rank)
        .map(|rank| rank.to_string());
    let source = current
        .and_then(|entry| entry.source.as_ref())
        .map(|source| source.name.as_str());
    let founded = university.founded_year.map(|year| year.to_string());

    let mut block = format!(
        "\n{rule}\nUNIVERSITY: {name}\n{rule}\n\
         Country: {country}\n\
         World ranking: #{rank} ({source})\n\
         Founded: {founded}\n\
         Website: {website}\n",
        rule = RULE,
        name = university.name,
        country = or_placeholder(record.country_name(), "N/A"),
        rank = or_placeholder(rank.as_deref(), "N/A"),
        source = or_placeholder(source, "N/A"),
        founded = or_placeholder(founded.as_deref(), "N/A"),
        website = or_placeholder(university.website.as_deref(), "N/A"),
    );

    block.push_str("\nPrograms:\n");
    let programs = program_lines(record);
    if programs.is_empty() {
        block.push_str("  No information available\n");
    } else {
        for line in programs {
            block.push_str(&format!("  - {}\n", line));
        }
    }

    block.push_str("\nAdmission requirements:\n");
    let requirements = requirement_lines(record);
    if requirements.is_empty() {
        block.push_str("  No information available\n");
    } else {
        for line in requirements {
            block.push_str(&format!("  - {}\n", line));
        }
    }

    block.push_str(&format!("\nDescription: {}...\n", description_excerpt(record)));
    block
}

/// Lines for the first offerings; an offering without both a program and a
/// major is skipped but still counts toward the limit.
fn program_lines(record: &UniversityRecord) -> Vec<String> {
    record
        .programs
        .iter()
        .take(MAX_LISTED_ITEMS)
        .filter_map(|p| {
            let program = p.program.as_ref()?;
            let major = p.major.as_ref()?;
            let level = or_placeholder(program.level.as_deref(), &program.name);
            let fee = p
                .offering
                .tuition_fee
                .map(format_tuition)
                .unwrap_or_else(|| "N/A".to_string());
            Some(format!("{} ({}): {}", major.name, level, fee))
        })
        .collect()
}

fn requirement_lines(record: &UniversityRecord) -> Vec<String> {
    record
        .requirements
        .iter()
        .take(MAX_LISTED_ITEMS)
        .filter_map(|r| {
            let criteria = r.criteria.as_ref()?;
            let value = or_placeholder(r.requirement.value.as_deref(), "N/A");
            Some(format!("{}: {}", criteria.name, value))
        })
        .collect()
}

fn description_excerpt(record: &UniversityRecord) -> String {
    match record.university.description.as_deref() {
        Some(text) if !text.trim().is_empty() => text.chars().take(DESCRIPTION_LIMIT).collect(),
        _ => "No description available".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uniguide_catalog::{
        AdmissionRequirement, Country, Criteria, Major, Program, ProgramOffering, Ranking,
        RankingEntry, RankingSource, RequirementEntry, University, UniversityProgram,
    };

    fn record(id: i64, name: &str) -> UniversityRecord {
        UniversityRecord::new(University {
            id,
            name: name.to_string(),
            short_name: None,
            country_id: None,
            founded_year: None,
            website: None,
            description: None,
        })
    }

    fn offering(id: i64, major: &str, level: &str, fee: Option<f64>) -> ProgramOffering {
        ProgramOffering {
            offering: UniversityProgram {
                id,
                university_id: 1,
                program_id: Some(id),
                major_id: Some(id),
                tuition_fee: fee,
                duration: None,
            },
            program: Some(Program {
                id,
                name: format!("{} degree", level),
                level: Some(level.to_string()),
            }),
            major: Some(Major {
                id,
                name: major.to_string(),
            }),
        }
    }

    fn requirement(id: i64, criteria: Option<&str>, value: Option<&str>) -> RequirementEntry {
        RequirementEntry {
            requirement: AdmissionRequirement {
                id,
                university_id: 1,
                criteria_id: criteria.map(|_| id),
                program_id: None,
                value: value.map(str::to_string),
            },
            criteria: criteria.map(|name| Criteria {
                id,
                name: name.to_string(),
                unit: None,
                description: None,
            }),
            program: None,
        }
    }

    #[test]
    fn test_block_with_full_data() {
        let mut mit = record(1, "MIT");
        mit.university.founded_year = Some(1861);
        mit.university.website = Some("https://mit.edu".to_string());
        mit.country = Some(Country {
            id: 1,
            name: "United States".to_string(),
        });
        mit.rankings = vec![RankingEntry {
            ranking: Ranking {
                id: 1,
                university_id: 1,
                source_id: Some(1),
                year: Some(2024),
                rank: Some(1),
            },
            source: Some(RankingSource {
                id: 1,
                name: "QS".to_string(),
                description: None,
            }),
        }];
        mit.programs = vec![offering(1, "Computer Science", "Bachelor", Some(57_986.0))];
        mit.requirements = vec![requirement(1, Some("IELTS"), Some("7.0"))];

        let context = build_context(&[mit]);
        assert!(context.contains("UNIVERSITY: MIT"));
        assert!(context.contains("Country: United States"));
        assert!(context.contains("World ranking: #1 (QS)"));
        assert!(context.contains("Founded: 1861"));
        assert!(context.contains("  - Computer Science (Bachelor): $57,986/year"));
        assert!(context.contains("  - IELTS: 7.0"));
        assert!(context.contains("Description: No description available..."));
    }

    #[test]
    fn test_block_without_related_rows() {
        let context = build_context(&[record(2, "Atlantis University")]);
        assert!(context.contains("World ranking: #N/A (N/A)"));
        assert!(context.contains("Programs:\n  No information available"));
        assert!(context.contains("Admission requirements:\n  No information available"));
    }

    #[test]
    fn test_only_first_three_items_are_considered() {
        let mut uni = record(1, "Big U");
        uni.programs = vec![
            offering(1, "Math", "Bachelor", None),
            offering(2, "Physics", "Master", Some(1000.0)),
            offering(3, "Chemistry", "PhD", None),
            offering(4, "Music", "Bachelor", None),
        ];
        uni.requirements = vec![
            requirement(1, None, Some("ignored")),
            requirement(2, Some("GPA"), None),
            requirement(3, Some("SAT"), Some("1500")),
            requirement(4, Some("TOEFL"), Some("100")),
        ];

        let context = build_context(&[uni]);
        assert!(context.contains("  - Math (Bachelor): N/A"));
        assert!(context.contains("  - Physics (Master): $1,000/year"));
        assert!(!context.contains("Music"));
        assert!(context.contains("  - GPA: N/A"));
        assert!(context.contains("  - SAT: 1500"));
        assert!(!context.contains("TOEFL"));
        assert!(!context.contains("ignored"));
    }

    #[test]
    fn test_description_truncated() {
        let mut uni = record(1, "Long U");
        uni.university.description = Some("é".repeat(250));

        let context = build_context(&[uni]);
        let expected = format!("Description: {}...", "é".repeat(200));
        assert!(context.contains(&expected));
        assert!(!context.contains(&"é".repeat(201)));
    }

    #[test]
    fn test_blocks_keep_order() {
        let context = build_context(&[record(2, "Oxford"), record(1, "MIT")]);
        let oxford = context.find("UNIVERSITY: Oxford").unwrap();
        let mit = context.find("UNIVERSITY: MIT").unwrap();
        assert!(oxford < mit);
    }
}
