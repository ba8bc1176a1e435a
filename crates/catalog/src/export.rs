//! JSON export of the whole catalog.
//!
//! Produces a flat array of `{"model", "pk", "fields"}` objects, one per row,
//! with referenced tables written before the tables that point at them so the
//! file can be replayed in order.

use crate::schema::TABLES;
use crate::store::Catalog;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use uniguide_core::{AppError, AppResult};

/// File name used when no output path is given.
pub const DEFAULT_EXPORT_FILE: &str = "database_export.json";

/// One exported row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRecord {
    pub model: String,
    pub pk: i64,
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableCount {
    pub table: &'static str,
    pub count: usize,
}

/// Outcome of writing an export file.
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub total: usize,
    pub tables: Vec<TableCount>,
}

impl Catalog {
    /// Read every table in dependency order.
    pub fn export_records(&self) -> AppResult<(Vec<ExportRecord>, Vec<TableCount>)> {
        let conn = self.lock()?;
        let mut records = Vec::new();
        let mut counts = Vec::with_capacity(TABLES.len());

        for table in TABLES {
            tracing::info!("Exporting {}...", table);
            let rows = export_table(&conn, table)?;

            if rows.is_empty() {
                tracing::warn!("No data found for {}", table);
            } else {
                tracing::info!("Exported {} {}", rows.len(), table);
            }

            counts.push(TableCount {
                table,
                count: rows.len(),
            });
            records.extend(rows);
        }

        Ok((records, counts))
    }

    /// Write the export as pretty-printed JSON to `path`.
    pub fn export_to_file(&self, path: &Path) -> AppResult<ExportSummary> {
        let (records, tables) = self.export_records()?;

        let json = serde_json::to_string_pretty(&records)?;
        std::fs::write(path, json).map_err(|e| {
            AppError::Other(format!("Failed to write export file {:?}: {}", path, e))
        })?;

        tracing::info!("Export complete, saved {} objects to {:?}", records.len(), path);

        Ok(ExportSummary {
            path: path.to_path_buf(),
            total: records.len(),
            tables,
        })
    }
}

fn export_table(conn: &Connection, table: &str) -> AppResult<Vec<ExportRecord>> {
    // Table names come from the fixed schema list, never from input
    let mut stmt = conn.prepare(&format!("SELECT * FROM {} ORDER BY id", table))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let mut rows = stmt.query([])?;
    let mut records = Vec::new();

    while let Some(row) = rows.next()? {
        let mut pk = 0;
        let mut fields = Map::new();

        for (idx, column) in columns.iter().enumerate() {
            if column == "id" {
                pk = row.get(idx)?;
                continue;
            }
            fields.insert(column.clone(), to_json(row.get_ref(idx)?));
        }

        records.push(ExportRecord {
            model: table.to_string(),
            pk,
            fields,
        });
    }

    Ok(records)
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::from(bytes.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewOffering, NewUniversity};
    use tempfile::TempDir;

    fn catalog_with_data() -> Catalog {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.create_tables().unwrap();

        let japan = catalog.insert_country("Japan").unwrap();
        let tokyo = catalog
            .insert_university(&NewUniversity {
                country_id: Some(japan),
                founded_year: Some(1877),
                ..NewUniversity::new("University of Tokyo")
            })
            .unwrap();
        catalog
            .insert_offering(&NewOffering {
                university_id: tokyo,
                tuition_fee: Some(4_500.5),
                ..Default::default()
            })
            .unwrap();
        catalog
    }

    #[test]
    fn test_export_records_dependency_order() {
        let catalog = catalog_with_data();
        let (records, counts) = catalog.export_records().unwrap();

        let models: Vec<&str> = records.iter().map(|r| r.model.as_str()).collect();
        assert_eq!(models, vec!["countries", "universities", "university_programs"]);
        assert_eq!(counts.len(), 9);
        assert_eq!(counts[0], TableCount { table: "countries", count: 1 });
        assert_eq!(counts[1].count, 0);

        let university = &records[1];
        assert_eq!(university.pk, 1);
        assert_eq!(university.fields["name"], "University of Tokyo");
        assert_eq!(university.fields["country_id"], 1);
        assert_eq!(university.fields["website"], Value::Null);
        assert!(!university.fields.contains_key("id"));
        assert_eq!(records[2].fields["tuition_fee"], 4500.5);
    }

    #[test]
    fn test_export_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DEFAULT_EXPORT_FILE);
        let catalog = catalog_with_data();

        let summary = catalog.export_to_file(&path).unwrap();
        assert_eq!(summary.total, 3);

        let written: Vec<Value> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(written[0]["model"], "countries");
        assert_eq!(written[0]["fields"]["name"], "Japan");
    }

    #[test]
    fn test_export_empty_catalog() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.create_tables().unwrap();

        let (records, counts) = catalog.export_records().unwrap();
        assert!(records.is_empty());
        assert!(counts.iter().all(|c| c.count == 0));
    }
}
