//! Record browser: read-only views over the database.

use clap::{Args, Subcommand};
use uniguide_catalog::{Catalog, UniversityFilter, UniversitySummary};
use uniguide_core::{config::AppConfig, AppError, AppResult};
use uniguide_knowledge::build_document;

/// Browse universities in the database
#[derive(Args, Debug)]
pub struct UniversitiesCommand {
    #[command(subcommand)]
    pub action: UniversitiesAction,
}

#[derive(Subcommand, Debug)]
pub enum UniversitiesAction {
    /// List universities
    List(UniversitiesListCommand),
    /// Show one university with all related data
    Show(UniversitiesShowCommand),
}

/// List universities
#[derive(Args, Debug)]
pub struct UniversitiesListCommand {
    /// Only universities in this country
    #[arg(long)]
    pub country: Option<String>,

    /// Case-insensitive substring match on name, short name or description
    #[arg(short, long)]
    pub search: Option<String>,

    /// Maximum number of rows
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Show one university
#[derive(Args, Debug)]
pub struct UniversitiesShowCommand {
    /// University id
    pub id: i64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl UniversitiesCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let catalog = Catalog::open(&config.database_path())?;
        match &self.action {
            UniversitiesAction::List(cmd) => cmd.execute(&catalog),
            UniversitiesAction::Show(cmd) => cmd.execute(&catalog),
        }
    }
}

impl UniversitiesListCommand {
    fn execute(&self, catalog: &Catalog) -> AppResult<()> {
        tracing::info!("Executing universities list command");

        let filter = UniversityFilter {
            country: self.country.clone(),
            search: self.search.clone(),
            limit: self.limit,
        };
        let universities = catalog.list_universities(&filter)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&universities)?);
            return Ok(());
        }

        if universities.is_empty() {
            println!("No universities found");
            return Ok(());
        }

        for summary in &universities {
            println!("{}", summary_line(summary));
        }
        println!("\n{} universities", universities.len());
        Ok(())
    }
}

impl UniversitiesShowCommand {
    fn execute(&self, catalog: &Catalog) -> AppResult<()> {
        tracing::info!("Executing universities show command for id {}", self.id);

        let record = catalog
            .get_university(self.id)?
            .ok_or_else(|| AppError::Other(format!("University {} not found", self.id)))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&record)?);
        } else {
            println!("{}", build_document(&record));
        }
        Ok(())
    }
}

/// List countries with university counts
#[derive(Args, Debug)]
pub struct CountriesCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CountriesCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing countries command");

        let catalog = Catalog::open(&config.database_path())?;
        let countries = catalog.list_countries()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&countries)?);
            return Ok(());
        }

        for country in &countries {
            println!("{:<40} {:>5}", country.name, country.university_count);
        }
        Ok(())
    }
}

fn summary_line(summary: &UniversitySummary) -> String {
    let rank = summary
        .best_rank
        .map(|rank| format!("#{}", rank))
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{:>5}  {:<50} {:<20} {:>6}  {} programs",
        summary.id,
        summary.name,
        summary.country.as_deref().unwrap_or("Unknown"),
        rank,
        summary.program_count
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line() {
        let line = summary_line(&UniversitySummary {
            id: 3,
            name: "University of Tokyo".to_string(),
            short_name: None,
            country: None,
            founded_year: Some(1877),
            best_rank: None,
            program_count: 2,
        });

        assert!(line.starts_with("    3  University of Tokyo"));
        assert!(line.contains("Unknown"));
        assert!(line.ends_with("-  2 programs"));
    }
}
