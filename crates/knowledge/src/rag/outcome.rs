//! Chat outcome types.
//!
//! A chat turn always ends in one of three outcomes. Failures are values,
//! not errors: the caller renders them as a user-facing apology.

use serde::Serialize;
use std::fmt;

/// Shown when retrieval finds nothing usable.
pub const NO_DATA_MESSAGE: &str = "Sorry, I could not find relevant information in the database.\n\n\
Suggestions:\n\
- Ask about a specific university (e.g. \"Information about MIT\")\n\
- Ask about a field of study (e.g. \"Which universities are good for Computer Science?\")\n\
- Ask about a country (e.g. \"Universities in the USA\")";

/// Example questions offered to new users.
pub const SUGGESTED_QUESTIONS: [&str; 6] = [
    "Which universities are good for Computer Science?",
    "Compare MIT and Stanford",
    "Top-ranked universities in the USA",
    "Average tuition of the top 10 universities",
    "Which universities offer AI/Machine Learning programs?",
    "Admission requirements for Harvard",
];

/// Number of source names listed before collapsing into "and N more".
const MAX_LISTED_SOURCES: usize = 3;

/// Pipeline stage where a chat turn failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Retrieval,
    Catalog,
    Prompt,
    Generation,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Retrieval => "retrieval",
            Self::Catalog => "catalog",
            Self::Prompt => "prompt",
            Self::Generation => "generation",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ChatFailure {
    pub fn new(kind: FailureKind, error: impl fmt::Display) -> Self {
        Self {
            kind,
            message: error.to_string(),
        }
    }
}

/// Result of one chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChatOutcome {
    /// The model answered using these universities, listed in ascending id
    /// order as loaded from the database.
    Answered { answer: String, sources: Vec<String> },
    NoRelevantData,
    Failed(ChatFailure),
}

impl ChatOutcome {
    /// Text shown to the user.
    pub fn render(&self) -> String {
        match self {
            Self::Answered { answer, sources } => {
                format!("{}{}", answer, sources_footer(sources))
            }
            Self::NoRelevantData => NO_DATA_MESSAGE.to_string(),
            Self::Failed(failure) => apology(&failure.message),
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered { .. })
    }

    pub fn sources(&self) -> &[String] {
        match self {
            Self::Answered { sources, .. } => sources,
            _ => &[],
        }
    }
}

/// Footer listing the universities an answer drew on.
pub fn sources_footer(sources: &[String]) -> String {
    if sources.is_empty() {
        return String::new();
    }

    let listed = sources
        .iter()
        .take(MAX_LISTED_SOURCES)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let mut footer = format!("\n\nSources: {}", listed);
    if sources.len() > MAX_LISTED_SOURCES {
        footer.push_str(&format!(" and {} more", sources.len() - MAX_LISTED_SOURCES));
    }
    footer
}

fn apology(details: &str) -> String {
    format!(
        "Sorry, an error occurred while processing your question.\n\n\
         Error details: {}\n\n\
         Please try again or contact the administrator if the problem persists.",
        details
    )
}
