//! Retrieval-augmented answering over the university catalog.

pub mod assistant;
pub mod context;
pub mod knowledge;
pub mod outcome;

pub use assistant::{suggestions, ChatSettings, UniversityAssistant, DEFAULT_TOP_K};
pub use context::build_context;
pub use knowledge::{IndexStats, KnowledgeIndex};
pub use outcome::{ChatFailure, ChatOutcome, FailureKind, NO_DATA_MESSAGE, SUGGESTED_QUESTIONS};
