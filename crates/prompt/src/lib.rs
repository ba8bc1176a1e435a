//! Prompt system for UniGuide.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions
//! - A built-in answer prompt that a workspace can override
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{builtin_prompt, load_prompt, resolve_prompt, ANSWER_PROMPT_ID};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptInputSpec,
    PromptOutputSpec,
};
