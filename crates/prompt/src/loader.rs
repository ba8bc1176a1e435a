//! Prompt loader for YAML prompt definitions.
//!
//! Definitions live in `.uniguide/prompts/<id>.yml`. The answer prompt ships
//! built in, so a workspace without a prompts directory still works.

use crate::types::PromptDefinition;
use std::path::Path;
use uniguide_core::{AppError, AppResult};

/// Identifier of the prompt used to answer chat questions.
pub const ANSWER_PROMPT_ID: &str = "rag.answer";

const PROMPTS_DIR: &str = ".uniguide/prompts";

const BUILTIN_ANSWER_PROMPT: &str = r#"
id: rag.answer
title: University advisor answer
apiVersion: "1.0"
createdBy: uniguide
behavior:
  tone: professional
  style: structured
input:
  required: [context, question, language]
template: |
  You are a knowledgeable education advisor who specializes in universities around the world.

  RELEVANT UNIVERSITY DATA:
  {{context}}

  USER QUESTION:
  {{question}}

  ANSWER REQUIREMENTS:
  1. Answer in {{language}}, clearly and in plain words
  2. ONLY use information from the data above and never invent facts
  3. If information is missing, say so explicitly ("No data available about ...")
  4. Structure the answer so it is easy to read (use bullet points when helpful)
  5. If the user asks for a comparison, compare the criteria in detail
  6. Suggest the official website when the user needs more detail

  Answer professionally and helpfully!
output:
  format: markdown
"#;

/// Load a prompt definition by ID from the workspace.
///
/// This function looks for a prompt file named `<id>.yml` in the
/// `.uniguide/prompts/` directory.
///
/// # Example
/// ```no_run
/// use uniguide_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "rag.answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = workspace_path
        .join(PROMPTS_DIR)
        .join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition = parse_definition(&contents, &prompt_file.display().to_string())?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Return the built-in definition for an ID, if one ships with the binary.
pub fn builtin_prompt(prompt_id: &str) -> Option<PromptDefinition> {
    let source = match prompt_id {
        ANSWER_PROMPT_ID => BUILTIN_ANSWER_PROMPT,
        _ => return None,
    };

    match parse_definition(source, "built-in") {
        Ok(definition) => Some(definition),
        Err(e) => {
            tracing::error!("Built-in prompt {} is invalid: {}", prompt_id, e);
            None
        }
    }
}

/// Resolve a prompt: workspace override first, then the built-in default.
///
/// A workspace file that exists but fails to parse is an error rather than a
/// silent fallback.
pub fn resolve_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let override_file = workspace_path
        .join(PROMPTS_DIR)
        .join(format!("{}.yml", prompt_id));

    if override_file.exists() {
        return load_prompt(workspace_path, prompt_id);
    }

    builtin_prompt(prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))
}

fn parse_definition(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e))
    })?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    // Simple "x.y" check
    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    if let Some(missing) = def
        .input
        .required
        .iter()
        .find(|var| !def.template.contains(var.as_str()))
    {
        return Err(AppError::Prompt(format!(
            "Prompt {} requires '{}' but its template never uses it",
            def.id, missing
        )));
    }

    Ok(())
}
