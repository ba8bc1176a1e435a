//! Retrieval-augmented chat over the university catalog.
//!
//! One turn: search the vector index, reload the hits from the relational
//! store, render them as context, and ask the language model to answer.

use crate::rag::context::build_context;
use crate::rag::knowledge::{IndexStats, KnowledgeIndex};
use crate::rag::outcome::{ChatFailure, ChatOutcome, FailureKind, SUGGESTED_QUESTIONS};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use uniguide_core::{AppConfig, AppResult};
use uniguide_llm::{create_client, ClientOptions, LlmClient, LlmRequest};
use uniguide_prompt::{build_prompt, resolve_prompt, PromptDefinition, ANSWER_PROMPT_ID};

/// Documents retrieved per question.
pub const DEFAULT_TOP_K: usize = 5;

/// Per-turn generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub model: String,
    pub answer_language: String,
    pub top_k: usize,
}

impl ChatSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            answer_language: config.answer_language.clone(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// The chat assistant.
///
/// Holds every long-lived handle a turn needs; nothing is reopened per
/// question.
pub struct UniversityAssistant {
    knowledge: KnowledgeIndex,
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    settings: ChatSettings,
}

impl UniversityAssistant {
    pub fn new(
        knowledge: KnowledgeIndex,
        llm: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        settings: ChatSettings,
    ) -> Self {
        Self {
            knowledge,
            llm,
            prompt,
            settings,
        }
    }

    /// Build the assistant from configuration.
    ///
    /// Opens the stores and creates the model client; does not build the
    /// index (see [`UniversityAssistant::ensure_index`]).
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let knowledge = KnowledgeIndex::from_config(config)?;
        let llm = create_client(
            &config.provider,
            &ClientOptions {
                endpoint: config.llm_endpoint.clone(),
                api_key: config.resolve_api_key(),
                timeout_secs: config.request_timeout_secs,
            },
        )?;
        let prompt = resolve_prompt(&config.workspace, ANSWER_PROMPT_ID)?;

        info!(
            "Assistant ready (provider: {}, model: {}, collection: {})",
            llm.provider_name(),
            config.model,
            knowledge.collection()
        );

        Ok(Self::new(knowledge, llm, prompt, ChatSettings::from_config(config)))
    }

    pub fn knowledge(&self) -> &KnowledgeIndex {
        &self.knowledge
    }

    /// Answer a question as display text.
    pub async fn answer(&self, question: &str) -> String {
        self.chat(question).await.render()
    }

    /// Run one chat turn.
    #[instrument(skip(self), fields(model = %self.settings.model))]
    pub async fn chat(&self, question: &str) -> ChatOutcome {
        let question = question.trim();
        if question.is_empty() {
            debug!("Blank question, nothing to retrieve");
            return ChatOutcome::NoRelevantData;
        }

        match self.try_chat(question).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                error!("Chat failed during {}: {}", failure.kind, failure.message);
                ChatOutcome::Failed(failure)
            }
        }
    }

    async fn try_chat(&self, question: &str) -> Result<ChatOutcome, ChatFailure> {
        let hits = self
            .knowledge
            .search(question, self.settings.top_k)
            .await
            .map_err(|e| ChatFailure::new(FailureKind::Retrieval, e))?;

        if hits.is_empty() {
            info!("No documents matched the question");
            return Ok(ChatOutcome::NoRelevantData);
        }

        let ids: Vec<i64> = hits.iter().map(|hit| hit.metadata.university_id).collect();
        debug!("Retrieved universities {:?}", ids);

        // Universities deleted since the last rebuild simply drop out here
        let records = self
            .knowledge
            .catalog()
            .load_universities(Some(&ids))
            .map_err(|e| ChatFailure::new(FailureKind::Catalog, e))?;

        if records.is_empty() {
            info!("Retrieved documents no longer exist in the database");
            return Ok(ChatOutcome::NoRelevantData);
        }

        let sources: Vec<String> = records
            .iter()
            .map(|record| record.university.name.clone())
            .collect();

        let mut variables = HashMap::new();
        variables.insert("context".to_string(), build_context(&records));
        variables.insert("question".to_string(), question.to_string());
        variables.insert(
            "language".to_string(),
            self.settings.answer_language.clone(),
        );

        let prompt = build_prompt(&self.prompt, &variables)
            .map_err(|e| ChatFailure::new(FailureKind::Prompt, e))?;

        let mut request = LlmRequest::new(prompt.user, &self.settings.model);
        if let Some(system) = prompt.system {
            request = request.with_system(system);
        }
        if let Some(temperature) = prompt.metadata.temperature {
            request = request.with_temperature(temperature);
        }

        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| ChatFailure::new(FailureKind::Generation, e))?;

        info!(
            "Answered from {} universities ({} tokens)",
            sources.len(),
            response.usage.total_tokens
        );

        Ok(ChatOutcome::Answered {
            answer: response.content,
            sources,
        })
    }

    /// Rebuild the vector index from the relational store.
    pub async fn rebuild(&self) -> bool {
        self.knowledge.rebuild().await
    }

    /// Build the vector index if it is missing.
    pub async fn ensure_index(&self) -> AppResult<bool> {
        self.knowledge.ensure_index().await
    }

    pub async fn get_stats(&self) -> Option<IndexStats> {
        self.knowledge.get_stats().await
    }

    pub fn get_suggestions(&self) -> Vec<String> {
        suggestions()
    }
}

/// Example questions for new users.
pub fn suggestions() -> Vec<String> {
    SUGGESTED_QUESTIONS.iter().map(|q| q.to_string()).collect()
}
