//! End-to-end tests for the assistant pipeline.
//!
//! Everything runs in memory: a seeded catalog, the trigram embedder and
//! stub language models that record what they were asked.

mod chat_flow;

use crate::embeddings::providers::trigram::TrigramProvider;
use crate::rag::{ChatSettings, KnowledgeIndex, UniversityAssistant};
use crate::sqlite_index::SqliteVectorIndex;
use std::sync::{Arc, Mutex};
use uniguide_catalog::{Catalog, NewOffering, NewUniversity};
use uniguide_core::{AppError, AppResult};
use uniguide_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use uniguide_prompt::{builtin_prompt, ANSWER_PROMPT_ID};

pub(crate) const COLLECTION: &str = "universities";

/// Language model stub that replies with a fixed answer.
pub(crate) struct RecordingLlm {
    reply: String,
    requests: Mutex<Vec<LlmRequest>>,
}

impl RecordingLlm {
    pub(crate) fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for RecordingLlm {
    fn provider_name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(LlmResponse {
            content: self.reply.clone(),
            model: request.model.clone(),
            usage: LlmUsage::new(100, 20),
            done: true,
        })
    }
}

/// Language model stub that always fails.
pub(crate) struct FailingLlm;

#[async_trait::async_trait]
impl LlmClient for FailingLlm {
    fn provider_name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
        Err(AppError::Llm("quota exceeded".to_string()))
    }
}

/// Catalog with three well-described universities and one bare one.
pub(crate) fn seeded_catalog() -> Catalog {
    let catalog = Catalog::open_in_memory().unwrap();
    catalog.create_tables().unwrap();

    let usa = catalog.insert_country("United States").unwrap();
    let uk = catalog.insert_country("United Kingdom").unwrap();
    let qs = catalog.insert_ranking_source("QS", None).unwrap();

    let cs = catalog.insert_major("Computer Science").unwrap();
    let robotics = catalog.insert_major("Robotics").unwrap();
    let law = catalog.insert_major("Law").unwrap();
    let medicine = catalog.insert_major("Medicine").unwrap();
    let bachelor = catalog.insert_program("BSc", Some("Bachelor")).unwrap();
    let master = catalog.insert_program("MSc", Some("Master")).unwrap();
    let ielts = catalog.insert_criteria("IELTS", Some("band"), None).unwrap();
    let sat = catalog.insert_criteria("SAT", Some("points"), None).unwrap();

    let mit = catalog
        .insert_university(&NewUniversity {
            short_name: Some("MIT".to_string()),
            country_id: Some(usa),
            founded_year: Some(1861),
            website: Some("https://mit.edu".to_string()),
            description: Some("Private research university known for engineering".to_string()),
            ..NewUniversity::new("Massachusetts Institute of Technology")
        })
        .unwrap();
    let oxford = catalog
        .insert_university(&NewUniversity {
            country_id: Some(uk),
            founded_year: Some(1096),
            ..NewUniversity::new("University of Oxford")
        })
        .unwrap();
    let harvard = catalog
        .insert_university(&NewUniversity {
            country_id: Some(usa),
            ..NewUniversity::new("Harvard University")
        })
        .unwrap();
    catalog
        .insert_university(&NewUniversity::new("Atlantis Institute"))
        .unwrap();

    catalog.insert_ranking(mit, Some(qs), Some(2023), Some(2)).unwrap();
    catalog.insert_ranking(mit, Some(qs), Some(2024), Some(1)).unwrap();
    catalog.insert_ranking(oxford, Some(qs), Some(2024), Some(3)).unwrap();

    for (university_id, program_id, major_id, fee) in [
        (mit, bachelor, cs, 50_000.0),
        (mit, master, robotics, 60_000.0),
        (oxford, bachelor, law, 40_000.0),
        (harvard, master, medicine, 70_000.0),
    ] {
        catalog
            .insert_offering(&NewOffering {
                university_id,
                program_id: Some(program_id),
                major_id: Some(major_id),
                tuition_fee: Some(fee),
                duration: None,
            })
            .unwrap();
    }

    catalog.insert_requirement(mit, Some(ielts), None, Some("7.0")).unwrap();
    catalog.insert_requirement(mit, Some(sat), None, Some("1500")).unwrap();
    catalog.insert_requirement(oxford, Some(ielts), None, Some("7.5")).unwrap();

    catalog
}

pub(crate) fn knowledge(catalog: Catalog) -> KnowledgeIndex {
    let index = SqliteVectorIndex::open_in_memory(Arc::new(TrigramProvider::new(384))).unwrap();
    KnowledgeIndex::new(Arc::new(catalog), Arc::new(index), COLLECTION, 100)
}

pub(crate) fn assistant(llm: Arc<dyn LlmClient>) -> UniversityAssistant {
    assistant_with(seeded_catalog(), llm)
}

pub(crate) fn assistant_with(catalog: Catalog, llm: Arc<dyn LlmClient>) -> UniversityAssistant {
    let prompt = builtin_prompt(ANSWER_PROMPT_ID).unwrap();
    let settings = ChatSettings {
        model: "test-model".to_string(),
        answer_language: "English".to_string(),
        top_k: 5,
    };
    UniversityAssistant::new(knowledge(catalog), llm, prompt, settings)
}
