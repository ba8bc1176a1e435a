//! Chat turns through retrieval, context building and generation.

use super::*;
use crate::rag::{ChatOutcome, FailureKind};

#[tokio::test]
async fn test_answer_uses_every_retrieved_university() {
    let llm = RecordingLlm::new("MIT leads in robotics.");
    let assistant = assistant(llm.clone());
    assert!(assistant.rebuild().await);

    let outcome = assistant.chat("Which universities teach robotics?").await;

    let ChatOutcome::Answered { answer, sources } = &outcome else {
        panic!("expected an answer, got {:?}", outcome);
    };
    assert_eq!(answer, "MIT leads in robotics.");
    assert_eq!(sources.len(), 4);

    let requests = llm.requests();
    assert_eq!(requests.len(), 1);
    let prompt = &requests[0].prompt;
    for name in sources {
        assert!(prompt.contains(&format!("UNIVERSITY: {}", name)));
    }
    assert!(prompt.contains("Which universities teach robotics?"));
    assert!(prompt.contains("Answer in English"));
    assert_eq!(requests[0].model, "test-model");
}

#[tokio::test]
async fn test_sources_follow_storage_order() {
    let llm = RecordingLlm::new("ok");
    let assistant = assistant(llm);
    assert!(assistant.rebuild().await);

    let outcome = assistant.chat("Robotics at MIT").await;
    assert_eq!(
        outcome.sources(),
        [
            "Massachusetts Institute of Technology".to_string(),
            "University of Oxford".to_string(),
            "Harvard University".to_string(),
            "Atlantis Institute".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_rendered_answer_has_sources_footer() {
    let assistant = assistant(RecordingLlm::new("Here you go."));
    assert!(assistant.rebuild().await);

    let text = assistant.answer("Universities in the United States").await;
    assert!(text.starts_with("Here you go.\n\nSources: "));
    assert!(text.ends_with(" and 1 more"));
}

#[tokio::test]
async fn test_context_contains_current_facts() {
    let llm = RecordingLlm::new("ok");
    let assistant = assistant(llm.clone());
    assert!(assistant.rebuild().await);

    assistant.chat("Tell me about MIT").await;

    let prompt = &llm.requests()[0].prompt;
    assert!(prompt.contains("World ranking: #1 (QS)"));
    assert!(prompt.contains("Computer Science (Bachelor): $50,000/year"));
    assert!(prompt.contains("Robotics (Master): $60,000/year"));
    assert!(prompt.contains("IELTS: 7.0"));
    assert!(prompt.contains("SAT: 1500"));
}

#[tokio::test]
async fn test_blank_question_never_calls_model() {
    let llm = RecordingLlm::new("unused");
    let assistant = assistant(llm.clone());
    assert!(assistant.rebuild().await);

    assert_eq!(assistant.chat("   ").await, ChatOutcome::NoRelevantData);
    assert!(llm.requests().is_empty());
}

#[tokio::test]
async fn test_empty_index_never_calls_model() {
    let llm = RecordingLlm::new("unused");
    let catalog = Catalog::open_in_memory().unwrap();
    catalog.create_tables().unwrap();
    let assistant = assistant_with(catalog, llm.clone());
    assert!(assistant.rebuild().await);

    let outcome = assistant.chat("Which universities are good for Law?").await;
    assert_eq!(outcome, ChatOutcome::NoRelevantData);
    assert!(outcome.render().contains("Suggestions:"));
    assert!(llm.requests().is_empty());
}

#[tokio::test]
async fn test_model_failure_becomes_apology() {
    let assistant = assistant(Arc::new(FailingLlm));
    assert!(assistant.rebuild().await);

    let outcome = assistant.chat("Compare MIT and Stanford").await;
    match &outcome {
        ChatOutcome::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::Generation);
            assert!(failure.message.contains("quota exceeded"));
        }
        other => panic!("expected a failure, got {:?}", other),
    }

    let text = outcome.render();
    assert!(text.starts_with("Sorry, an error occurred while processing your question."));
    assert!(text.contains("quota exceeded"));
}

#[tokio::test]
async fn test_missing_index_is_retrieval_failure() {
    let llm = RecordingLlm::new("unused");
    let assistant = assistant(llm.clone());

    let outcome = assistant.chat("Top universities in the USA").await;
    match outcome {
        ChatOutcome::Failed(failure) => assert_eq!(failure.kind, FailureKind::Retrieval),
        other => panic!("expected a failure, got {:?}", other),
    }
    assert!(llm.requests().is_empty());
}

#[tokio::test]
async fn test_index_from_other_embedder_is_retrieval_failure() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("vectors.sqlite");
    let catalog = Arc::new(seeded_catalog());

    let small = SqliteVectorIndex::open(&path, Arc::new(TrigramProvider::new(64))).unwrap();
    let kb = KnowledgeIndex::new(catalog.clone(), Arc::new(small), COLLECTION, 100);
    assert!(kb.rebuild().await);

    let llm = RecordingLlm::new("MIT leads in robotics.");
    let large = SqliteVectorIndex::open(&path, Arc::new(TrigramProvider::new(128))).unwrap();
    let assistant = UniversityAssistant::new(
        KnowledgeIndex::new(catalog, Arc::new(large), COLLECTION, 100),
        llm.clone(),
        builtin_prompt(ANSWER_PROMPT_ID).unwrap(),
        ChatSettings {
            model: "test-model".to_string(),
            answer_language: "English".to_string(),
            top_k: 5,
        },
    );

    match assistant.chat("Which universities teach robotics?").await {
        ChatOutcome::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::Retrieval);
            assert!(failure.message.contains("rebuild"));
        }
        other => panic!("expected a failure, got {:?}", other),
    }
    assert!(llm.requests().is_empty());

    assert!(assistant.rebuild().await);
    assert!(assistant
        .chat("Which universities teach robotics?")
        .await
        .is_answered());
}

#[tokio::test]
async fn test_suggestions() {
    let assistant = assistant(RecordingLlm::new("ok"));
    let suggestions = assistant.get_suggestions();

    assert_eq!(suggestions.len(), 6);
    assert!(suggestions.contains(&"Compare MIT and Stanford".to_string()));
}
