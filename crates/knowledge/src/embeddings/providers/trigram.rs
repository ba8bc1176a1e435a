//! Trigram embedding provider for offline operation.

use crate::embeddings::provider::EmbeddingProvider;
use std::collections::{HashMap, HashSet};
use uniguide_core::AppResult;

const MODEL_NAME: &str = "trigram-v1";

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "who", "how", "about", "me", "tell", "does",
    "do",
];

/// Hashed character-trigram embeddings.
///
/// Deterministic and content-dependent: documents that share words and word
/// fragments with a question land close to it. Not a semantic model, but it
/// needs no network or model download, so it is the default and the provider
/// used by tests.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
    stop_words: HashSet<&'static str>,
}

impl TrigramProvider {
    /// Create a new trigram provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    fn tokenize<'a>(&self, lower: &'a str) -> HashMap<&'a str, usize> {
        let mut freq = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() >= 2 && !self.stop_words.contains(*w))
        {
            *freq.entry(word).or_insert(0) += 1;
        }
        freq
    }

    fn bucket(&self, text: &str, seed: u64) -> usize {
        let hash = text
            .bytes()
            .fold(seed, |acc, b| acc.wrapping_mul(seed).wrapping_add(b as u64));
        (hash % self.dimensions as u64) as usize
    }

    fn generate_embedding(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        for (word, freq) in self.tokenize(&lower) {
            // Word boundaries as padding so two-letter words still yield trigrams
            let padded: Vec<char> = std::iter::once('^')
                .chain(word.chars())
                .chain(std::iter::once('$'))
                .collect();

            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                embedding[self.bucket(&trigram, 37)] += (freq as f32).sqrt();
            }

            embedding[self.bucket(word, 31)] += freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| self.generate_embedding(text))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_embed_is_normalized() {
        let provider = TrigramProvider::new(384);
        let embedding = provider.embed("Massachusetts Institute of Technology").await.unwrap();

        assert_eq!(embedding.len(), 384);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_embed_batch() {
        let provider = TrigramProvider::new(128);
        let texts = vec![
            "Computer Science".to_string(),
            "Medicine".to_string(),
            "Law".to_string(),
        ];

        let embeddings = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 3);
        assert!(embeddings.iter().all(|e| e.len() == 128));
    }

    #[tokio::test]
    async fn test_deterministic() {
        let provider = TrigramProvider::new(384);
        let first = provider.embed("Universities in Japan").await.unwrap();
        let second = provider.embed("Universities in Japan").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_shared_words_score_higher() {
        let provider = TrigramProvider::new(384);
        let query = provider.embed("Which school is good for robotics?").await.unwrap();
        let robotics = provider
            .embed("Majors offered: Robotics, Mechanical Engineering")
            .await
            .unwrap();
        let law = provider.embed("Majors offered: Law, History").await.unwrap();

        assert!(cosine(&query, &robotics) > cosine(&query, &law));
    }

    #[tokio::test]
    async fn test_two_letter_words_are_kept() {
        let provider = TrigramProvider::new(384);
        let embedding = provider.embed("AI").await.unwrap();
        assert!(embedding.iter().any(|&x| x != 0.0));
    }

    #[tokio::test]
    async fn test_empty_text() {
        let provider = TrigramProvider::new(384);
        let embedding = provider.embed("").await.unwrap();
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_utf8_safety() {
        let provider = TrigramProvider::new(384);
        let embedding = provider
            .embed("Đại học Quốc gia Hà Nội 🎓 Khoa học máy tính")
            .await
            .unwrap();

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }
}
