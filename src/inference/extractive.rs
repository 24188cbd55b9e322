//! Deterministic extractive backend.
//!
//! Picks leading sentences of the chunk until the minimum word budget is met, never exceeding the
//! maximum. Useful offline, in tests, and as a fallback when no model runtime is available.

use super::{GenerationConfig, InferenceClient, InferenceError};
use async_trait::async_trait;

/// Extractive summarizer that requires no model.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractiveInferenceClient;

impl ExtractiveInferenceClient {
    /// Construct the extractive backend.
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InferenceClient for ExtractiveInferenceClient {
    fn name(&self) -> &str {
        "extractive"
    }

    async fn summarize(
        &self,
        text: &str,
        config: &GenerationConfig,
    ) -> Result<String, InferenceError> {
        let summary = extract_leading_sentences(text, config.min_length, config.max_length);
        if summary.is_empty() {
            return Err(InferenceError::GenerationFailed(
                "passage contains no words".into(),
            ));
        }
        Ok(summary)
    }
}

fn extract_leading_sentences(text: &str, min_words: usize, max_words: usize) -> String {
    let max_words = max_words.max(1);
    let mut selected: Vec<&str> = Vec::new();
    let mut used_words = 0usize;

    for sentence in split_sentences(text) {
        let words = count_words(sentence);
        if words == 0 {
            continue;
        }
        if used_words + words > max_words {
            if selected.is_empty() {
                return truncate_words(sentence, max_words);
            }
            break;
        }
        selected.push(sentence);
        used_words += words;
        if used_words >= min_words {
            break;
        }
    }

    selected.join(" ")
}

fn split_sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
}

fn truncate_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
