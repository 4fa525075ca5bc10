//! Topic and keyword extraction.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Document;

/// Topics and keywords assigned to a completed document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub topics: Vec<String>,
    pub keywords: Vec<String>,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Extraction failed for '{document}': {message}")]
pub struct ExtractionError {
    pub document: String,
    pub message: String,
}

/// Pluggable extraction step run when a document reaches 100%.
pub trait TopicExtractor: Send + Sync {
    /// `content` is empty when the raw bytes are no longer available
    /// (e.g. after a restore).
    fn extract(&self, document: &Document, content: &[u8]) -> Result<Extraction, ExtractionError>;
}

const STOPWORDS: &[&str] = &[
    "about", "after", "also", "because", "been", "before", "being", "between", "could",
    "does", "each", "from", "have", "here", "into", "just", "more", "most", "only", "other",
    "over", "same", "should", "some", "such", "than", "that", "their", "them", "then",
    "there", "these", "they", "this", "those", "through", "very", "were", "what", "when",
    "where", "which", "while", "will", "with", "would", "your",
];

const FALLBACK_TOPICS: [&str; 2] = ["Personal Knowledge", "Learning"];
const FALLBACK_KEYWORDS: [&str; 3] = ["insight", "reflection", "growth"];

/// Frequency-based extractor over the file name and any text content.
///
/// Falls back to fixed topics when nothing usable is found.
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    pub max_topics: usize,
    pub max_keywords: usize,
    /// Shortest word counted as a keyword.
    pub min_word_len: usize,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self {
            max_topics: 3,
            max_keywords: 8,
            min_word_len: 4,
        }
    }
}

impl KeywordExtractor {
    fn ranked_words(&self, text: &str) -> Vec<String> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() >= self.min_word_len)
            .map(str::to_lowercase)
            .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
            .filter(|w| !STOPWORDS.contains(&w.as_str()))
        {
            *counts.entry(word).or_default() += 1;
        }

        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.into_iter().map(|(word, _)| word).collect()
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl TopicExtractor for KeywordExtractor {
    fn extract(&self, document: &Document, content: &[u8]) -> Result<Extraction, ExtractionError> {
        let stem = document
            .name
            .rsplit_once('.')
            .map_or(document.name.as_str(), |(stem, _)| stem);

        let mut text = stem.replace(['_', '-'], " ");
        if document.kind.is_text() && !content.is_empty() {
            // Invalid sequences become U+FFFD and split words like punctuation.
            text.push(' ');
            text.push_str(&String::from_utf8_lossy(content));
        }

        let ranked = self.ranked_words(&text);
        if ranked.is_empty() {
            return Ok(Extraction {
                topics: FALLBACK_TOPICS.iter().map(|s| s.to_string()).collect(),
                keywords: FALLBACK_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            });
        }

        Ok(Extraction {
            topics: ranked.iter().take(self.max_topics).map(|w| title_case(w)).collect(),
            keywords: ranked.into_iter().take(self.max_keywords).collect(),
        })
    }
}
