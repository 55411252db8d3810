//! Relevance scoring seam.
//!
//! The core only depends on the [`RelevanceScorer`] contract. The bundled
//! [`TermFrequencyScorer`] measures keyword coverage: the share of the topic's
//! keywords that appear in the content, lightly rewarded for repetition.

use crate::text::tokenize;
use std::collections::{BTreeMap, BTreeSet};

pub trait RelevanceScorer: Send + Sync {
    /// Relevance of `content` to `topic`, in [0, 1]
    fn score(&self, content: &str, topic: &str) -> f64;

    /// Content-bearing keywords of `text`
    fn keywords(&self, text: &str) -> BTreeSet<String>;
}

const STOPWORDS: &[&str] = &[
    // English
    "the", "and", "for", "are", "was", "were", "with", "that", "this", "from", "into", "has",
    "had", "have", "can", "will", "not", "but", "its", "it's", "their", "they", "them", "than",
    "then", "there", "which", "what", "who", "whom", "when", "where", "how", "why", "also",
    "such", "been", "being", "about", "over", "more", "most", "other", "some", "any", "all",
    "one", "two", "use", "used", "using", "may", "might", "would", "could", "should", "you",
    "your", "our", "his", "her", "she", "him", "these", "those", "each", "very", "only", "just",
    "like", "does", "did", "is", "of", "to", "in", "on", "at", "by", "an", "as", "or", "be",
    // Turkish
    "bir", "ve", "ile", "için", "bu", "şu", "da", "de", "ki", "mi", "mı", "olan", "olarak",
    "gibi", "daha", "çok", "en", "ne", "nedir", "kimdir", "veya", "ise", "her",
];

/// Keywords shorter than this are ignored, except language-like tokens
/// containing `+` or `#`
const MIN_KEYWORD_CHARS: usize = 2;

/// Share of the score given to keyword coverage; the rest rewards density
const COVERAGE_WEIGHT: f64 = 0.85;

/// Mentions per keyword at which the density bonus saturates
const DENSITY_SATURATION: f64 = 3.0;

/// Term-frequency keyword scorer
#[derive(Debug, Clone, Default)]
pub struct TermFrequencyScorer;

impl TermFrequencyScorer {
    pub fn new() -> Self {
        Self
    }

    fn is_keyword(token: &str) -> bool {
        (token.chars().count() >= MIN_KEYWORD_CHARS || token.contains(['+', '#']))
            && !STOPWORDS.contains(&token)
    }

    fn term_frequencies(text: &str) -> BTreeMap<String, usize> {
        let mut tf = BTreeMap::new();
        for token in tokenize(text).into_iter().filter(|t| Self::is_keyword(t)) {
            *tf.entry(token).or_insert(0) += 1;
        }
        tf
    }
}

impl RelevanceScorer for TermFrequencyScorer {
    fn score(&self, content: &str, topic: &str) -> f64 {
        let topic_terms = self.keywords(topic);
        if topic_terms.is_empty() {
            return 0.0;
        }
        let tf = Self::term_frequencies(content);

        let hits: Vec<usize> = topic_terms
            .iter()
            .filter_map(|t| tf.get(t).copied())
            .collect();
        if hits.is_empty() {
            return 0.0;
        }

        let coverage = hits.len() as f64 / topic_terms.len() as f64;
        let density = hits
            .iter()
            .map(|n| (*n as f64 / DENSITY_SATURATION).min(1.0))
            .sum::<f64>()
            / topic_terms.len() as f64;

        (coverage * COVERAGE_WEIGHT + density * (1.0 - COVERAGE_WEIGHT)).clamp(0.0, 1.0)
    }

    fn keywords(&self, text: &str) -> BTreeSet<String> {
        tokenize(text)
            .into_iter()
            .filter(|t| Self::is_keyword(t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_drop_stopwords() {
        let scorer = TermFrequencyScorer::new();
        let kw = scorer.keywords("What is the Rust borrow checker?");
        assert!(kw.contains("rust"));
        assert!(kw.contains("borrow"));
        assert!(!kw.contains("the"));
        assert!(!kw.contains("what"));
    }

    #[test]
    fn test_score_bounds() {
        let scorer = TermFrequencyScorer::new();
        assert_eq!(scorer.score("Completely unrelated text", "rust ownership"), 0.0);
        assert_eq!(scorer.score("anything", ""), 0.0);
        let full = scorer.score("Rust ownership rules. Rust ownership moves. Rust ownership.", "rust ownership");
        assert!((full - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_coverage_scores_lower() {
        let scorer = TermFrequencyScorer::new();
        let partial = scorer.score("Rust is a language", "rust ownership");
        let full = scorer.score("Rust ownership is strict", "rust ownership");
        assert!(partial > 0.0);
        assert!(partial < full);
    }
}
