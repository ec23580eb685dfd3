//! Lexical statistics and heuristic sub-scores of a transcript
//!
//! The sub-scores are proxies built from token counts only. They are not a
//! linguistic measurement and carry no clinical calibration.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lowest sub-score
pub const MIN_SCORE: f64 = 1.0;
/// Highest sub-score
pub const MAX_SCORE: f64 = 10.0;

const EMPTY_NOTE: &str = "No transcript content to analyze";

/// Lexical statistics and sub-scores, each score in `[1, 10]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFeatures {
    pub word_count: usize,
    pub unique_words: usize,
    pub repetition_rate: f64,
    pub sentence_count: usize,
    pub avg_words_per_sentence: f64,
    pub vocabulary_diversity: f64,
    pub detailed_analysis: String,
    pub coherence_score: f64,
    pub vocabulary_score: f64,
    pub syntax_score: f64,
    pub relevance_score: f64,
    pub fluency_score: f64,
    pub overall_score: f64,
    /// Set by an external evaluation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_accuracy: Option<f64>,
    /// Set by an external evaluation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_quality: Option<f64>,
}

impl TextFeatures {
    /// Floor result for a blank transcript: zero counts, minimum scores
    pub fn empty() -> Self {
        Self {
            word_count: 0,
            unique_words: 0,
            repetition_rate: 0.0,
            sentence_count: 0,
            avg_words_per_sentence: 0.0,
            vocabulary_diversity: 0.0,
            detailed_analysis: EMPTY_NOTE.to_string(),
            coherence_score: MIN_SCORE,
            vocabulary_score: MIN_SCORE,
            syntax_score: MIN_SCORE,
            relevance_score: MIN_SCORE,
            fluency_score: MIN_SCORE,
            overall_score: MIN_SCORE,
            semantic_accuracy: None,
            reasoning_quality: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.word_count == 0
    }
}

impl Default for TextFeatures {
    fn default() -> Self {
        Self::empty()
    }
}

/// Stateless transcript analyzer
#[derive(Debug, Clone, Copy, Default)]
pub struct TextAnalyzer;

impl TextAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, text: &str) -> TextFeatures {
        if text.trim().is_empty() {
            debug!("Empty transcript, text scores fixed at the floor");
            return TextFeatures::empty();
        }

        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();
        let unique: HashSet<&str> = words.iter().copied().collect();

        let word_count = words.len();
        let unique_words = unique.len();
        let vocabulary_diversity = unique_words as f64 / word_count as f64;
        let repetition_rate = 1.0 - vocabulary_diversity;
        let sentence_count = text
            .chars()
            .filter(|c| matches!(c, '.' | '!' | '?'))
            .count()
            .max(1);
        let avg_words_per_sentence = word_count as f64 / sentence_count as f64;

        let coherence_score = clamp_score(10.0 - repetition_rate * 5.0);
        let vocabulary_score = clamp_score(vocabulary_diversity * 10.0);
        let syntax_score = clamp_score(avg_words_per_sentence / 2.0);
        let relevance_score = clamp_score(word_count as f64 / 10.0);
        let fluency_score = clamp_score(10.0 - repetition_rate * 3.0);
        let overall_score = (coherence_score
            + vocabulary_score
            + syntax_score
            + relevance_score
            + fluency_score)
            / 5.0;

        debug!(
            "Transcript: {} words, {} sentences, overall {:.2}",
            word_count, sentence_count, overall_score
        );

        TextFeatures {
            word_count,
            unique_words,
            repetition_rate,
            sentence_count,
            avg_words_per_sentence,
            vocabulary_diversity,
            detailed_analysis: format!(
                "Basic analysis: {} words, {} unique words, repetition rate {:.2}%",
                word_count,
                unique_words,
                repetition_rate * 100.0
            ),
            coherence_score,
            vocabulary_score,
            syntax_score,
            relevance_score,
            fluency_score,
            overall_score,
            semantic_accuracy: None,
            reasoning_quality: None,
        }
    }
}

/// Clamp a sub-score into `[1, 10]`
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(MIN_SCORE, MAX_SCORE)
}
