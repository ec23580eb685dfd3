//! Overrides supplied by an external transcript evaluator

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AssessError;
use crate::text::analyzer::{clamp_score, TextFeatures};

/// Evaluator judgement of a transcript. Every field is optional; missing
/// fields keep the locally computed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalEvaluation {
    /// 0..10
    pub semantic_accuracy: Option<f64>,
    /// 0..10, replaces `vocabulary_score`
    pub vocabulary_richness: Option<f64>,
    /// 0..1
    pub repetition_rate: Option<f64>,
    /// 0..10
    pub reasoning_quality: Option<f64>,
    /// Replaces `detailed_analysis`
    pub notes: Option<String>,
}

impl ExternalEvaluation {
    pub fn from_json(json: &str) -> Result<Self, AssessError> {
        serde_json::from_str(json).map_err(|e| AssessError::Serialization(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, AssessError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

impl TextFeatures {
    /// Apply an evaluation and recompute `overall_score` from the language
    /// formula `(semantic + vocabulary + (10 - repetition * 10) + reasoning) / 4`,
    /// clamped to `[1, 10]`.
    pub fn with_evaluation(&self, evaluation: &ExternalEvaluation) -> TextFeatures {
        let mut features = self.clone();

        let semantic = evaluation
            .semantic_accuracy
            .or(self.semantic_accuracy)
            .unwrap_or(self.overall_score);
        let reasoning = evaluation
            .reasoning_quality
            .or(self.reasoning_quality)
            .unwrap_or(0.0);

        if let Some(vocabulary) = evaluation.vocabulary_richness {
            features.vocabulary_score = vocabulary;
        }
        if let Some(repetition) = evaluation.repetition_rate {
            features.repetition_rate = repetition;
        }
        if let Some(notes) = &evaluation.notes {
            features.detailed_analysis = notes.clone();
        }
        features.semantic_accuracy = Some(semantic);
        features.reasoning_quality = Some(reasoning);

        let language = (semantic
            + features.vocabulary_score
            + (10.0 - features.repetition_rate * 10.0)
            + reasoning)
            / 4.0;
        features.overall_score = clamp_score(language);

        debug!(
            "External evaluation applied: overall {:.2} -> {:.2}",
            self.overall_score, features.overall_score
        );
        features
    }
}
