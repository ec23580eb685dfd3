//! Risk tiers and advisory recommendations

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discrete risk category of a composite score.
///
/// Bounds are inclusive below: 80.0% is low risk, 79.99% is moderate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Moderate Risk")]
    Moderate,
    #[serde(rename = "High Risk")]
    High,
    #[serde(rename = "Very High Risk")]
    VeryHigh,
}

impl RiskTier {
    /// Tier of a composite score expressed as a percentage of the maximum
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            RiskTier::Low
        } else if percentage >= 60.0 {
            RiskTier::Moderate
        } else if percentage >= 40.0 {
            RiskTier::High
        } else {
            RiskTier::VeryHigh
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low Risk",
            RiskTier::Moderate => "Moderate Risk",
            RiskTier::High => "High Risk",
            RiskTier::VeryHigh => "Very High Risk",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Advisory emitted by the scoring engine, in emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    SpecialistReferral,
    SlowSpeech,
    LongPauses,
    LimitedVocabulary,
    LowCoherence,
    WithinNormalRange,
}

impl Recommendation {
    pub fn message(&self) -> &'static str {
        match self {
            Recommendation::SpecialistReferral => {
                "See a specialist physician for further evaluation"
            }
            Recommendation::SlowSpeech => {
                "Slow speech rate - motor function may need checking"
            }
            Recommendation::LongPauses => {
                "Long pauses between words - word-finding ability should be evaluated"
            }
            Recommendation::LimitedVocabulary => {
                "Limited vocabulary - cognitively stimulating activities are advised"
            }
            Recommendation::LowCoherence => {
                "Difficulty organizing ideas - executive function should be evaluated"
            }
            Recommendation::WithinNormalRange => {
                "Results within normal range - keep up cognitive activities"
            }
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
