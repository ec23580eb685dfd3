//! Scoring engine: audio and text sub-scores, composite, risk tier

pub mod engine;
pub mod risk;

pub use engine::{CombinedAssessment, Scorer};
pub use risk::{Recommendation, RiskTier};
