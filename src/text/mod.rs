//! Transcript analysis modules

pub mod analyzer;
pub mod evaluation;

pub use analyzer::{TextAnalyzer, TextFeatures};
pub use evaluation::ExternalEvaluation;
