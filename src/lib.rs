//! Speech Cognitive Assessment
//!
//! Heuristic cognitive-risk indicator computed from a short speech
//! recording and its transcript. Not a diagnostic tool: every threshold is
//! a fixed heuristic constant without clinical calibration.
//!
//! # Architecture
//!
//! Data flows strictly forward through the following modules:
//!
//! - `audio`: waveform loading, frame analysis (energy, zero crossings,
//!   pitch, cepstrum), speech/pause segmentation, feature assembly
//! - `text`: lexical statistics and sub-scores of the transcript
//! - `scoring`: audio and text sub-scores, composite score, risk tier
//! - `assessment`: the end-to-end pipeline
//! - `output`: JSON and text report writing
//! - `config`: Configuration structures
//! - `error`: Error types
//!
//! # Example
//!
//! ```no_run
//! use speech_assess::{Assessor, Config, ParticipantInfo, WaveformSource};
//!
//! let assessor = Assessor::new(Config::default());
//!
//! let mut participant = ParticipantInfo::new();
//! participant.insert("age".into(), 72.into());
//!
//! let result = assessor.assess(
//!     &WaveformSource::from_path("recording.wav"),
//!     "the cat sat on the mat.",
//!     participant,
//! );
//! println!("{}", result.combined_assessment.risk_level);
//! ```

pub mod assessment;
pub mod audio;
pub mod config;
pub mod error;
pub mod output;
pub mod scoring;
pub mod text;

// Re-exports for convenience
pub use assessment::{AssessmentResult, Assessor, ParticipantInfo};
pub use audio::{AudioFeatures, FeatureExtractor, Waveform, WaveformLoader, WaveformSource};
pub use config::{AudioConfig, Config, OutputConfig, ScoringConfig, SegmentationConfig};
pub use error::{AssessError, ConfigError, ExtractionError, LoadError, Result};
pub use output::OutputWriter;
pub use scoring::{CombinedAssessment, Recommendation, RiskTier, Scorer};
pub use text::{ExternalEvaluation, TextAnalyzer, TextFeatures};
