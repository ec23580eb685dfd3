//! End-to-end assessment: load, extract, analyze, score

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::audio::{AudioFeatures, FeatureExtractor, Waveform, WaveformLoader, WaveformSource};
use crate::config::Config;
use crate::scoring::{CombinedAssessment, Scorer};
use crate::text::{ExternalEvaluation, TextAnalyzer, TextFeatures};

/// Open key-value metadata about the speaker, carried through verbatim
pub type ParticipantInfo = serde_json::Map<String, serde_json::Value>;

/// Complete outcome of one assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub participant_info: ParticipantInfo,
    pub audio_features: AudioFeatures,
    pub text_analysis: TextFeatures,
    pub combined_assessment: CombinedAssessment,
}

/// Runs the whole pipeline under one immutable [`Config`].
///
/// Holds no mutable state, so one instance can serve concurrent callers.
pub struct Assessor {
    config: Config,
    loader: WaveformLoader,
    extractor: FeatureExtractor,
    text: TextAnalyzer,
    scorer: Scorer,
}

impl Assessor {
    pub fn new(config: Config) -> Self {
        let loader = WaveformLoader::new(config.audio.sample_rate);
        Self::with_loader(config, loader)
    }

    /// Use a custom loader, e.g. with other decoders
    pub fn with_loader(config: Config, loader: WaveformLoader) -> Self {
        Self {
            extractor: FeatureExtractor::new(&config.audio, &config.segmentation),
            text: TextAnalyzer::new(),
            scorer: Scorer::new(&config.scoring),
            loader,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Assess a recording and its transcript.
    ///
    /// Never fails: an undecodable source yields defaulted audio features
    /// carrying an error marker, scored 0 on the audio side, next to the
    /// full text analysis.
    pub fn assess(
        &self,
        source: &WaveformSource,
        transcript: &str,
        participant_info: ParticipantInfo,
    ) -> AssessmentResult {
        info!("Assessing {}", source.display_name());
        let audio_features = self.extract_audio(source);
        self.finish(audio_features, transcript, participant_info)
    }

    /// Assess an already decoded waveform
    pub fn assess_waveform(
        &self,
        waveform: &Waveform,
        name: &str,
        transcript: &str,
        participant_info: ParticipantInfo,
    ) -> AssessmentResult {
        let audio_features = self.extractor.extract(waveform, name);
        self.finish(audio_features, transcript, participant_info)
    }

    /// Load and extract audio features, degrading to the error marker
    pub fn extract_audio(&self, source: &WaveformSource) -> AudioFeatures {
        let name = source.display_name();
        match self.loader.load(source) {
            Ok(waveform) => self.extractor.extract(&waveform, &name),
            Err(e) => {
                warn!("Audio unusable for {}: {}", name, e);
                AudioFeatures::failed(name, &self.config.audio, e)
            }
        }
    }

    pub fn analyze_text(&self, transcript: &str) -> TextFeatures {
        self.text.analyze(transcript)
    }

    pub fn combine(&self, audio: &AudioFeatures, text: &TextFeatures) -> CombinedAssessment {
        self.scorer.combine(audio, text)
    }

    /// Apply an external evaluation to the text side and re-run `combine`;
    /// the audio side is left untouched.
    pub fn apply_evaluation(
        &self,
        result: &AssessmentResult,
        evaluation: &ExternalEvaluation,
    ) -> AssessmentResult {
        let text_analysis = result.text_analysis.with_evaluation(evaluation);
        let combined_assessment = self.combine(&result.audio_features, &text_analysis);
        AssessmentResult {
            participant_info: result.participant_info.clone(),
            audio_features: result.audio_features.clone(),
            text_analysis,
            combined_assessment,
        }
    }

    fn finish(
        &self,
        audio_features: AudioFeatures,
        transcript: &str,
        participant_info: ParticipantInfo,
    ) -> AssessmentResult {
        let text_analysis = self.analyze_text(transcript);
        let combined_assessment = self.combine(&audio_features, &text_analysis);
        debug!(
            "Assessment of {} complete: {}",
            audio_features.filename, combined_assessment.risk_level
        );
        AssessmentResult {
            participant_info,
            audio_features,
            text_analysis,
            combined_assessment,
        }
    }
}
