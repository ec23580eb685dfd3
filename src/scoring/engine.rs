//! Rule-based scoring of acoustic and lexical features

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audio::features::AudioFeatures;
use crate::config::ScoringConfig;
use crate::scoring::risk::{Recommendation, RiskTier};
use crate::text::TextFeatures;

/// Sub-scores, composite and classification of one assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedAssessment {
    pub audio_score: f64,
    pub text_score: f64,
    pub combined_score: f64,
    pub max_score: f64,
    /// Composite as a percentage of `max_score`
    pub percentage: f64,
    pub risk_level: RiskTier,
    pub recommendations: Vec<Recommendation>,
}

/// Pure scoring functions over an immutable [`ScoringConfig`]
#[derive(Debug, Clone)]
pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Start from `max_score` and subtract every penalty that applies.
    /// Features carrying an error marker score 0.
    pub fn audio_score(&self, features: &AudioFeatures) -> f64 {
        if features.is_failed() {
            return 0.0;
        }
        let c = &self.config;
        let mut penalty = 0.0;

        let speech_rate = features.speech_rate();
        if speech_rate < c.slow_speech_rate {
            penalty += 0.20;
        } else if speech_rate > c.fast_speech_rate {
            penalty += 0.10;
        }

        let pause = features.mean_pause();
        if pause > c.long_pause {
            penalty += 0.15;
        } else if pause < c.short_pause {
            penalty += 0.10;
        }

        if features.pitch.std() < c.flat_pitch_std {
            penalty += 0.15;
        }

        if features.number_utt() < c.min_utterances {
            penalty += 0.20;
        }

        (c.max_score - c.max_score * penalty).clamp(0.0, c.max_score)
    }

    /// Overall text score (1..10) rescaled to `max_score`
    pub fn text_score(&self, features: &TextFeatures) -> f64 {
        (features.overall_score / 10.0 * self.config.max_score).clamp(0.0, self.config.max_score)
    }

    /// Combine both feature vectors; a pure function of its inputs
    pub fn combine(&self, audio: &AudioFeatures, text: &TextFeatures) -> CombinedAssessment {
        let audio_score = self.audio_score(audio);
        let text_score = self.text_score(text);
        let combined_score =
            self.config.audio_weight * audio_score + self.config.text_weight * text_score;
        let percentage = self.percentage(combined_score);
        let risk_level = RiskTier::from_percentage(percentage);
        let recommendations = self.recommendations(percentage, audio, text);

        debug!(
            "Scores: audio={:.1} text={:.1} combined={:.1} ({})",
            audio_score, text_score, combined_score, risk_level
        );

        CombinedAssessment {
            audio_score,
            text_score,
            combined_score,
            max_score: self.config.max_score,
            percentage,
            risk_level,
            recommendations,
        }
    }

    pub fn classify(&self, score: f64) -> RiskTier {
        RiskTier::from_percentage(self.percentage(score))
    }

    fn percentage(&self, score: f64) -> f64 {
        score * 100.0 / self.config.max_score
    }

    /// Advisories in fixed order; the normal-range advisory only when none
    /// other applies. Failed audio is judged on its defaulted features.
    pub fn recommendations(
        &self,
        percentage: f64,
        audio: &AudioFeatures,
        text: &TextFeatures,
    ) -> Vec<Recommendation> {
        let c = &self.config;
        let mut out = Vec::new();

        if percentage < c.referral_percentage {
            out.push(Recommendation::SpecialistReferral);
        }
        if audio.speech_rate() < c.slow_speech_rate {
            out.push(Recommendation::SlowSpeech);
        }
        if audio.mean_pause() > c.long_pause {
            out.push(Recommendation::LongPauses);
        }
        if text.vocabulary_score < c.low_vocabulary_score {
            out.push(Recommendation::LimitedVocabulary);
        }
        if text.coherence_score < c.low_coherence_score {
            out.push(Recommendation::LowCoherence);
        }

        if out.is_empty() {
            out.push(Recommendation::WithinNormalRange);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::stats::{DurationStats, SummaryStats};
    use crate::audio::PitchStats;
    use crate::config::AudioConfig;
    use crate::text::TextAnalyzer;

    fn audio(speech_rate: f64, pause_mean: f64, pitch_std: f64, number_utt: u32) -> AudioFeatures {
        let mut features = AudioFeatures::failed("test.wav", &AudioConfig::default(), "");
        features.error = None;
        features.duration_total = 60.0;
        features.segmentation.speech_rate = speech_rate;
        features.segmentation.number_utt = number_utt;
        features.segmentation.pause = DurationStats {
            mean: pause_mean,
            ..Default::default()
        };
        features.pitch = PitchStats {
            summary: SummaryStats {
                mean: 150.0,
                std: pitch_std,
                max: 200.0,
                min: 100.0,
            },
            range: 100.0,
        };
        features
    }

    fn healthy() -> AudioFeatures {
        audio(90.0, 0.6, 25.0, 12)
    }

    fn text(overall: f64) -> TextFeatures {
        TextFeatures {
            overall_score: overall,
            vocabulary_score: 8.0,
            coherence_score: 8.0,
            ..TextFeatures::empty()
        }
    }

    fn scorer() -> Scorer {
        Scorer::new(&ScoringConfig::default())
    }

    #[test]
    fn test_healthy_audio_scores_full() {
        assert_eq!(scorer().audio_score(&healthy()), 100.0);
    }

    #[test]
    fn test_penalties_stack() {
        let s = scorer();
        // slow, long pauses, flat pitch, few utterances
        assert!((s.audio_score(&audio(10.0, 3.0, 5.0, 2)) - 30.0).abs() < 1e-9);
        // fast and short pauses
        assert!((s.audio_score(&audio(200.0, 0.1, 25.0, 12)) - 80.0).abs() < 1e-9);
        assert!((s.audio_score(&audio(90.0, 0.6, 9.9, 12)) - 85.0).abs() < 1e-9);
        assert!((s.audio_score(&audio(90.0, 0.6, 25.0, 4)) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let s = scorer();
        assert_eq!(s.audio_score(&audio(30.0, 2.0, 10.0, 5)), 100.0);
        assert_eq!(s.audio_score(&audio(180.0, 0.2, 10.0, 5)), 100.0);
    }

    #[test]
    fn test_error_marker_forces_zero_audio() {
        let mut features = healthy();
        features.error = Some("decode failed".into());
        let s = scorer();
        assert_eq!(s.audio_score(&features), 0.0);

        let combined = s.combine(&features, &text(10.0));
        assert_eq!(combined.audio_score, 0.0);
        assert!((combined.combined_score - 60.0).abs() < 1e-9);
        assert_eq!(combined.risk_level, RiskTier::Moderate);
        assert_eq!(combined.recommendations, vec![Recommendation::WithinNormalRange]);
    }

    #[test]
    fn test_failed_audio_advises_on_defaulted_features() {
        let failed = AudioFeatures::failed("lost.wav", &AudioConfig::default(), "decode failed");
        assert_eq!(failed.speech_rate(), 0.0);

        let combined = scorer().combine(&failed, &text(10.0));
        assert_eq!(combined.percentage, 60.0);
        assert_eq!(combined.recommendations, vec![Recommendation::SlowSpeech]);
    }

    #[test]
    fn test_text_score_scales_overall() {
        let s = scorer();
        assert!((s.text_score(&text(6.2)) - 62.0).abs() < 1e-9);
        assert_eq!(s.text_score(&TextFeatures::empty()), 10.0);
    }

    #[test]
    fn test_composite_weights() {
        let combined = scorer().combine(&healthy(), &text(5.0));
        assert!((combined.combined_score - (0.4 * 100.0 + 0.6 * 50.0)).abs() < 1e-9);
        assert_eq!(combined.max_score, 100.0);
        assert_eq!(combined.risk_level, RiskTier::Moderate);
    }

    #[test]
    fn test_exact_boundary_is_low_risk() {
        // 0.4 * 80 + 0.6 * 80 = 80
        let combined = scorer().combine(&audio(90.0, 0.6, 25.0, 4), &text(8.0));
        assert_eq!(combined.percentage, 80.0);
        assert_eq!(combined.risk_level, RiskTier::Low);
        assert_eq!(scorer().classify(79.99), RiskTier::Moderate);
    }

    #[test]
    fn test_scores_stay_in_bounds() {
        let s = scorer();
        let cases = [
            audio(0.0, 100.0, 0.0, 0),
            audio(1000.0, 0.0, 0.0, 0),
            healthy(),
        ];
        for a in &cases {
            for overall in [1.0, 5.5, 10.0] {
                let c = s.combine(a, &text(overall));
                assert!((0.0..=100.0).contains(&c.audio_score));
                assert!((0.0..=100.0).contains(&c.combined_score));
            }
        }
    }

    #[test]
    fn test_recommendation_order() {
        let mut t = text(2.0);
        t.vocabulary_score = 3.0;
        t.coherence_score = 2.0;
        let combined = scorer().combine(&audio(10.0, 3.0, 5.0, 2), &t);
        assert_eq!(
            combined.recommendations,
            vec![
                Recommendation::SpecialistReferral,
                Recommendation::SlowSpeech,
                Recommendation::LongPauses,
                Recommendation::LimitedVocabulary,
                Recommendation::LowCoherence,
            ]
        );
    }

    #[test]
    fn test_normal_range_advisory() {
        let combined = scorer().combine(&healthy(), &text(9.0));
        assert_eq!(combined.risk_level, RiskTier::Low);
        assert_eq!(combined.recommendations, vec![Recommendation::WithinNormalRange]);
    }

    #[test]
    fn test_combine_is_idempotent() {
        let s = scorer();
        let a = audio(25.0, 2.5, 12.0, 3);
        let t = TextAnalyzer::new().analyze("the cat sat on the mat.");
        assert_eq!(s.combine(&a, &t), s.combine(&a, &t));
    }

    #[test]
    fn test_custom_max_score() {
        let config = ScoringConfig {
            max_score: 30.0,
            ..Default::default()
        };
        let combined = Scorer::new(&config).combine(&healthy(), &text(10.0));
        assert!((combined.combined_score - 30.0).abs() < 1e-9);
        assert!((combined.percentage - 100.0).abs() < 1e-9);
    }
}
