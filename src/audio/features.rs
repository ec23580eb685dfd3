//! Assembly of the per-recording acoustic feature vector
//!
//! Every feature family is computed on its own and yields a
//! `Result<_, ExtractionError>`. Failures are logged and replaced by that
//! family's defaults, so one bad family never takes the others down.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::audio::frames::{rms_series, zero_crossing_series, FrameGrid, FrameSeries};
use crate::audio::loader::Waveform;
use crate::audio::segmenter::{SegmentationStats, Segmenter};
use crate::audio::spectral::{cepstral_features, pitch_track, CepstralFeatures, PitchTrack};
use crate::audio::stats::SummaryStats;
use crate::config::{AudioConfig, SegmentationConfig};
use crate::error::ExtractionError;

/// Pitch statistics in Hz
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PitchStats {
    #[serde(flatten)]
    pub summary: SummaryStats,
    pub range: f64,
}

impl PitchStats {
    /// Flat contour at `hz`, reported when the track is inconclusive
    pub fn flat(hz: f64) -> Self {
        Self {
            summary: SummaryStats::flat(hz),
            range: 0.0,
        }
    }

    pub fn mean(&self) -> f64 {
        self.summary.mean
    }

    pub fn std(&self) -> f64 {
        self.summary.std
    }
}

/// Acoustic descriptors of one recording, consumed by the scoring engine.
///
/// Always fully populated: when extraction fails the affected fields hold
/// their defaults, and a failure of the whole recording is flagged in
/// `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub filename: String,
    /// Recording length in seconds
    pub duration_total: f64,
    pub energy: SummaryStats,
    pub zcr: SummaryStats,
    pub pitch: PitchStats,
    pub mfcc: CepstralFeatures,
    pub segmentation: SegmentationStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AudioFeatures {
    /// Fully defaulted features carrying `error` as the failure marker
    pub fn failed(filename: impl Into<String>, config: &AudioConfig, error: impl ToString) -> Self {
        Self {
            filename: filename.into(),
            duration_total: 0.0,
            energy: SummaryStats::default(),
            zcr: SummaryStats::default(),
            pitch: PitchStats::flat(config.default_pitch_hz),
            mfcc: CepstralFeatures::zeros(config.n_mfcc),
            segmentation: SegmentationStats::default(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn speech_rate(&self) -> f64 {
        self.segmentation.speech_rate
    }

    pub fn number_utt(&self) -> u32 {
        self.segmentation.number_utt
    }

    pub fn mean_pause(&self) -> f64 {
        self.segmentation.pause.mean
    }
}

/// Runs every frame-based analysis over a waveform
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    audio: AudioConfig,
    segmenter: Segmenter,
}

impl FeatureExtractor {
    pub fn new(audio: &AudioConfig, segmentation: &SegmentationConfig) -> Self {
        Self {
            audio: audio.clone(),
            segmenter: Segmenter::new(segmentation),
        }
    }

    pub fn config(&self) -> &AudioConfig {
        &self.audio
    }

    /// Extract the full feature vector; never fails
    pub fn extract(&self, waveform: &Waveform, filename: &str) -> AudioFeatures {
        let grid = match FrameGrid::new(
            self.audio.frame_length,
            self.audio.hop_length,
            waveform.sample_rate(),
        ) {
            Ok(grid) => grid,
            Err(e) => {
                warn!("Cannot frame {}: {}", filename, e);
                return AudioFeatures::failed(filename, &self.audio, e);
            }
        };

        let duration_total = waveform.duration();
        debug!(
            "Extracting features from {} ({:.2}s, {} frames)",
            filename,
            duration_total,
            grid.frame_count(waveform.len())
        );

        let energy_series = rms_series(waveform, &grid);
        let zcr_series = zero_crossing_series(waveform, &grid);

        let energy = or_default(
            "energy",
            summarize("energy", &energy_series),
            SummaryStats::default(),
        );
        let zcr = or_default(
            "zcr",
            summarize("zcr", &zcr_series),
            SummaryStats::default(),
        );
        let pitch = or_default(
            "pitch",
            pitch_track(waveform, &grid, &self.audio).and_then(|t| self.pitch_stats(&t)),
            PitchStats::flat(self.audio.default_pitch_hz),
        );
        let mfcc = or_default(
            "cepstral",
            cepstral_features(waveform, &grid, &self.audio),
            CepstralFeatures::zeros(self.audio.n_mfcc),
        );
        let segmentation = self.segmenter.analyze(&energy_series, duration_total);

        AudioFeatures {
            filename: filename.to_string(),
            duration_total,
            energy,
            zcr,
            pitch,
            mfcc,
            segmentation,
            error: None,
        }
    }

    /// Statistics over a pitch track, trusted only with enough estimates
    pub fn pitch_stats(&self, track: &PitchTrack) -> Result<PitchStats, ExtractionError> {
        if track.len() < self.audio.min_pitch_estimates {
            return Err(ExtractionError::InsufficientPitch {
                found: track.len(),
                required: self.audio.min_pitch_estimates,
            });
        }
        let summary = SummaryStats::from_values(&track.frequencies)
            .ok_or(ExtractionError::EmptyInput { family: "pitch" })?;
        if !summary.is_finite() {
            return Err(ExtractionError::NonFinite { family: "pitch" });
        }
        Ok(PitchStats {
            summary,
            range: summary.range(),
        })
    }
}

fn summarize(family: &'static str, series: &FrameSeries) -> Result<SummaryStats, ExtractionError> {
    let stats =
        SummaryStats::from_values(&series.values).ok_or(ExtractionError::EmptyInput { family })?;
    if !stats.is_finite() {
        return Err(ExtractionError::NonFinite { family });
    }
    Ok(stats)
}

fn or_default<T>(family: &str, result: Result<T, ExtractionError>, default: T) -> T {
    result.unwrap_or_else(|e| {
        warn!("{} features unavailable, using defaults: {}", family, e);
        default
    })
}
