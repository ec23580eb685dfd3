//! Configuration structures for the assessment pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub segmentation: SegmentationConfig,
    pub scoring: ScoringConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.audio.validate()?;
        self.segmentation.validate()?;
        self.scoring.validate()
    }
}

/// Waveform loading and frame analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Target sample rate (Hz)
    pub sample_rate: u32,
    /// Analysis window length in samples
    pub frame_length: usize,
    /// Offset between consecutive frame starts in samples
    pub hop_length: usize,
    /// Number of cepstral coefficients to summarize
    pub n_mfcc: usize,
    /// Number of mel bands feeding the cepstral transform
    pub n_mels: usize,
    /// Lower edge of the voice band (Hz)
    pub pitch_min_hz: f64,
    /// Upper edge of the voice band (Hz)
    pub pitch_max_hz: f64,
    /// Fraction of a frame's peak magnitude a pitch candidate must exceed
    pub pitch_threshold: f64,
    /// Pitch is estimated over at most this many leading frames
    pub max_pitch_frames: usize,
    /// Minimum retained pitch estimates before statistics are trusted
    pub min_pitch_estimates: usize,
    /// Flat pitch reported when the track is inconclusive (Hz)
    pub default_pitch_hz: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            frame_length: 2048,
            hop_length: 512,
            n_mfcc: 13,
            n_mels: 128,
            pitch_min_hz: 50.0,
            pitch_max_hz: 400.0,
            pitch_threshold: 0.05,
            max_pitch_frames: 1000,
            min_pitch_estimates: 6,
            default_pitch_hz: 150.0,
        }
    }
}

impl AudioConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::invalid("audio.sample_rate", self.sample_rate));
        }
        if self.frame_length < 2 {
            return Err(ConfigError::invalid("audio.frame_length", self.frame_length));
        }
        if self.hop_length == 0 {
            return Err(ConfigError::invalid("audio.hop_length", self.hop_length));
        }
        if self.n_mels == 0 || self.n_mfcc > self.n_mels {
            return Err(ConfigError::invalid("audio.n_mfcc", self.n_mfcc));
        }
        if !(self.pitch_min_hz >= 0.0 && self.pitch_min_hz < self.pitch_max_hz) {
            return Err(ConfigError::invalid(
                "audio.pitch_min_hz",
                format!("{}..{}", self.pitch_min_hz, self.pitch_max_hz),
            ));
        }
        if !(0.0..1.0).contains(&self.pitch_threshold) {
            return Err(ConfigError::invalid(
                "audio.pitch_threshold",
                self.pitch_threshold,
            ));
        }
        Ok(())
    }
}

/// Speech/pause segmentation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Percentile of sorted frame energies used as the speech threshold
    pub threshold_percentile: f64,
    /// Speech segments shorter than this are not committed (seconds)
    pub min_speech_duration: f64,
    /// Pause segments shorter than this are not committed (seconds)
    pub min_pause_duration: f64,
    /// Committed pauses must strictly exceed this to enter statistics (seconds)
    pub pause_stat_floor: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            threshold_percentile: 0.3,
            min_speech_duration: 0.1,
            min_pause_duration: 0.05,
            pause_stat_floor: 0.05,
        }
    }
}

impl SegmentationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.threshold_percentile > 0.0 && self.threshold_percentile < 1.0) {
            return Err(ConfigError::invalid(
                "segmentation.threshold_percentile",
                self.threshold_percentile,
            ));
        }
        if self.min_speech_duration < 0.0 {
            return Err(ConfigError::invalid(
                "segmentation.min_speech_duration",
                self.min_speech_duration,
            ));
        }
        if self.min_pause_duration < 0.0 {
            return Err(ConfigError::invalid(
                "segmentation.min_pause_duration",
                self.min_pause_duration,
            ));
        }
        Ok(())
    }
}

/// Scoring engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Upper bound of every score
    pub max_score: f64,
    /// Weight of the audio sub-score in the composite
    pub audio_weight: f64,
    /// Weight of the text sub-score in the composite
    pub text_weight: f64,
    /// Utterances per minute below which speech counts as slow
    pub slow_speech_rate: f64,
    /// Utterances per minute above which speech counts as fast
    pub fast_speech_rate: f64,
    /// Mean pause (seconds) above which pauses count as long
    pub long_pause: f64,
    /// Mean pause (seconds) below which pauses count as short
    pub short_pause: f64,
    /// Pitch standard deviation (Hz) below which prosody counts as flat
    pub flat_pitch_std: f64,
    /// Utterance count below which output counts as sparse
    pub min_utterances: u32,
    /// Vocabulary sub-score below which vocabulary counts as limited
    pub low_vocabulary_score: f64,
    /// Coherence sub-score below which organization counts as weak
    pub low_coherence_score: f64,
    /// Composite percentage below which a specialist referral is advised
    pub referral_percentage: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            max_score: 100.0,
            audio_weight: 0.4,
            text_weight: 0.6,
            slow_speech_rate: 30.0,
            fast_speech_rate: 180.0,
            long_pause: 2.0,
            short_pause: 0.2,
            flat_pitch_std: 10.0,
            min_utterances: 5,
            low_vocabulary_score: 5.0,
            low_coherence_score: 4.0,
            referral_percentage: 60.0,
        }
    }
}

impl ScoringConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_score > 0.0 && self.max_score.is_finite()) {
            return Err(ConfigError::invalid("scoring.max_score", self.max_score));
        }
        if self.audio_weight < 0.0 || self.text_weight < 0.0 {
            return Err(ConfigError::invalid(
                "scoring.audio_weight",
                format!("{} / {}", self.audio_weight, self.text_weight),
            ));
        }
        if ((self.audio_weight + self.text_weight) - 1.0).abs() > 1e-6 {
            return Err(ConfigError::invalid(
                "scoring.text_weight",
                format!("{} + {} != 1", self.audio_weight, self.text_weight),
            ));
        }
        // Each penalty pair applies at most one side
        if self.slow_speech_rate >= self.fast_speech_rate {
            return Err(ConfigError::invalid(
                "scoring.slow_speech_rate",
                format!("{} >= {}", self.slow_speech_rate, self.fast_speech_rate),
            ));
        }
        if self.short_pause >= self.long_pause {
            return Err(ConfigError::invalid(
                "scoring.short_pause",
                format!("{} >= {}", self.short_pause, self.long_pause),
            ));
        }
        Ok(())
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormat,
    /// Results are appended to this file when set
    pub output_path: Option<PathBuf>,
    /// Enable console output
    pub enable_console: bool,
    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Json,
            output_path: None,
            enable_console: true,
            pretty: false,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON record
    Json,
    /// Human-readable report
    Text,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "text" => Ok(OutputFormat::Text),
            other => Err(ConfigError::invalid("output.format", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.audio.sample_rate, 22050);
        assert_eq!(config.audio.frame_length, 2048);
        assert_eq!(config.audio.hop_length, 512);
        assert_eq!(config.audio.n_mfcc, 13);
        assert_eq!(config.segmentation.threshold_percentile, 0.3);
        assert_eq!(config.scoring.max_score, 100.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
            [audio]
            sample_rate = 16000
            hop_length = 256

            [scoring]
            max_score = 30.0

            [output]
            format = "text"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.hop_length, 256);
        assert_eq!(config.audio.frame_length, 2048);
        assert_eq!(config.scoring.max_score, 30.0);
        assert_eq!(config.scoring.audio_weight, 0.4);
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.audio.hop_length = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "audio.hop_length"
        ));

        let mut config = Config::default();
        config.scoring.text_weight = 0.7;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.audio.pitch_min_hz = 500.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.segmentation.threshold_percentile = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_crossed_penalty_thresholds() {
        let mut config = Config::default();
        config.scoring.slow_speech_rate = 200.0;
        config.scoring.fast_speech_rate = 100.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "scoring.slow_speech_rate"
        ));

        let mut config = Config::default();
        config.scoring.short_pause = 2.0;
        config.scoring.long_pause = 2.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "scoring.short_pause"
        ));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("srt".parse::<OutputFormat>().is_err());
    }
}
