//! Audio processing modules

pub mod features;
pub mod frames;
pub mod loader;
pub mod segmenter;
pub mod spectral;
pub mod stats;

pub use features::{AudioFeatures, FeatureExtractor, PitchStats};
pub use frames::{FrameGrid, FrameSeries};
pub use loader::{Decoder, Waveform, WaveformLoader, WaveformSource};
pub use segmenter::{Segment, Segmentation, SegmentationStats, Segmenter};
pub use spectral::{CepstralFeatures, PitchTrack};
pub use stats::{DurationStats, SummaryStats};
