//! Spectral features: STFT, spectral-peak pitch tracking, mel cepstrum

use std::f64::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audio::frames::FrameGrid;
use crate::audio::loader::Waveform;
use crate::audio::stats::mean_std;
use crate::config::AudioConfig;
use crate::error::ExtractionError;

/// Log-power floor before the decibel conversion
const POWER_FLOOR: f64 = 1e-10;
/// Dynamic range kept below the loudest mel band (dB)
const TOP_DB: f64 = 80.0;

/// Short-time Fourier transform over a [`FrameGrid`], one frame at a time
pub struct Stft {
    grid: FrameGrid,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    frame: Vec<f32>,
    buffer: Vec<Complex<f32>>,
}

impl Stft {
    pub fn new(grid: FrameGrid) -> Self {
        let n_fft = grid.frame_length;
        let fft = FftPlanner::new().plan_fft_forward(n_fft);
        Self {
            grid,
            fft,
            window: hann_window(n_fft),
            frame: vec![0.0; n_fft],
            buffer: vec![Complex::new(0.0, 0.0); n_fft],
        }
    }

    /// Number of non-negative frequency bins
    pub fn bins(&self) -> usize {
        self.grid.frame_length / 2 + 1
    }

    /// Frequency of bin `bin` in Hz
    pub fn bin_frequency(&self, bin: f64) -> f64 {
        bin * self.grid.sample_rate as f64 / self.grid.frame_length as f64
    }

    /// Magnitude spectrum of frame `index` written into `out`
    pub fn magnitudes(&mut self, samples: &[f32], index: usize, out: &mut Vec<f32>) {
        self.grid.fill_frame(samples, index, &mut self.frame);
        for ((cell, &sample), &w) in self.buffer.iter_mut().zip(&self.frame).zip(&self.window) {
            let sample = if sample.is_finite() { sample } else { 0.0 };
            *cell = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.buffer);
        out.clear();
        out.extend(self.buffer[..self.bins()].iter().map(|c| c.norm()));
    }
}

/// Periodic Hann window
fn hann_window(length: usize) -> Vec<f32> {
    (0..length)
        .map(|n| (0.5 - 0.5 * (2.0 * PI * n as f64 / length as f64).cos()) as f32)
        .collect()
}

/// Confident fundamental-frequency estimates; inconclusive frames are dropped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PitchTrack {
    pub frequencies: Vec<f64>,
    pub times: Vec<f64>,
}

impl PitchTrack {
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

/// Spectral-peak pitch track over at most `max_pitch_frames` leading frames
pub fn pitch_track(
    waveform: &Waveform,
    grid: &FrameGrid,
    config: &AudioConfig,
) -> Result<PitchTrack, ExtractionError> {
    if waveform.is_empty() {
        return Err(ExtractionError::EmptyInput { family: "pitch" });
    }
    if grid.frame_length < 3 {
        return Err(ExtractionError::InvalidParameters(format!(
            "frame_length {} too short for peak picking",
            grid.frame_length
        )));
    }

    let frames = grid
        .frame_count(waveform.len())
        .min(config.max_pitch_frames);
    let mut stft = Stft::new(*grid);
    let mut magnitudes = Vec::with_capacity(stft.bins());
    let mut track = PitchTrack::default();

    for index in 0..frames {
        stft.magnitudes(waveform.samples(), index, &mut magnitudes);
        if let Some(freq) = frame_pitch(&magnitudes, &stft, config) {
            track.frequencies.push(freq);
            track.times.push(grid.frame_time(index));
        }
    }

    debug!("Pitch track: {} of {} frames voiced", track.len(), frames);
    Ok(track)
}

/// Strongest in-band spectral peak of one frame, refined by parabolic
/// interpolation. `None` when no peak clears the frame-relative threshold.
fn frame_pitch(magnitudes: &[f32], stft: &Stft, config: &AudioConfig) -> Option<f64> {
    let bins = magnitudes.len();
    if bins < 3 {
        return None;
    }
    let bin_hz = stft.bin_frequency(1.0);
    let lo = ((config.pitch_min_hz / bin_hz).ceil() as usize).max(1);
    let hi = ((config.pitch_max_hz / bin_hz).floor() as usize).min(bins - 2);
    if lo > hi {
        return None;
    }

    let frame_max = magnitudes.iter().copied().fold(0.0f32, f32::max) as f64;
    let threshold = config.pitch_threshold * frame_max;

    let mut best: Option<(usize, f64)> = None;
    for bin in lo..=hi {
        let m = magnitudes[bin] as f64;
        let is_peak = m > magnitudes[bin - 1] as f64 && m >= magnitudes[bin + 1] as f64;
        if is_peak && m > threshold && best.map_or(true, |(_, b)| m > b) {
            best = Some((bin, m));
        }
    }

    let (bin, magnitude) = best?;
    if magnitude <= 0.0 {
        return None;
    }

    let alpha = magnitudes[bin - 1] as f64;
    let beta = magnitude;
    let gamma = magnitudes[bin + 1] as f64;
    let denom = alpha - 2.0 * beta + gamma;
    let shift = if denom.abs() > f64::EPSILON {
        (0.5 * (alpha - gamma) / denom).clamp(-0.5, 0.5)
    } else {
        0.0
    };

    let freq = stft.bin_frequency(bin as f64 + shift);
    (freq > config.pitch_min_hz && freq < config.pitch_max_hz).then_some(freq)
}

/// Mean and spread of one cepstral coefficient over the recording
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CepstralCoefficient {
    /// 1-based coefficient number
    pub index: usize,
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CepstralFeatures {
    pub coefficients: Vec<CepstralCoefficient>,
}

impl CepstralFeatures {
    /// All-zero summary used when extraction fails
    pub fn zeros(count: usize) -> Self {
        Self {
            coefficients: (1..=count)
                .map(|index| CepstralCoefficient {
                    index,
                    mean: 0.0,
                    std: 0.0,
                })
                .collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&CepstralCoefficient> {
        self.coefficients.iter().find(|c| c.index == index)
    }
}

/// Triangular mel filters, stored sparsely as (bin, weight)
pub struct MelFilterBank {
    filters: Vec<Vec<(usize, f64)>>,
}

impl MelFilterBank {
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize, f_min: f64, f_max: f64) -> Self {
        let bins = n_fft / 2 + 1;
        let mel_min = hz_to_mel(f_min);
        let mel_max = hz_to_mel(f_max.max(f_min));
        let edges: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
            .collect();
        let bin_hz = sample_rate as f64 / n_fft as f64;

        let filters = (0..n_mels)
            .map(|m| {
                let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
                // area normalization keeps band energies comparable
                let norm = if right > left { 2.0 / (right - left) } else { 0.0 };
                (0..bins)
                    .filter_map(|bin| {
                        let f = bin as f64 * bin_hz;
                        let rising = if center > left {
                            (f - left) / (center - left)
                        } else {
                            0.0
                        };
                        let falling = if right > center {
                            (right - f) / (right - center)
                        } else {
                            0.0
                        };
                        let w = rising.min(falling).max(0.0) * norm;
                        (w > 0.0).then_some((bin, w))
                    })
                    .collect()
            })
            .collect();

        Self { filters }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Mel band energies of a power spectrum
    pub fn apply(&self, power: &[f64]) -> Vec<f64> {
        self.filters
            .iter()
            .map(|filter| {
                filter
                    .iter()
                    .map(|&(bin, w)| power.get(bin).copied().unwrap_or(0.0) * w)
                    .sum()
            })
            .collect()
    }
}

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

/// Orthonormal DCT-II, first `count` coefficients
fn dct_ii_ortho(values: &[f64], count: usize) -> Vec<f64> {
    let n = values.len() as f64;
    (0..count)
        .map(|k| {
            let sum: f64 = values
                .iter()
                .enumerate()
                .map(|(m, &v)| v * (PI * k as f64 * (m as f64 + 0.5) / n).cos())
                .sum();
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            sum * scale
        })
        .collect()
}

/// Per-coefficient mean and standard deviation of the mel cepstrum
pub fn cepstral_features(
    waveform: &Waveform,
    grid: &FrameGrid,
    config: &AudioConfig,
) -> Result<CepstralFeatures, ExtractionError> {
    if waveform.is_empty() {
        return Err(ExtractionError::EmptyInput { family: "cepstral" });
    }
    if config.n_mfcc == 0 || config.n_mfcc > config.n_mels {
        return Err(ExtractionError::InvalidParameters(format!(
            "n_mfcc={} n_mels={}",
            config.n_mfcc, config.n_mels
        )));
    }

    let bank = MelFilterBank::new(
        grid.sample_rate,
        grid.frame_length,
        config.n_mels,
        0.0,
        grid.sample_rate as f64 / 2.0,
    );
    let mut stft = Stft::new(*grid);
    let mut magnitudes = Vec::with_capacity(stft.bins());
    let mut mel_db = Vec::new();

    for index in 0..grid.frame_count(waveform.len()) {
        stft.magnitudes(waveform.samples(), index, &mut magnitudes);
        let power: Vec<f64> = magnitudes.iter().map(|&m| (m as f64) * (m as f64)).collect();
        let bands: Vec<f64> = bank
            .apply(&power)
            .into_iter()
            .map(|e| 10.0 * e.max(POWER_FLOOR).log10())
            .collect();
        mel_db.push(bands);
    }

    let loudest = mel_db
        .iter()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let floor = loudest - TOP_DB;

    let frames: Vec<Vec<f64>> = mel_db
        .into_iter()
        .map(|bands| {
            let clipped: Vec<f64> = bands.into_iter().map(|b| b.max(floor)).collect();
            dct_ii_ortho(&clipped, config.n_mfcc)
        })
        .collect();

    let coefficients = (0..config.n_mfcc)
        .map(|k| {
            let trace: Vec<f64> = frames.iter().map(|f| f[k]).collect();
            let (mean, std) = mean_std(&trace);
            CepstralCoefficient {
                index: k + 1,
                mean,
                std,
            }
        })
        .collect::<Vec<_>>();

    if coefficients
        .iter()
        .any(|c| !c.mean.is_finite() || !c.std.is_finite())
    {
        return Err(ExtractionError::NonFinite { family: "cepstral" });
    }

    Ok(CepstralFeatures { coefficients })
}
