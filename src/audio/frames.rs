//! Centered frame analysis: RMS energy and zero-crossing rate

use crate::audio::loader::Waveform;
use crate::error::ExtractionError;

/// Fixed framing shared by every frame-based feature so timestamps align.
///
/// Frame `i` is centered on sample `i * hop_length` and spans
/// `frame_length` samples; samples outside the signal read as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGrid {
    pub frame_length: usize,
    pub hop_length: usize,
    pub sample_rate: u32,
}

impl FrameGrid {
    pub fn new(
        frame_length: usize,
        hop_length: usize,
        sample_rate: u32,
    ) -> Result<Self, ExtractionError> {
        if frame_length == 0 || hop_length == 0 || sample_rate == 0 {
            return Err(ExtractionError::InvalidParameters(format!(
                "frame_length={frame_length} hop_length={hop_length} sample_rate={sample_rate}"
            )));
        }
        Ok(Self {
            frame_length,
            hop_length,
            sample_rate,
        })
    }

    /// Number of frames covering `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            1 + len / self.hop_length
        }
    }

    /// Timestamp of frame `index` in seconds
    pub fn frame_time(&self, index: usize) -> f64 {
        (index * self.hop_length) as f64 / self.sample_rate as f64
    }

    pub fn frame_times(&self, len: usize) -> Vec<f64> {
        (0..self.frame_count(len)).map(|i| self.frame_time(i)).collect()
    }

    /// In-range part of frame `index`, and how many zero samples precede it
    pub fn frame_slice<'a>(&self, samples: &'a [f32], index: usize) -> (usize, &'a [f32]) {
        let half = self.frame_length / 2;
        let center = index * self.hop_length;
        let start = center as isize - half as isize;
        let end = (start + self.frame_length as isize).clamp(0, samples.len() as isize) as usize;
        let lead = if start < 0 { (-start) as usize } else { 0 };
        let start = start.max(0) as usize;
        let start = start.min(end);
        (lead.min(self.frame_length), &samples[start..end])
    }

    /// Copy frame `index` into `out` (length `frame_length`), zero padded
    pub fn fill_frame(&self, samples: &[f32], index: usize, out: &mut [f32]) {
        out.iter_mut().for_each(|v| *v = 0.0);
        let (lead, slice) = self.frame_slice(samples, index);
        let n = slice.len().min(out.len().saturating_sub(lead));
        out[lead..lead + n].copy_from_slice(&slice[..n]);
    }
}

/// One scalar per frame, with frame timestamps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameSeries {
    pub values: Vec<f64>,
    pub times: Vec<f64>,
}

impl FrameSeries {
    pub fn new(values: Vec<f64>, times: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), times.len());
        Self { values, times }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Root-mean-square amplitude per frame
pub fn rms_series(waveform: &Waveform, grid: &FrameGrid) -> FrameSeries {
    let samples = waveform.samples();
    let count = grid.frame_count(samples.len());
    let values = (0..count)
        .map(|i| {
            let (_, slice) = grid.frame_slice(samples, i);
            let sum_squares: f64 = slice.iter().map(|&s| (s as f64) * (s as f64)).sum();
            (sum_squares / grid.frame_length as f64).sqrt()
        })
        .collect();
    FrameSeries::new(values, grid.frame_times(samples.len()))
}

/// Fraction of sign changes per frame; zero counts as positive
pub fn zero_crossing_series(waveform: &Waveform, grid: &FrameGrid) -> FrameSeries {
    let samples = waveform.samples();
    let count = grid.frame_count(samples.len());
    let values = (0..count)
        .map(|i| {
            let (_, slice) = grid.frame_slice(samples, i);
            let crossings = slice
                .windows(2)
                .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
                .count();
            crossings as f64 / grid.frame_length as f64
        })
        .collect();
    FrameSeries::new(values, grid.frame_times(samples.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> FrameGrid {
        FrameGrid::new(4, 2, 10).unwrap()
    }

    #[test]
    fn test_frame_count_and_times() {
        let grid = grid();
        assert_eq!(grid.frame_count(0), 0);
        assert_eq!(grid.frame_count(1), 1);
        assert_eq!(grid.frame_count(10), 6);
        assert_eq!(grid.frame_times(5), vec![0.0, 0.2, 0.4]);
    }

    #[test]
    fn test_frame_slice_is_centered() {
        let grid = grid();
        let samples: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let (lead, slice) = grid.frame_slice(&samples, 0);
        assert_eq!(lead, 2);
        assert_eq!(slice, &[0.0, 1.0]);

        let (lead, slice) = grid.frame_slice(&samples, 2);
        assert_eq!(lead, 0);
        assert_eq!(slice, &[2.0, 3.0, 4.0, 5.0]);

        let (_, slice) = grid.frame_slice(&samples, 5);
        assert_eq!(slice, &[8.0, 9.0]);

        let mut out = [9.0; 4];
        grid.fill_frame(&samples, 0, &mut out);
        assert_eq!(out, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_invalid_grid() {
        assert!(FrameGrid::new(0, 512, 22050).is_err());
        assert!(FrameGrid::new(2048, 0, 22050).is_err());
    }

    #[test]
    fn test_rms_of_constant_signal() {
        let waveform = Waveform::new(vec![0.5; 100], 10);
        let series = rms_series(&waveform, &grid());
        assert_eq!(series.len(), 51);
        // interior frames are fully covered
        assert!((series.values[10] - 0.5).abs() < 1e-9);
        // the first frame is half padding
        assert!((series.values[0] - (0.125f64).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_zero_crossings_of_alternating_signal() {
        let samples: Vec<f32> = (0..100).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        let waveform = Waveform::new(samples, 10);
        let series = zero_crossing_series(&waveform, &grid());
        assert!((series.values[10] - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_empty_waveform_has_no_frames() {
        let waveform = Waveform::empty(22050);
        let grid = FrameGrid::new(2048, 512, 22050).unwrap();
        assert!(rms_series(&waveform, &grid).is_empty());
        assert!(zero_crossing_series(&waveform, &grid).is_empty());
    }
}
