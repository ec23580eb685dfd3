//! Speech/pause segmentation over a frame energy trace

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::audio::frames::FrameSeries;
use crate::audio::stats::DurationStats;
use crate::config::SegmentationConfig;

/// Per-frame classification against the adaptive threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameLabel {
    /// Energy above the threshold
    Speech,
    /// Energy at or below the threshold
    Pause,
}

/// Segmenter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    InSpeech,
    InPause,
}

impl From<FrameLabel> for SegmentState {
    fn from(label: FrameLabel) -> Self {
        match label {
            FrameLabel::Speech => SegmentState::InSpeech,
            FrameLabel::Pause => SegmentState::InPause,
        }
    }
}

/// A closed interval of the timeline, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: FrameLabel,
    pub start: f64,
    pub end: f64,
    /// Whether the segment met its minimum duration
    pub committed: bool,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Every segment closed over one energy trace, committed or not.
///
/// The segments are ordered and contiguous: together they cover
/// `[0, duration]` exactly once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segmentation {
    pub threshold: f64,
    pub labels: Vec<FrameLabel>,
    pub segments: Vec<Segment>,
    pub duration: f64,
}

impl Segmentation {
    /// Committed speech segments (utterances)
    pub fn speech(&self) -> impl Iterator<Item = &Segment> {
        self.committed(FrameLabel::Speech)
    }

    /// Committed pause segments
    pub fn pauses(&self) -> impl Iterator<Item = &Segment> {
        self.committed(FrameLabel::Pause)
    }

    fn committed(&self, kind: FrameLabel) -> impl Iterator<Item = &Segment> {
        self.segments
            .iter()
            .filter(move |s| s.committed && s.kind == kind)
    }
}

/// Segmentation statistics consumed by the scoring engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentationStats {
    /// Committed speech segment count
    pub number_utt: u32,
    /// Utterances per minute
    pub speech_rate: f64,
    /// Committed speech segment durations
    pub speech: DurationStats,
    /// Committed pause durations strictly above the statistics floor
    pub pause: DurationStats,
}

/// Two-state speech/pause machine with minimum-duration commits
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmentationConfig,
}

impl Segmenter {
    pub fn new(config: &SegmentationConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Energy at the configured percentile of the sorted trace, 0 when empty
    pub fn threshold(&self, energy: &[f64]) -> f64 {
        if energy.is_empty() {
            return 0.0;
        }
        let mut sorted = energy.to_vec();
        sorted.sort_by(f64::total_cmp);
        let index = ((sorted.len() as f64 * self.config.threshold_percentile).floor() as usize)
            .max(1)
            .min(sorted.len() - 1);
        sorted[index]
    }

    /// Label each frame as speech when its energy exceeds `threshold`
    pub fn label(&self, energy: &[f64], threshold: f64) -> Vec<FrameLabel> {
        energy
            .iter()
            .map(|&e| {
                if e > threshold {
                    FrameLabel::Speech
                } else {
                    FrameLabel::Pause
                }
            })
            .collect()
    }

    /// Run the state machine over the labelled trace.
    ///
    /// The first label picks the starting state at t=0. Each state change
    /// closes the pending segment at the current frame time; the segment
    /// open at the end of the trace closes at `duration`.
    pub fn segment(&self, energy: &FrameSeries, duration: f64) -> Segmentation {
        let threshold = self.threshold(&energy.values);
        let labels = self.label(&energy.values, threshold);
        let mut segments = Vec::new();
        let mut pending: Option<(SegmentState, f64)> = None;

        for (&label, &time) in labels.iter().zip(&energy.times) {
            let observed = SegmentState::from(label);
            match pending {
                None => pending = Some((observed, 0.0)),
                Some((state, start)) if state != observed => {
                    segments.push(self.close(state, start, time));
                    trace!("Segmenter: {:?} -> {:?} at {:.3}s", state, observed, time);
                    pending = Some((observed, time));
                }
                Some(_) => {}
            }
        }

        if let Some((state, start)) = pending {
            segments.push(self.close(state, start, duration));
        }

        Segmentation {
            threshold,
            labels,
            segments,
            duration,
        }
    }

    fn close(&self, state: SegmentState, start: f64, end: f64) -> Segment {
        let (kind, min_duration) = match state {
            SegmentState::InSpeech => (FrameLabel::Speech, self.config.min_speech_duration),
            SegmentState::InPause => (FrameLabel::Pause, self.config.min_pause_duration),
        };
        Segment {
            kind,
            start,
            end,
            committed: end - start >= min_duration,
        }
    }

    /// Utterance count, speech rate and duration statistics
    pub fn stats(&self, segmentation: &Segmentation) -> SegmentationStats {
        let speech: Vec<f64> = segmentation.speech().map(Segment::duration).collect();
        let pauses: Vec<f64> = segmentation
            .pauses()
            .map(Segment::duration)
            .filter(|&d| d > self.config.pause_stat_floor)
            .collect();

        let number_utt = speech.len() as u32;
        let speech_rate = if segmentation.duration > 0.0 {
            number_utt as f64 / (segmentation.duration / 60.0)
        } else {
            0.0
        };

        SegmentationStats {
            number_utt,
            speech_rate,
            speech: DurationStats::from_durations(&speech),
            pause: DurationStats::from_durations(&pauses),
        }
    }

    /// Segment and summarize; an empty trace yields all-zero statistics
    pub fn analyze(&self, energy: &FrameSeries, duration: f64) -> SegmentationStats {
        if energy.is_empty() {
            debug!("Empty energy trace, segmentation defaults to zero");
            return SegmentationStats::default();
        }
        let segmentation = self.segment(energy, duration);
        let stats = self.stats(&segmentation);
        debug!(
            "Segmentation: threshold={:.5}, {} utterances, {:.1}/min",
            segmentation.threshold, stats.number_utt, stats.speech_rate
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64], step: f64) -> FrameSeries {
        let times = (0..values.len()).map(|i| i as f64 * step).collect();
        FrameSeries::new(values.to_vec(), times)
    }

    fn segmenter() -> Segmenter {
        Segmenter::new(&SegmentationConfig::default())
    }

    // Simple deterministic pseudo-random for testing
    fn xorshift(seed: &mut u32) -> f64 {
        let mut x = *seed;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        *seed = x;
        x as f64 / u32::MAX as f64
    }

    #[test]
    fn test_threshold_percentile_index() {
        let s = segmenter();
        assert_eq!(s.threshold(&[]), 0.0);
        // floor(0.3 * 7) = 2
        assert_eq!(s.threshold(&[0.9, 0.01, 0.5, 0.02, 0.03, 0.7, 0.8]), 0.03);
        // max(1, floor(0.3 * 2)) = 1
        assert_eq!(s.threshold(&[0.2, 0.1]), 0.2);
        // single frame clamps to the only value
        assert_eq!(s.threshold(&[0.4]), 0.4);
    }

    #[test]
    fn test_single_utterance_scenario() {
        let s = segmenter();
        let energy = series(&[0.01, 0.01, 0.9, 0.9, 0.9, 0.01, 0.01], 0.1);
        let seg = s.segment(&energy, 0.7);

        assert_eq!(seg.threshold, 0.01);
        let speech: Vec<_> = seg.speech().collect();
        assert_eq!(speech.len(), 1);
        assert!((speech[0].start - 0.2).abs() < 1e-9);
        assert!((speech[0].end - 0.5).abs() < 1e-9);

        let pauses: Vec<_> = seg.pauses().collect();
        assert_eq!(pauses.len(), 2);
        assert!(pauses.iter().all(|p| (p.duration() - 0.2).abs() < 1e-9));

        let stats = s.stats(&seg);
        assert_eq!(stats.number_utt, 1);
        assert!((stats.speech_rate - 60.0 / 0.7).abs() < 1e-9);
        assert!((stats.speech.mean - 0.3).abs() < 1e-9);
        assert!((stats.pause.mean - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_short_speech_is_not_committed() {
        let s = segmenter();
        // one loud frame of 0.05s between pauses
        let energy = series(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0], 0.05);
        let seg = s.segment(&energy, 0.35);
        assert_eq!(seg.speech().count(), 0);
        let short: Vec<_> = seg
            .segments
            .iter()
            .filter(|s| s.kind == FrameLabel::Speech)
            .collect();
        assert_eq!(short.len(), 1);
        assert!(!short[0].committed);
        assert_eq!(s.stats(&seg).number_utt, 0);
    }

    #[test]
    fn test_pause_commit_and_statistic_thresholds_differ() {
        let config = SegmentationConfig {
            min_pause_duration: 0.0625,
            pause_stat_floor: 0.0625,
            ..Default::default()
        };
        let s = Segmenter::new(&config);
        let seg = Segmentation {
            threshold: 0.0,
            labels: Vec::new(),
            segments: vec![
                Segment {
                    kind: FrameLabel::Speech,
                    start: 0.0,
                    end: 0.5,
                    committed: true,
                },
                // exactly at the floor: committed, but excluded from statistics
                Segment {
                    kind: FrameLabel::Pause,
                    start: 0.5,
                    end: 0.5625,
                    committed: true,
                },
                Segment {
                    kind: FrameLabel::Speech,
                    start: 0.5625,
                    end: 1.0,
                    committed: true,
                },
                Segment {
                    kind: FrameLabel::Pause,
                    start: 1.0,
                    end: 1.5,
                    committed: true,
                },
            ],
            duration: 1.5,
        };
        assert_eq!(seg.pauses().count(), 2);
        let stats = s.stats(&seg);
        assert_eq!(stats.pause.mean, 0.5);
        assert_eq!(stats.pause.min, 0.5);
    }

    #[test]
    fn test_pause_at_commit_boundary_is_committed() {
        let config = SegmentationConfig {
            min_pause_duration: 0.0625,
            ..Default::default()
        };
        let s = Segmenter::new(&config);
        let energy = series(&[0.01, 0.01, 0.01, 0.9, 0.9, 0.9, 0.01, 0.9, 0.9, 0.9], 0.0625);
        let seg = s.segment(&energy, 0.625);
        let pauses: Vec<_> = seg
            .segments
            .iter()
            .filter(|s| s.kind == FrameLabel::Pause)
            .collect();
        assert_eq!(pauses.len(), 2);
        assert_eq!(pauses[1].duration(), 0.0625);
        assert!(pauses[1].committed);
        assert_eq!(seg.speech().count(), 2);
    }

    #[test]
    fn test_no_transitions_close_one_segment() {
        let s = segmenter();
        // constant energy never exceeds its own percentile
        let flat = series(&[0.5; 10], 0.1);
        let seg = s.segment(&flat, 1.0);
        assert_eq!(seg.segments.len(), 1);
        assert_eq!(seg.segments[0].kind, FrameLabel::Pause);
        assert_eq!(seg.segments[0].start, 0.0);
        assert_eq!(seg.segments[0].end, 1.0);
        assert!(seg.segments[0].committed);
        assert_eq!(s.stats(&seg).number_utt, 0);
    }

    #[test]
    fn test_empty_trace_short_circuits() {
        let stats = segmenter().analyze(&FrameSeries::default(), 3.0);
        assert_eq!(stats, SegmentationStats::default());
    }

    #[test]
    fn test_zero_duration_speech_rate() {
        let s = segmenter();
        let seg = Segmentation::default();
        assert_eq!(s.stats(&seg).speech_rate, 0.0);
    }

    #[test]
    fn test_segments_partition_timeline() {
        let s = segmenter();
        let mut seed = 12345u32;
        for trial in 0..50 {
            let n = 5 + trial * 3;
            let values: Vec<f64> = (0..n).map(|_| xorshift(&mut seed)).collect();
            let step = 0.0232;
            let duration = n as f64 * step + 0.01;
            let seg = s.segment(&series(&values, step), duration);

            assert!(!seg.segments.is_empty());
            assert_eq!(seg.segments[0].start, 0.0);
            assert_eq!(seg.segments.last().unwrap().end, duration);
            for pair in seg.segments.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
                assert_ne!(pair[0].kind, pair[1].kind);
            }
            for segment in &seg.segments {
                let min = match segment.kind {
                    FrameLabel::Speech => 0.1,
                    FrameLabel::Pause => 0.05,
                };
                assert_eq!(segment.committed, segment.duration() >= min);
            }
        }
    }

    #[test]
    fn test_higher_percentile_does_not_add_utterances() {
        let energy = series(
            &[0.02, 0.03, 0.4, 0.5, 0.45, 0.02, 0.01, 0.6, 0.7, 0.65, 0.6, 0.03, 0.02, 0.3, 0.35],
            0.05,
        );
        let mut previous = u32::MAX;
        for percentile in [0.3, 0.4, 0.5, 0.6, 0.7] {
            let config = SegmentationConfig {
                threshold_percentile: percentile,
                ..Default::default()
            };
            let stats = Segmenter::new(&config).analyze(&energy, 0.75);
            assert!(stats.number_utt <= previous, "percentile {percentile}");
            previous = stats.number_utt;
        }
    }
}
