//! Summary statistics shared by every feature family

use serde::{Deserialize, Serialize};

/// Mean, population standard deviation, max and min of a series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub mean: f64,
    pub std: f64,
    pub max: f64,
    pub min: f64,
}

impl SummaryStats {
    /// Summarize a series, `None` when it is empty
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let (mean, std) = mean_std(values);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        Some(Self {
            mean,
            std,
            max,
            min,
        })
    }

    /// A series that never varied from `value`
    pub fn flat(value: f64) -> Self {
        Self {
            mean: value,
            std: 0.0,
            max: value,
            min: value,
        }
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn is_finite(&self) -> bool {
        self.mean.is_finite()
            && self.std.is_finite()
            && self.max.is_finite()
            && self.min.is_finite()
    }
}

/// Statistics over segment durations, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationStats {
    pub mean: f64,
    pub std: f64,
    pub median: f64,
    pub max: f64,
    pub min: f64,
}

impl DurationStats {
    /// Summarize durations; all zeros when there are none
    pub fn from_durations(durations: &[f64]) -> Self {
        let Some(summary) = SummaryStats::from_values(durations) else {
            return Self::default();
        };
        Self {
            mean: summary.mean,
            std: summary.std,
            median: median(durations),
            max: summary.max,
            min: summary.min,
        }
    }
}

/// Mean and population standard deviation
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
