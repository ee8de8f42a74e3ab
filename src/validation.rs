//! Heart-rate fluidity self-check
//!
//! Wearable traces change by 0 or 1 bpm most of the time. A report over a
//! window of consecutive samples counts the absolute changes and checks
//! that the window looks like telemetry rather than jitter.

use serde::Serialize;
use statrs::statistics::Statistics;

use crate::models::HeartRateSample;

/// Samples examined by the generator's own check
pub const FLUIDITY_WINDOW: usize = 200;
/// Minimum share of 0/1 bpm transitions
pub const MIN_SMALL_CHANGE_FRACTION: f64 = 0.55;
/// Mean absolute change must stay below this
pub const MAX_MEAN_CHANGE: f64 = 2.2;

/// Distribution of |Δbpm| across a window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FluidityReport {
    pub transitions: usize,
    pub unchanged: usize,
    pub one_bpm: usize,
    pub two_bpm: usize,
    pub three_plus: usize,
    pub mean_change: f64,
    pub std_dev_change: f64,
}

impl FluidityReport {
    pub fn from_samples(samples: &[HeartRateSample]) -> Self {
        let changes: Vec<f64> = samples
            .windows(2)
            .map(|pair| f64::from(pair[1].bpm.abs_diff(pair[0].bpm)))
            .collect();

        let count = |pred: fn(f64) -> bool| changes.iter().filter(|&&c| pred(c)).count();
        let (mean_change, std_dev_change) = if changes.len() >= 2 {
            (changes.iter().mean(), changes.iter().std_dev())
        } else {
            (changes.first().copied().unwrap_or(0.0), 0.0)
        };

        FluidityReport {
            transitions: changes.len(),
            unchanged: count(|c| c == 0.0),
            one_bpm: count(|c| c == 1.0),
            two_bpm: count(|c| c == 2.0),
            three_plus: count(|c| c >= 3.0),
            mean_change,
            std_dev_change,
        }
    }

    /// Report over the leading [`FLUIDITY_WINDOW`] samples of a trace
    pub fn leading_window(trace: &[HeartRateSample]) -> Self {
        Self::from_samples(&trace[..trace.len().min(FLUIDITY_WINDOW)])
    }

    pub fn small_change_fraction(&self) -> f64 {
        if self.transitions == 0 {
            return 1.0;
        }
        (self.unchanged + self.one_bpm) as f64 / self.transitions as f64
    }

    pub fn passes(&self) -> bool {
        self.small_change_fraction() >= MIN_SMALL_CHANGE_FRACTION && self.mean_change < MAX_MEAN_CHANGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Confidence;
    use chrono::{Duration, NaiveDate};

    fn trace(bpms: &[u16]) -> Vec<HeartRateSample> {
        let start = NaiveDate::from_ymd_opt(2026, 1, 22).unwrap().and_hms_opt(0, 0, 0).unwrap();
        bpms.iter()
            .enumerate()
            .map(|(i, &bpm)| HeartRateSample {
                timestamp: start + Duration::seconds(5 * i as i64),
                bpm,
                confidence: Confidence::High,
            })
            .collect()
    }

    #[test]
    fn test_counts_and_mean() {
        let report = FluidityReport::from_samples(&trace(&[60, 60, 61, 63, 59, 59]));
        assert_eq!(report.transitions, 5);
        assert_eq!(report.unchanged, 2);
        assert_eq!(report.one_bpm, 1);
        assert_eq!(report.two_bpm, 1);
        assert_eq!(report.three_plus, 1);
        assert!((report.mean_change - 7.0 / 5.0).abs() < 1e-9);
        assert!((report.small_change_fraction() - 0.6).abs() < 1e-9);
        assert!(report.passes());
    }

    #[test]
    fn test_jittery_trace_fails() {
        let bpms: Vec<u16> = (0..100).map(|i| if i % 2 == 0 { 60 } else { 66 }).collect();
        let report = FluidityReport::from_samples(&trace(&bpms));
        assert!(!report.passes());
        assert_eq!(report.three_plus, 99);
    }

    #[test]
    fn test_degenerate_windows() {
        assert!(FluidityReport::from_samples(&[]).passes());
        let single = FluidityReport::from_samples(&trace(&[70, 74]));
        assert_eq!(single.transitions, 1);
        assert!((single.mean_change - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_leading_window_is_capped() {
        let bpms: Vec<u16> = (0..500).map(|i| 60 + (i % 2) as u16).collect();
        let report = FluidityReport::leading_window(&trace(&bpms));
        assert_eq!(report.transitions, FLUIDITY_WINDOW - 1);
    }
}
