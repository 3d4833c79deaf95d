//! Per-window statistics.
//!
//! A window is the slice of a dataset timeline ending at the target
//! sample's timestamp. With enough readings we summarise it with ten
//! statistics; with too few we replicate the target sample's own values so
//! no statistic is ever undefined.
//!
//! | # | Statistic | Definition |
//! |---|-----------|------------|
//! | 0 | mean | mean(total) |
//! | 1 | std | population std(total) |
//! | 2 | max | max(total) |
//! | 3 | min | min(total) |
//! | 4 | median | median(total) |
//! | 5 | high_power_count | #{total > 1.5 × mean} |
//! | 6 | line_imbalance | mean(L1) − mean(L2) |
//! | 7 | volatility | Σ (Δ total)² in time order |
//! | 8 | voltage_ratio | mean(110V) / max(mean(220V), 1) |
//! | 9 | iqr | p75(total) − p25(total) |

use crate::sample::RawSample;
use crate::schema::WINDOW_STAT_COUNT;

/// Multiplier of the window mean above which a reading is a high-power event.
pub const HIGH_POWER_FACTOR: f64 = 1.5;

/// Ten statistics describing one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    /// Mean total wattage
    pub mean: f64,
    /// Population std of total wattage
    pub std: f64,
    /// Highest total wattage
    pub max: f64,
    /// Lowest total wattage
    pub min: f64,
    /// Median total wattage
    pub median: f64,
    /// Readings above `HIGH_POWER_FACTOR` x mean
    pub high_power_count: f64,
    /// Mean L1 minus mean L2
    pub line_imbalance: f64,
    /// Sum of squared consecutive total-wattage differences
    pub volatility: f64,
    /// Mean 110V over `max(mean 220V, 1)`
    pub voltage_ratio: f64,
    /// Interquartile range of total wattage
    pub iqr: f64,
}

impl WindowStats {
    /// Summarise a time-ordered window.
    ///
    /// Returns `None` when the window holds fewer than `min_samples`
    /// readings (or is empty), in which case the caller falls back to
    /// [`WindowStats::fallback`].
    pub fn compute(window: &[RawSample], min_samples: usize) -> Option<Self> {
        if window.is_empty() || window.len() < min_samples {
            return None;
        }

        let n = window.len() as f64;
        let totals: Vec<f64> = window.iter().map(RawSample::total).collect();

        let mean = totals.iter().sum::<f64>() / n;
        let variance = totals.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
        let max = totals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = totals.iter().copied().fold(f64::INFINITY, f64::min);

        let mut sorted = totals.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let high_power_count = totals
            .iter()
            .filter(|&&x| x > HIGH_POWER_FACTOR * mean)
            .count() as f64;

        let mean_l1 = window.iter().map(RawSample::l1).sum::<f64>() / n;
        let mean_l2 = window.iter().map(RawSample::l2).sum::<f64>() / n;
        let mean_110 = window.iter().map(RawSample::w110).sum::<f64>() / n;
        let mean_220 = window.iter().map(RawSample::w220).sum::<f64>() / n;

        let volatility = totals.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();

        Some(Self {
            mean,
            std: variance.sqrt(),
            max,
            min,
            median: percentile(&sorted, 50.0),
            high_power_count,
            line_imbalance: mean_l1 - mean_l2,
            volatility,
            voltage_ratio: mean_110 / mean_220.max(1.0),
            iqr: percentile(&sorted, 75.0) - percentile(&sorted, 25.0),
        })
    }

    /// Sparse-window replacement built from the target sample alone:
    /// `[total, 0, total, total, total, 0, L1−L2, 0, 110V/max(220V,1), 0]`.
    ///
    /// This flattens early-window features on purpose rather than emitting
    /// undefined statistics.
    pub fn fallback(sample: &RawSample) -> Self {
        let total = sample.total();
        Self {
            mean: total,
            std: 0.0,
            max: total,
            min: total,
            median: total,
            high_power_count: 0.0,
            line_imbalance: sample.l1() - sample.l2(),
            volatility: 0.0,
            voltage_ratio: sample.w110() / sample.w220().max(1.0),
            iqr: 0.0,
        }
    }

    /// Statistics in feature-vector order.
    pub fn to_array(&self) -> [f64; WINDOW_STAT_COUNT] {
        [
            self.mean,
            self.std,
            self.max,
            self.min,
            self.median,
            self.high_power_count,
            self.line_imbalance,
            self.volatility,
            self.voltage_ratio,
            self.iqr,
        ]
    }
}

/// Percentile of an ascending slice with linear interpolation between
/// closest ranks. Returns 0 for an empty slice.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (pct / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn window_of(totals: &[f64]) -> Vec<RawSample> {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        totals
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                RawSample::new(
                    i as u64,
                    1,
                    base + Duration::minutes(i as i64 * 5),
                    t * 0.6,
                    t * 0.4,
                    t * 0.25,
                    t * 0.75,
                    t,
                    false,
                )
            })
            .collect()
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&sorted, 50.0) - 2.5).abs() < 1e-12);
        assert!((percentile(&sorted, 25.0) - 1.75).abs() < 1e-12);
        assert!((percentile(&sorted, 75.0) - 3.25).abs() < 1e-12);
        assert_eq!(percentile(&[], 50.0), 0.0);
        assert_eq!(percentile(&[7.0], 90.0), 7.0);
    }

    #[test]
    fn test_too_few_samples_returns_none() {
        let window = window_of(&[100.0, 200.0]);
        assert!(WindowStats::compute(&window, 3).is_none());
        assert!(WindowStats::compute(&[], 0).is_none());
    }

    #[test]
    fn test_basic_statistics() {
        let window = window_of(&[100.0, 200.0, 300.0, 400.0]);
        let stats = WindowStats::compute(&window, 3).unwrap();

        assert!((stats.mean - 250.0).abs() < 1e-10);
        // population std of 100..400 step 100
        assert!((stats.std - 111.803398875).abs() < 1e-6);
        assert_eq!(stats.max, 400.0);
        assert_eq!(stats.min, 100.0);
        assert!((stats.median - 250.0).abs() < 1e-10);
        // 1.5 × 250 = 375 → only 400 exceeds
        assert_eq!(stats.high_power_count, 1.0);
        // mean(L1) - mean(L2) = 0.2 × 250
        assert!((stats.line_imbalance - 50.0).abs() < 1e-10);
        // three steps of 100
        assert!((stats.volatility - 30_000.0).abs() < 1e-6);
        // mean(110V) / mean(220V) = 0.25 / 0.75
        assert!((stats.voltage_ratio - 1.0 / 3.0).abs() < 1e-10);
        assert!((stats.iqr - 150.0).abs() < 1e-10);
    }

    #[test]
    fn test_voltage_ratio_guard() {
        let mut window = window_of(&[10.0, 10.0, 10.0]);
        for s in &mut window {
            s.wattage_220v = Some(0.0);
            s.wattage_110v = Some(5.0);
        }
        let stats = WindowStats::compute(&window, 3).unwrap();
        assert_eq!(stats.voltage_ratio, 5.0);
    }

    #[test]
    fn test_fallback_layout() {
        let sample = &window_of(&[500.0])[0];
        let stats = WindowStats::fallback(sample);
        assert_eq!(
            stats.to_array(),
            [
                500.0,
                0.0,
                500.0,
                500.0,
                500.0,
                0.0,
                300.0 - 200.0,
                0.0,
                125.0 / 375.0,
                0.0
            ]
        );
    }
}
