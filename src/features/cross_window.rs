//! Cross-window ratio features.
//!
//! Compare the short, medium and long windows to each other. Every
//! denominator is guarded with `max(x, 1)` so the ratios are always finite.

use super::window_stats::WindowStats;
use crate::schema::CROSS_RATIO_COUNT;

/// Value used for every ratio when any window fell back.
pub const NEUTRAL_RATIO: f64 = 1.0;

#[inline]
fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    numerator / denominator.max(1.0)
}

/// Mean and std ratios across the three scales:
/// `[mean s/m, mean m/l, mean s/l, std s/m, std m/l, std s/l]`.
pub fn cross_window_ratios(
    short: &WindowStats,
    medium: &WindowStats,
    long: &WindowStats,
) -> [f64; CROSS_RATIO_COUNT] {
    [
        guarded_ratio(short.mean, medium.mean),
        guarded_ratio(medium.mean, long.mean),
        guarded_ratio(short.mean, long.mean),
        guarded_ratio(short.std, medium.std),
        guarded_ratio(medium.std, long.std),
        guarded_ratio(short.std, long.std),
    ]
}

/// Ratios used when at least one window was too sparse.
pub fn neutral_ratios() -> [f64; CROSS_RATIO_COUNT] {
    [NEUTRAL_RATIO; CROSS_RATIO_COUNT]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(mean: f64, std: f64) -> WindowStats {
        WindowStats {
            mean,
            std,
            max: 0.0,
            min: 0.0,
            median: 0.0,
            high_power_count: 0.0,
            line_imbalance: 0.0,
            volatility: 0.0,
            voltage_ratio: 0.0,
            iqr: 0.0,
        }
    }

    #[test]
    fn test_ratios() {
        let r = cross_window_ratios(&stats(200.0, 20.0), &stats(100.0, 10.0), &stats(50.0, 5.0));
        assert_eq!(r, [2.0, 2.0, 4.0, 2.0, 2.0, 4.0]);
    }

    #[test]
    fn test_small_denominators_are_guarded() {
        let r = cross_window_ratios(&stats(3.0, 0.5), &stats(0.0, 0.0), &stats(0.2, 0.0));
        assert!(r.iter().all(|v| v.is_finite()));
        assert_eq!(r[0], 3.0);
        assert_eq!(r[3], 0.5);
    }
}
