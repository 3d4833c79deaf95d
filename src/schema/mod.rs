//! Feature Schema Module
//!
//! Versioned layout of the 41-value window feature vector. The trainer reads
//! features by position, so the order below is a contract: any change to the
//! number of windows, the statistics per window or their order must bump
//! [`SCHEMA_VERSION`].
//!
//! ```text
//! index  0..5    current sample      l1, l2, w110, w220, total
//! index  5..15   short window stats  (10)
//! index 15..25   medium window stats (10)
//! index 25..35   long window stats   (10)
//! index 35..41   cross-window ratios (6)
//! ```
//!
//! # Example
//!
//! ```
//! use pu_feature_prep::schema::{FeatureSchema, FEATURE_COUNT};
//!
//! let schema = FeatureSchema::window_features();
//! assert_eq!(schema.total_count(), FEATURE_COUNT);
//! assert_eq!(schema.get_feature("short_mean").unwrap().index, 5);
//! ```

mod feature_def;

pub use feature_def::{FeatureCategory, FeatureDef, FeatureSchema, WindowScale};

/// Current schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Current-sample features: L1, L2, 110V, 220V, total
pub const CURRENT_FEATURE_COUNT: usize = 5;

/// Statistics per window scale
pub const WINDOW_STAT_COUNT: usize = 10;

/// Number of window scales (short, medium, long)
pub const WINDOW_SCALE_COUNT: usize = 3;

/// Cross-window ratio features
pub const CROSS_RATIO_COUNT: usize = 6;

/// Total feature vector length
pub const FEATURE_COUNT: usize =
    CURRENT_FEATURE_COUNT + WINDOW_SCALE_COUNT * WINDOW_STAT_COUNT + CROSS_RATIO_COUNT;

/// Offset of the cross-window ratio block
pub const CROSS_RATIO_OFFSET: usize = CURRENT_FEATURE_COUNT + WINDOW_SCALE_COUNT * WINDOW_STAT_COUNT;

/// Names of the ten per-window statistics, in vector order.
pub const WINDOW_STAT_NAMES: [&str; WINDOW_STAT_COUNT] = [
    "mean",
    "std",
    "max",
    "min",
    "median",
    "high_power_count",
    "line_imbalance",
    "volatility",
    "voltage_ratio",
    "iqr",
];

/// Names of the current-sample features, in vector order.
pub const CURRENT_FEATURE_NAMES: [&str; CURRENT_FEATURE_COUNT] = [
    "raw_wattage_l1",
    "raw_wattage_l2",
    "wattage_110v",
    "wattage_220v",
    "wattage_total",
];

/// Names of the cross-window ratios, in vector order.
pub const CROSS_RATIO_NAMES: [&str; CROSS_RATIO_COUNT] = [
    "ratio_mean_short_medium",
    "ratio_mean_medium_long",
    "ratio_mean_short_long",
    "ratio_std_short_medium",
    "ratio_std_medium_long",
    "ratio_std_short_long",
];

/// Offset of the statistics block for a window scale.
pub const fn window_offset(scale: WindowScale) -> usize {
    CURRENT_FEATURE_COUNT + scale.position() * WINDOW_STAT_COUNT
}

/// All 41 feature names in vector order.
pub fn feature_names() -> Vec<String> {
    FeatureSchema::window_features()
        .all_features()
        .iter()
        .map(|f| f.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_count() {
        assert_eq!(FEATURE_COUNT, 41);
        assert_eq!(CROSS_RATIO_OFFSET, 35);
    }

    #[test]
    fn test_window_offsets() {
        assert_eq!(window_offset(WindowScale::Short), 5);
        assert_eq!(window_offset(WindowScale::Medium), 15);
        assert_eq!(window_offset(WindowScale::Long), 25);
    }

    #[test]
    fn test_feature_names_unique() {
        let names = feature_names();
        assert_eq!(names.len(), FEATURE_COUNT);
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), FEATURE_COUNT);
        assert_eq!(names[0], "raw_wattage_l1");
        assert_eq!(names[40], "ratio_std_short_long");
    }
}
