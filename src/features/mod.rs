//! Multi-scale window feature extraction for power-meter readings.
//!
//! Every reading becomes a 41-value [`FeatureVector`]:
//!
//! ```text
//! [current(5) | short_stats(10) | medium_stats(10) | long_stats(10) | cross_ratios(6)]
//! ```
//!
//! - `window_stats`: the ten statistics per window and the sparse-window fallback
//! - `cross_window`: mean/std ratios between scales
//!
//! Extraction never fails. Missing channels read as 0, sparse windows fall
//! back to the sample's own values, a sample absent from its timeline gets
//! the default vector, and non-finite outputs are replaced by 0 with a
//! warning. A single bad reading must not abort a batch of thousands.
//!
//! # Usage
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use pu_feature_prep::features::{WindowConfig, WindowFeatureExtractor};
//! use pu_feature_prep::sample::{DatasetTimeline, RawSample};
//!
//! let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let sample = RawSample::new(1, 7, t, 120.0, 80.0, 60.0, 140.0, 200.0, false);
//! let samples = vec![sample.clone()];
//! let timeline = DatasetTimeline::new(7, &samples);
//!
//! let extractor = WindowFeatureExtractor::new(WindowConfig::default());
//! let features = extractor.extract(&sample, &timeline);
//! assert_eq!(features.len(), 41);
//! ```

pub mod cross_window;
pub mod window_stats;

pub use cross_window::{cross_window_ratios, neutral_ratios};
pub use window_stats::WindowStats;

use crate::error::{PrepError, Result};
use crate::sample::{DatasetId, DatasetTimeline, RawSample, SampleId};
use crate::schema::{self, WindowScale, CURRENT_FEATURE_COUNT, FEATURE_COUNT};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Deref;

/// Window sizes for the three scales.
///
/// # Example
///
/// ```
/// use pu_feature_prep::features::WindowConfig;
///
/// let config = WindowConfig::default().with_windows(15, 60, 360);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Short window length in minutes
    #[serde(default = "default_short_window")]
    pub short_window_minutes: u32,

    /// Medium window length in minutes
    #[serde(default = "default_medium_window")]
    pub medium_window_minutes: u32,

    /// Long window length in minutes
    #[serde(default = "default_long_window")]
    pub long_window_minutes: u32,

    /// Minimum readings for a window to be summarised instead of falling back
    #[serde(default = "default_min_window_samples")]
    pub min_window_samples: usize,
}

fn default_short_window() -> u32 {
    30
}

fn default_medium_window() -> u32 {
    60
}

fn default_long_window() -> u32 {
    240
}

fn default_min_window_samples() -> usize {
    3
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            short_window_minutes: default_short_window(),
            medium_window_minutes: default_medium_window(),
            long_window_minutes: default_long_window(),
            min_window_samples: default_min_window_samples(),
        }
    }
}

impl WindowConfig {
    /// Set all three window sizes (minutes).
    pub fn with_windows(mut self, short: u32, medium: u32, long: u32) -> Self {
        self.short_window_minutes = short;
        self.medium_window_minutes = medium;
        self.long_window_minutes = long;
        self
    }

    /// Window length in minutes for a scale.
    pub fn minutes(&self, scale: WindowScale) -> u32 {
        match scale {
            WindowScale::Short => self.short_window_minutes,
            WindowScale::Medium => self.medium_window_minutes,
            WindowScale::Long => self.long_window_minutes,
        }
    }

    /// Window length for a scale.
    pub fn span(&self, scale: WindowScale) -> Duration {
        Duration::minutes(i64::from(self.minutes(scale)))
    }

    /// Validate the window configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.short_window_minutes == 0 {
            return Err("short_window_minutes must be > 0".to_string());
        }
        if self.short_window_minutes >= self.medium_window_minutes {
            return Err("short_window_minutes must be < medium_window_minutes".to_string());
        }
        if self.medium_window_minutes >= self.long_window_minutes {
            return Err("medium_window_minutes must be < long_window_minutes".to_string());
        }
        if self.min_window_samples == 0 {
            return Err("min_window_samples must be > 0".to_string());
        }
        Ok(())
    }
}

/// Fixed-length feature vector (always [`FEATURE_COUNT`] values).
///
/// Immutable once produced; read it through `Deref<Target = [f64]>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    /// Wrap a vector, checking its length.
    pub fn try_from_vec(values: Vec<f64>) -> Result<Self> {
        if values.len() != FEATURE_COUNT {
            return Err(PrepError::FeatureCount {
                expected: FEATURE_COUNT,
                actual: values.len(),
            });
        }
        Ok(Self(values))
    }

    /// The values as a slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Statistics block of one window scale.
    pub fn window_block(&self, scale: WindowScale) -> &[f64] {
        let start = schema::window_offset(scale);
        &self.0[start..start + schema::WINDOW_STAT_COUNT]
    }

    /// The six cross-window ratios.
    pub fn cross_ratios(&self) -> &[f64] {
        &self.0[schema::CROSS_RATIO_OFFSET..]
    }
}

impl Deref for FeatureVector {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl TryFrom<Vec<f64>> for FeatureVector {
    type Error = PrepError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::try_from_vec(values)
    }
}

impl From<FeatureVector> for Vec<f64> {
    fn from(v: FeatureVector) -> Self {
        v.0
    }
}

/// A reading after extraction, ready for pool assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSample {
    /// Sample identifier
    pub id: SampleId,

    /// Owning dataset
    pub dataset_id: DatasetId,

    /// Reading time
    pub timestamp: DateTime<Utc>,

    /// Extracted features
    pub features: FeatureVector,
}

/// Counters describing how often fallbacks kicked in during a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Samples processed
    pub samples: usize,

    /// Windows that had too few readings and used the fallback block
    pub fallback_windows: usize,

    /// Samples whose timeline was missing/empty or did not contain them
    pub default_vectors: usize,

    /// Non-finite values replaced by 0
    pub sanitized_values: usize,
}

impl ExtractionStats {
    /// Add the counters of another batch.
    pub fn merge(&mut self, other: &ExtractionStats) {
        self.samples += other.samples;
        self.fallback_windows += other.fallback_windows;
        self.default_vectors += other.default_vectors;
        self.sanitized_values += other.sanitized_values;
    }
}

/// Converts one reading plus its dataset timeline into a [`FeatureVector`].
///
/// Stateless apart from its configuration, so one extractor can be shared
/// by any number of concurrent preparation runs.
#[derive(Debug, Clone, Default)]
pub struct WindowFeatureExtractor {
    config: WindowConfig,
}

impl WindowFeatureExtractor {
    /// Create an extractor with the given window sizes.
    pub fn new(config: WindowConfig) -> Self {
        Self { config }
    }

    /// Window configuration.
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Number of features produced (always 41).
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Extract the feature vector of `sample` from its dataset timeline.
    ///
    /// If the timeline is empty, belongs to another dataset, or does not
    /// contain the sample, the default vector is returned instead.
    pub fn extract(&self, sample: &RawSample, timeline: &DatasetTimeline) -> FeatureVector {
        let mut stats = ExtractionStats::default();
        self.extract_tracked(sample, Some(timeline), &mut stats)
    }

    /// Default vector: current readings, fallback blocks for every scale and
    /// neutral cross ratios.
    pub fn default_vector(&self, sample: &RawSample) -> FeatureVector {
        let mut stats = ExtractionStats::default();
        self.finish(sample, default_values(sample), &mut stats)
    }

    /// Extract every sample of a pool, looking each one up in the timeline of
    /// its own dataset.
    pub fn extract_batch(
        &self,
        samples: &[RawSample],
        timelines: &BTreeMap<DatasetId, DatasetTimeline>,
    ) -> (Vec<ExtractedSample>, ExtractionStats) {
        let mut stats = ExtractionStats::default();
        let extracted = samples
            .iter()
            .map(|sample| {
                let timeline = timelines.get(&sample.dataset_id);
                ExtractedSample {
                    id: sample.id,
                    dataset_id: sample.dataset_id,
                    timestamp: sample.timestamp,
                    features: self.extract_tracked(sample, timeline, &mut stats),
                }
            })
            .collect();

        log::debug!(
            "Extracted {} samples ({} fallback windows, {} default vectors, {} sanitized values)",
            stats.samples,
            stats.fallback_windows,
            stats.default_vectors,
            stats.sanitized_values
        );

        (extracted, stats)
    }

    fn extract_tracked(
        &self,
        sample: &RawSample,
        timeline: Option<&DatasetTimeline>,
        stats: &mut ExtractionStats,
    ) -> FeatureVector {
        stats.samples += 1;

        let timeline = match timeline {
            Some(t)
                if !t.is_empty()
                    && t.dataset_id() == sample.dataset_id
                    && t.contains(sample.id) =>
            {
                t
            }
            _ => {
                log::debug!(
                    "Sample {} (dataset {}) not found in its timeline, using default vector",
                    sample.id,
                    sample.dataset_id
                );
                stats.default_vectors += 1;
                return self.finish(sample, default_values(sample), stats);
            }
        };

        let mut values = Vec::with_capacity(FEATURE_COUNT);
        values.extend_from_slice(&current_features(sample));

        let mut blocks = [WindowStats::fallback(sample); 3];
        let mut all_populated = true;

        for scale in WindowScale::ALL {
            let window = timeline.window(sample.timestamp, self.config.span(scale));
            match WindowStats::compute(window, self.config.min_window_samples) {
                Some(computed) => blocks[scale.position()] = computed,
                None => {
                    stats.fallback_windows += 1;
                    all_populated = false;
                }
            }
        }

        for block in &blocks {
            values.extend_from_slice(&block.to_array());
        }

        let ratios = if all_populated {
            cross_window_ratios(&blocks[0], &blocks[1], &blocks[2])
        } else {
            neutral_ratios()
        };
        values.extend_from_slice(&ratios);

        self.finish(sample, values, stats)
    }

    fn finish(
        &self,
        sample: &RawSample,
        mut values: Vec<f64>,
        stats: &mut ExtractionStats,
    ) -> FeatureVector {
        debug_assert_eq!(values.len(), FEATURE_COUNT);
        stats.sanitized_values += sanitize_features(&mut values, sample.id);
        FeatureVector(values)
    }
}

/// The five current-sample readings, missing channels as 0.
pub fn current_features(sample: &RawSample) -> [f64; CURRENT_FEATURE_COUNT] {
    [
        sample.l1(),
        sample.l2(),
        sample.w110(),
        sample.w220(),
        sample.total(),
    ]
}

fn default_values(sample: &RawSample) -> Vec<f64> {
    let fallback = WindowStats::fallback(sample).to_array();
    let mut values = Vec::with_capacity(FEATURE_COUNT);
    values.extend_from_slice(&current_features(sample));
    for _ in WindowScale::ALL {
        values.extend_from_slice(&fallback);
    }
    values.extend_from_slice(&neutral_ratios());
    values
}

/// Replace NaN/Inf values with 0, logging each replacement.
///
/// Returns the number of values replaced.
pub fn sanitize_features(values: &mut [f64], sample_id: SampleId) -> usize {
    let mut replaced = 0;
    for (idx, value) in values.iter_mut().enumerate() {
        if !value.is_finite() {
            let name = schema::FeatureSchema::window_features()
                .get_feature_by_index(idx)
                .map(|f| f.name.clone())
                .unwrap_or_else(|| format!("feature_{idx}"));
            log::warn!(
                "Sample {}: non-finite value {} in {} replaced with 0",
                sample_id,
                value,
                name
            );
            *value = 0.0;
            replaced += 1;
        }
    }
    replaced
}
