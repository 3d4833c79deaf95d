//! Train/validation/test partitioning.
//!
//! The pool is cut into **contiguous** index ranges:
//!
//! ```text
//! train      = pool[0 .. train_end]
//! validation = pool[train_end .. val_end]
//! test       = pool[val_end ..]
//!
//! train_end = floor(N × train_ratio)
//! val_end   = train_end + floor(N × validation_ratio)
//! ```
//!
//! Rounding remainders land in `test`. The splitter never reorders its
//! input and ignores the POSITIVE/UNLABELED labels: both classes are cut
//! together as one pool. A random split therefore requires shuffling the
//! pool first (see `PrepConfig::shuffle_before_split`).
//!
//! The ids placed in `test` are returned separately; they are the only
//! output meant to outlive the run, so a later evaluation job can re-fetch
//! exactly that holdout without re-deriving the split.

use crate::assembly::SamplePool;
use crate::error::{PrepError, Result};
use crate::sample::SampleId;
use serde::{Deserialize, Serialize};

/// Tolerance for "ratios already sum to 1".
pub const RATIO_SUM_TOLERANCE: f64 = 1e-6;

/// Absorbs float error in `N × ratio` before flooring (e.g. 55 × 0.6).
const FLOOR_EPSILON: f64 = 1e-9;

/// Split proportions. Fractions or percentages are both accepted; see
/// [`SplitConfig::normalized`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Share of the pool used for training
    #[serde(default = "default_train_ratio")]
    pub train_ratio: f64,

    /// Share of the pool used for validation
    #[serde(default = "default_validation_ratio")]
    pub validation_ratio: f64,

    /// Share of the pool held out for testing
    #[serde(default = "default_test_ratio")]
    pub test_ratio: f64,
}

fn default_train_ratio() -> f64 {
    0.7
}

fn default_validation_ratio() -> f64 {
    0.2
}

fn default_test_ratio() -> f64 {
    0.1
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_ratio: default_train_ratio(),
            validation_ratio: default_validation_ratio(),
            test_ratio: default_test_ratio(),
        }
    }
}

impl SplitConfig {
    /// Create a split configuration.
    pub fn new(train_ratio: f64, validation_ratio: f64, test_ratio: f64) -> Self {
        Self {
            train_ratio,
            validation_ratio,
            test_ratio,
        }
    }

    /// Sum of the three ratios.
    pub fn sum(&self) -> f64 {
        self.train_ratio + self.validation_ratio + self.test_ratio
    }

    /// Validate the ratios: finite, non-negative, not all zero.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let named = [
            ("train_ratio", self.train_ratio),
            ("validation_ratio", self.validation_ratio),
            ("test_ratio", self.test_ratio),
        ];
        for (name, value) in named {
            if !value.is_finite() {
                return Err(format!("{name} must be finite, got {value}"));
            }
            if value < 0.0 {
                return Err(format!("{name} must be >= 0, got {value}"));
            }
        }
        if self.sum() <= 0.0 {
            return Err("split ratios must not all be zero".to_string());
        }
        Ok(())
    }

    /// Ratios scaled to sum to 1.0.
    ///
    /// Ratios already summing to 1 (within [`RATIO_SUM_TOLERANCE`]) are
    /// returned unchanged; anything else (e.g. `70, 20, 10`) is divided by
    /// its sum.
    pub fn normalized(&self) -> Result<SplitConfig> {
        self.validate().map_err(PrepError::Validation)?;

        let sum = self.sum();
        if (sum - 1.0).abs() <= RATIO_SUM_TOLERANCE {
            return Ok(self.clone());
        }

        Ok(SplitConfig {
            train_ratio: self.train_ratio / sum,
            validation_ratio: self.validation_ratio / sum,
            test_ratio: self.test_ratio / sum,
        })
    }
}

/// Index boundaries of a split over `n` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitBoundaries {
    /// Pool size
    pub n: usize,
    /// End of train (exclusive)
    pub train_end: usize,
    /// End of validation (exclusive)
    pub val_end: usize,
}

impl SplitBoundaries {
    /// Compute boundaries for `n` entries from normalized ratios.
    pub fn compute(n: usize, normalized: &SplitConfig) -> Self {
        let floor = |ratio: f64| ((n as f64 * ratio) + FLOOR_EPSILON).floor() as usize;
        let train_end = floor(normalized.train_ratio).min(n);
        let val_end = (train_end + floor(normalized.validation_ratio)).min(n);
        Self {
            n,
            train_end,
            val_end,
        }
    }

    /// (train, validation, test) sizes.
    pub fn sizes(&self) -> (usize, usize, usize) {
        (
            self.train_end,
            self.val_end - self.train_end,
            self.n - self.val_end,
        )
    }
}

/// Three disjoint sub-pools plus the retained test ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitResult {
    /// Training pool
    pub train: SamplePool,

    /// Validation pool
    pub validation: SamplePool,

    /// Held-out test pool
    pub test: SamplePool,

    /// Ids in `test`, in pool order
    pub test_ids: Vec<SampleId>,

    /// Normalized ratios used for the split
    pub config: SplitConfig,
}

impl SplitResult {
    /// Total number of entries across the three pools.
    pub fn total_len(&self) -> usize {
        self.train.len() + self.validation.len() + self.test.len()
    }

    /// (train, validation, test) sizes.
    pub fn sizes(&self) -> (usize, usize, usize) {
        (self.train.len(), self.validation.len(), self.test.len())
    }
}

/// Cuts a [`SamplePool`] into contiguous train/validation/test ranges.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataSplitter;

impl DataSplitter {
    /// Create a splitter.
    pub fn new() -> Self {
        Self
    }

    /// Split `pool` according to `config` without reordering it.
    ///
    /// # Errors
    ///
    /// [`PrepError::Validation`] if a ratio is negative or non-finite, or all
    /// ratios are zero.
    pub fn split(&self, pool: SamplePool, config: &SplitConfig) -> Result<SplitResult> {
        let normalized = config.normalized()?;
        let bounds = SplitBoundaries::compute(pool.len(), &normalized);

        let mut train = pool.into_entries();
        let mut validation = train.split_off(bounds.train_end);
        let test = validation.split_off(bounds.val_end - bounds.train_end);

        let test_ids = test.iter().map(|e| e.id).collect();

        let result = SplitResult {
            train: SamplePool::from_entries(train),
            validation: SamplePool::from_entries(validation),
            test: SamplePool::from_entries(test),
            test_ids,
            config: normalized,
        };

        let (n_train, n_val, n_test) = result.sizes();
        log::info!(
            "Split {} entries: train={}, validation={}, test={}",
            bounds.n,
            n_train,
            n_val,
            n_test
        );

        Ok(result)
    }
}
