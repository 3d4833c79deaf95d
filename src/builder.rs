//! Fluent builder for preparer configuration.
//!
//! # Quick Start
//!
//! ```ignore
//! use pu_feature_prep::PreparerBuilder;
//!
//! // Defaults: 30/60/240 min windows, 70/20/10 split, median prior, seed 42
//! let preparer = PreparerBuilder::new().build()?;
//! let prepared = preparer.prepare(&positives, &unlabeled)?;
//! ```
//!
//! # Common Configurations
//!
//! ```ignore
//! let preparer = PreparerBuilder::new()
//!     .windows(15, 60, 360)
//!     .split_ratios(60.0, 25.0, 15.0)   // percentages are normalised
//!     .prior_method(PriorMethod::Mean)
//!     .seed(7)
//!     .build()?;
//! ```

use crate::config::{PrepConfig, RunMetadata};
use crate::error::{PrepError, Result};
use crate::pipeline::TrainingDataPreparer;
use crate::prior::PriorMethod;
use crate::split::SplitConfig;

/// Fluent builder for [`TrainingDataPreparer`].
///
/// Every setter overrides one field of a default [`PrepConfig`];
/// the configuration is validated on `build`.
#[derive(Debug, Clone, Default)]
pub struct PreparerBuilder {
    config: PrepConfig,
}

impl PreparerBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: PrepConfig) -> Self {
        Self { config }
    }

    /// Short, medium and long window sizes in minutes.
    pub fn windows(mut self, short: u32, medium: u32, long: u32) -> Self {
        self.config.windows = self.config.windows.with_windows(short, medium, long);
        self
    }

    /// Minimum readings for a window to be summarised instead of falling back.
    pub fn min_window_samples(mut self, count: usize) -> Self {
        self.config.windows.min_window_samples = count;
        self
    }

    /// Train/validation/test ratios (fractions or percentages).
    pub fn split_ratios(mut self, train: f64, validation: f64, test: f64) -> Self {
        self.config.split = SplitConfig::new(train, validation, test);
        self
    }

    /// Seed for the oversampling draw and the pre-split shuffle.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Reduction of the density ratios.
    pub fn prior_method(mut self, method: PriorMethod) -> Self {
        self.config.prior.method = method;
        self
    }

    /// Clip band of the reported prior.
    pub fn prior_clip(mut self, min: f64, max: f64) -> Self {
        self.config.prior.clip_min = min;
        self.config.prior.clip_max = max;
        self
    }

    /// Shuffle the assembled pool before the contiguous split.
    pub fn shuffle_before_split(mut self, enabled: bool) -> Self {
        self.config.shuffle_before_split = enabled;
        self
    }

    /// Upper bound of unlabeled entries per positive.
    pub fn max_unlabeled_per_positive(mut self, ratio: usize) -> Self {
        self.config.assembly.max_unlabeled_per_positive = ratio;
        self
    }

    /// Name and describe the run.
    pub fn run(mut self, name: &str, description: &str) -> Self {
        self.config.metadata = Some(RunMetadata {
            name: name.to_string(),
            description: Some(description.to_string()),
            tags: Vec::new(),
        });
        self
    }

    /// Set run metadata with full control.
    pub fn with_metadata(mut self, metadata: RunMetadata) -> Self {
        self.config.metadata = Some(metadata);
        self
    }

    /// Validate and return the configuration.
    pub fn build_config(self) -> std::result::Result<PrepConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Validate the configuration and create a preparer.
    pub fn build(self) -> Result<TrainingDataPreparer> {
        let config = self.build_config().map_err(PrepError::Validation)?;
        TrainingDataPreparer::new(config)
    }

    /// Human-readable summary of the current configuration.
    pub fn summary(&self) -> String {
        let c = &self.config;
        format!(
            "PreparerBuilder Summary:\n\
             - Windows: {}/{}/{} min (min {} readings)\n\
             - Split: {}/{}/{}\n\
             - Unlabeled cap: {}x positives\n\
             - Prior: {} clipped to [{}, {}]\n\
             - Seed: {} (shuffle before split: {})",
            c.windows.short_window_minutes,
            c.windows.medium_window_minutes,
            c.windows.long_window_minutes,
            c.windows.min_window_samples,
            c.split.train_ratio,
            c.split.validation_ratio,
            c.split.test_ratio,
            c.assembly.max_unlabeled_per_positive,
            c.prior.method,
            c.prior.clip_min,
            c.prior.clip_max,
            c.seed,
            c.shuffle_before_split,
        )
    }
}
