//! Preparation configuration management.
//!
//! One typed struct replaces the loosely-typed settings payloads of a
//! training job: window sizes, split ratios, oversampling bound, prior
//! method and the seed. It serializes to TOML or JSON so a run can be
//! reproduced from a versioned file.
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `windows.short_window_minutes` | 30 |
//! | `windows.medium_window_minutes` | 60 |
//! | `windows.long_window_minutes` | 240 |
//! | `split.train_ratio` | 0.7 |
//! | `split.validation_ratio` | 0.2 |
//! | `split.test_ratio` | 0.1 |
//! | `assembly.max_unlabeled_per_positive` | 10 |
//! | `prior.method` | median |
//! | `seed` | 42 |
//! | `shuffle_before_split` | true |
//!
//! # Example
//!
//! ```ignore
//! use pu_feature_prep::config::PrepConfig;
//!
//! let config = PrepConfig::default();
//! config.save_toml("experiment.toml")?;
//! let loaded = PrepConfig::load_toml("experiment.toml")?;
//! ```

use crate::assembly::AssemblyConfig;
use crate::error::{PrepError, Result};
use crate::features::WindowConfig;
use crate::prior::PriorConfig;
use crate::split::SplitConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default seed for the oversampling draw and the pre-split shuffle.
pub const DEFAULT_SEED: u64 = 42;

/// Unified preparation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepConfig {
    /// Window feature extraction
    #[serde(default)]
    pub windows: WindowConfig,

    /// Train/validation/test ratios
    #[serde(default)]
    pub split: SplitConfig,

    /// P/U pool assembly
    #[serde(default)]
    pub assembly: AssemblyConfig,

    /// Class-prior estimation
    #[serde(default)]
    pub prior: PriorConfig,

    /// Seed for every random step of a run
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Shuffle the assembled pool (seeded) before the contiguous split.
    ///
    /// With `false` the split follows pool order (positives first, then
    /// unlabeled in input order), which leaks time order across splits.
    #[serde(default = "default_shuffle_before_split")]
    pub shuffle_before_split: bool,

    /// Run metadata (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RunMetadata>,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_shuffle_before_split() -> bool {
    true
}

/// Run metadata for tracking and reproducibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Run or experiment name
    pub name: String,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Custom tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            windows: WindowConfig::default(),
            split: SplitConfig::default(),
            assembly: AssemblyConfig::default(),
            prior: PriorConfig::default(),
            seed: DEFAULT_SEED,
            shuffle_before_split: true,
            metadata: None,
        }
    }
}

impl PrepConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set window configuration.
    pub fn with_windows(mut self, windows: WindowConfig) -> Self {
        self.windows = windows;
        self
    }

    /// Set split ratios.
    pub fn with_split(mut self, split: SplitConfig) -> Self {
        self.split = split;
        self
    }

    /// Set assembly configuration.
    pub fn with_assembly(mut self, assembly: AssemblyConfig) -> Self {
        self.assembly = assembly;
        self
    }

    /// Set prior configuration.
    pub fn with_prior(mut self, prior: PriorConfig) -> Self {
        self.prior = prior;
        self
    }

    /// Set the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable or disable the pre-split shuffle.
    pub fn with_shuffle_before_split(mut self, enabled: bool) -> Self {
        self.shuffle_before_split = enabled;
        self
    }

    /// Set run metadata.
    pub fn with_metadata(mut self, metadata: RunMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Validate every section.
    ///
    /// Returns Ok(()) if valid, Err(msg) otherwise.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.windows.validate()?;
        self.split.validate()?;
        self.assembly.validate()?;
        self.prior.validate()?;
        Ok(())
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load and validate configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: PrepConfig = toml::from_str(&contents)?;
        config.validate().map_err(PrepError::Validation)?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Load and validate configuration from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: PrepConfig = serde_json::from_str(&contents)?;
        config.validate().map_err(PrepError::Validation)?;
        Ok(config)
    }
}
