//! Raw sample validation
//!
//! Data-quality checks run on raw readings before feature extraction. They
//! report problems; they do not repair or drop anything. Extraction already
//! absorbs missing channels and sparse windows, so apart from duplicate ids
//! every finding is a warning.
//!
//! # Checks
//!
//! 1. **Duplicate ids**: the same sample id appears twice (error)
//! 2. **Missing channels**: a reading has no value for one of the five channels
//! 3. **Non-finite readings**: NaN or infinite channel values
//! 4. **Channel consistency**: `|total - (110V + 220V)|` above a tolerance
//! 5. **Timestamp ordering**: a dataset's rows are not in time order
//!
//! # Usage
//!
//! ```ignore
//! use pu_feature_prep::validation::validate_samples;
//!
//! let result = validate_samples(&samples);
//! if result.has_warnings() {
//!     for warning in result.warnings() {
//!         log::warn!("{warning}");
//!     }
//! }
//! ```

use crate::sample::{DatasetId, RawSample, SampleId};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Default tolerance, in watts, for `total ≈ 110V + 220V`.
pub const DEFAULT_CHANNEL_TOLERANCE_WATTS: f64 = 1.0;

/// Validation result for a single check.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    /// Data is valid
    Valid,
    /// Data has minor issues (warnings)
    Warning(String),
    /// Data has serious issues (errors)
    Error(String),
}

impl ValidationLevel {
    /// Check if this result indicates valid data.
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationLevel::Valid)
    }

    /// Check if this result is a warning.
    pub fn is_warning(&self) -> bool {
        matches!(self, ValidationLevel::Warning(_))
    }

    /// Check if this result is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, ValidationLevel::Error(_))
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationLevel::Valid => write!(f, "Valid"),
            ValidationLevel::Warning(msg) => write!(f, "Warning: {msg}"),
            ValidationLevel::Error(msg) => write!(f, "Error: {msg}"),
        }
    }
}

/// Aggregated validation result.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    results: Vec<(String, ValidationLevel)>,
}

impl ValidationResult {
    /// Create a new empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation result.
    pub fn add(&mut self, check_name: &str, level: ValidationLevel) {
        self.results.push((check_name.to_string(), level));
    }

    /// Check if all validations passed (no errors or warnings).
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|(_, level)| level.is_valid())
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_error())
    }

    /// Check if there are any warnings.
    pub fn has_warnings(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_warning())
    }

    /// All warnings as `check: message`.
    pub fn warnings(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Warning(msg) => Some(format!("{name}: {msg}")),
                _ => None,
            })
            .collect()
    }

    /// All errors as `check: message`.
    pub fn errors(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Error(msg) => Some(format!("{name}: {msg}")),
                _ => None,
            })
            .collect()
    }

    /// Get all results.
    pub fn all_results(&self) -> &[(String, ValidationLevel)] {
        &self.results
    }

    /// Get the number of checks performed.
    pub fn check_count(&self) -> usize {
        self.results.len()
    }

    /// Get the number of passed checks.
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|(_, l)| l.is_valid()).count()
    }

    /// Emit every non-valid finding through `log`.
    pub fn log_findings(&self) {
        for (name, level) in &self.results {
            match level {
                ValidationLevel::Valid => {}
                ValidationLevel::Warning(msg) => log::warn!("{name}: {msg}"),
                ValidationLevel::Error(msg) => log::error!("{name}: {msg}"),
            }
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let passed = self.passed_count();
        let total = self.check_count();
        writeln!(f, "Validation: {passed}/{total} checks passed")?;

        for (name, level) in &self.results {
            if !level.is_valid() {
                writeln!(f, "  - {name}: {level}")?;
            }
        }

        Ok(())
    }
}

/// Configuration for sample validation.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Allowed gap between total and 110V + 220V, in watts
    pub channel_tolerance_watts: f64,

    /// Check for missing channels
    pub check_missing_channels: bool,

    /// Check total against the sum of voltage channels
    pub check_channel_consistency: bool,

    /// Check per-dataset timestamp ordering
    pub check_timestamp_ordering: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            channel_tolerance_watts: DEFAULT_CHANNEL_TOLERANCE_WATTS,
            check_missing_channels: true,
            check_channel_consistency: true,
            check_timestamp_ordering: true,
        }
    }
}

/// Data-quality validator for raw readings.
#[derive(Debug, Clone, Default)]
pub struct SampleValidator {
    config: ValidationConfig,
}

impl SampleValidator {
    /// Create a validator with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator with custom configuration.
    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a batch of readings (any mix of datasets).
    pub fn validate(&self, samples: &[RawSample]) -> ValidationResult {
        let mut result = ValidationResult::new();

        self.validate_unique_ids(samples, &mut result);
        self.validate_finite(samples, &mut result);

        if self.config.check_missing_channels {
            self.validate_missing_channels(samples, &mut result);
        }

        if self.config.check_channel_consistency {
            self.validate_channel_consistency(samples, &mut result);
        }

        if self.config.check_timestamp_ordering {
            self.validate_timestamp_ordering(samples, &mut result);
        }

        result
    }

    fn validate_unique_ids(&self, samples: &[RawSample], result: &mut ValidationResult) {
        let mut seen: HashSet<SampleId> = HashSet::with_capacity(samples.len());
        let duplicates: Vec<SampleId> = samples
            .iter()
            .filter(|s| !seen.insert(s.id))
            .map(|s| s.id)
            .collect();

        if duplicates.is_empty() {
            result.add("unique_ids", ValidationLevel::Valid);
        } else {
            result.add(
                "unique_ids",
                ValidationLevel::Error(format!(
                    "{} duplicate sample ids (first: {})",
                    duplicates.len(),
                    duplicates[0]
                )),
            );
        }
    }

    fn validate_finite(&self, samples: &[RawSample], result: &mut ValidationResult) {
        let bad: Vec<SampleId> = samples
            .iter()
            .filter(|s| {
                [
                    s.raw_wattage_l1,
                    s.raw_wattage_l2,
                    s.wattage_110v,
                    s.wattage_220v,
                    s.wattage_total,
                ]
                .iter()
                .flatten()
                .any(|v| !v.is_finite())
            })
            .map(|s| s.id)
            .collect();

        if bad.is_empty() {
            result.add("finite_readings", ValidationLevel::Valid);
        } else {
            result.add(
                "finite_readings",
                ValidationLevel::Warning(format!(
                    "{} samples with NaN/Inf readings (first: {})",
                    bad.len(),
                    bad[0]
                )),
            );
        }
    }

    fn validate_missing_channels(&self, samples: &[RawSample], result: &mut ValidationResult) {
        let incomplete = samples
            .iter()
            .filter(|s| s.missing_channel_count() > 0)
            .count();

        if incomplete == 0 {
            result.add("missing_channels", ValidationLevel::Valid);
        } else {
            result.add(
                "missing_channels",
                ValidationLevel::Warning(format!(
                    "{incomplete} samples with missing channels (read as 0)"
                )),
            );
        }
    }

    fn validate_channel_consistency(&self, samples: &[RawSample], result: &mut ValidationResult) {
        let tolerance = self.config.channel_tolerance_watts;
        let mut inconsistent = 0usize;
        let mut max_gap = 0.0f64;

        for sample in samples {
            let (Some(total), Some(w110), Some(w220)) =
                (sample.wattage_total, sample.wattage_110v, sample.wattage_220v)
            else {
                continue;
            };
            let gap = (total - (w110 + w220)).abs();
            if gap > tolerance {
                inconsistent += 1;
                max_gap = max_gap.max(gap);
            }
        }

        if inconsistent == 0 {
            result.add("channel_consistency", ValidationLevel::Valid);
        } else {
            result.add(
                "channel_consistency",
                ValidationLevel::Warning(format!(
                    "{inconsistent} samples where total differs from 110V+220V by more than {tolerance} W (max gap {max_gap:.2} W)"
                )),
            );
        }
    }

    fn validate_timestamp_ordering(&self, samples: &[RawSample], result: &mut ValidationResult) {
        let mut last_seen: BTreeMap<DatasetId, &RawSample> = BTreeMap::new();
        let mut unordered: BTreeMap<DatasetId, usize> = BTreeMap::new();

        for sample in samples {
            if let Some(prev) = last_seen.get(&sample.dataset_id) {
                if sample.timestamp < prev.timestamp {
                    *unordered.entry(sample.dataset_id).or_insert(0) += 1;
                }
            }
            last_seen.insert(sample.dataset_id, sample);
        }

        if unordered.is_empty() {
            result.add("timestamp_ordering", ValidationLevel::Valid);
        } else {
            for (dataset_id, count) in unordered {
                result.add(
                    &format!("timestamp_ordering_{dataset_id}"),
                    ValidationLevel::Warning(format!(
                        "dataset {dataset_id}: {count} out-of-order readings (re-sorted before extraction)"
                    )),
                );
            }
        }
    }
}

/// Validate readings with the default configuration.
pub fn validate_samples(samples: &[RawSample]) -> ValidationResult {
    SampleValidator::new().validate(samples)
}
