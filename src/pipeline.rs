//! Training data preparation pipeline
//!
//! Connects every stage between raw meter readings and the arrays handed to
//! a PU trainer:
//!
//! ```text
//! P rows ─┐                          ┌─ P features ─┐
//!         ├─ timelines per dataset ──┤              ├─ SampleSetAssembler ─ SamplePool
//! U rows ─┘                          └─ U features ─┘                           │
//!                                                       ClassPriorEstimator ◄───┤ (full pool)
//!                                                                               │
//!                                              shuffle (seeded, optional) ──────┤
//!                                                                               ▼
//!                                                       DataSplitter ─► train / validation / test
//! ```
//!
//! The prior is estimated on the full assembled pool, before the split, so
//! the split boundary cannot distort the class-balance statistics.
//!
//! Each call owns its inputs and outputs; a preparer holds only immutable
//! configuration and can be reused for any number of runs.
//!
//! # Example
//!
//! ```ignore
//! use pu_feature_prep::prelude::*;
//!
//! let preparer = TrainingDataPreparer::new(PrepConfig::default())?;
//! let prepared = preparer.prepare(&positives, &unlabeled)?;
//!
//! let (train, validation, test) = prepared.matrices();
//! let scaler = prepared.fit_scaler()?;   // train split only
//! store.save_test_ids("run-42", &prepared.split.test_ids)?;
//! ```
//!
//! # Output Structure
//!
//! | Field | Type | Description |
//! |-------|------|-------------|
//! | `split` | `SplitResult` | train / validation / test pools and test ids |
//! | `prior` | `PriorEstimate` | π, method, counts |
//! | `assembly` | `AssemblyReport` | overlap, duplicate and cap counters |
//! | `extraction` | `ExtractionStats` | fallback and sanitising counters |
//! | `seed` | `u64` | seed used for the run |

use crate::assembly::{AssemblyReport, SamplePool, SampleSetAssembler};
use crate::config::PrepConfig;
use crate::error::{PrepError, Result};
use crate::features::{ExtractionStats, WindowFeatureExtractor};
use crate::preprocessing::FeatureScaler;
use crate::prior::{ClassPriorEstimator, PriorEstimate};
use crate::sample::{build_timelines, RawSample, SampleId};
use crate::split::{DataSplitter, SplitResult};
use crate::validation::SampleValidator;
use ndarray::{Array1, Array2};

/// Mixed into the run seed for the pre-split shuffle so it draws a stream
/// independent of the oversampling draw.
const SHUFFLE_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Feature matrix, label vector and ids of one split.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitMatrices {
    /// `[N, 41]` features
    pub features: Array2<f64>,

    /// `[N]` labels, 1.0 POSITIVE and 0.0 UNLABELED
    pub labels: Array1<f64>,

    /// Sample id of each row
    pub ids: Vec<SampleId>,
}

impl SplitMatrices {
    /// Build the arrays of a pool, one row per entry in pool order.
    pub fn from_pool(pool: &SamplePool) -> Self {
        Self {
            features: pool.feature_matrix(),
            labels: pool.label_vector(),
            ids: pool.all_ids(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the split is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Output of one preparation run.
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Train / validation / test pools and the retained test ids
    pub split: SplitResult,

    /// Class prior estimated on the full pool
    pub prior: PriorEstimate,

    /// Assembly counters
    pub assembly: AssemblyReport,

    /// Extraction counters over both pools
    pub extraction: ExtractionStats,

    /// Seed used for the oversampling draw and the shuffle
    pub seed: u64,
}

impl PreparedData {
    /// Ids of the held-out test split.
    pub fn test_ids(&self) -> &[SampleId] {
        &self.split.test_ids
    }

    /// Arrays for (train, validation, test).
    pub fn matrices(&self) -> (SplitMatrices, SplitMatrices, SplitMatrices) {
        (
            SplitMatrices::from_pool(&self.split.train),
            SplitMatrices::from_pool(&self.split.validation),
            SplitMatrices::from_pool(&self.split.test),
        )
    }

    /// Fit a standard scaler on the training split only.
    ///
    /// # Errors
    ///
    /// [`PrepError::Validation`] if the training split is empty.
    pub fn fit_scaler(&self) -> Result<FeatureScaler> {
        let mut scaler = FeatureScaler::new();
        scaler.fit(self.split.train.entries().iter().map(|e| e.features.as_slice()))?;
        Ok(scaler)
    }

    /// Split the output into the two values the trainer consumes.
    pub fn into_parts(self) -> (SplitResult, PriorEstimate) {
        (self.split, self.prior)
    }
}

/// Runs extraction, assembly, prior estimation and the split in order.
#[derive(Debug, Clone)]
pub struct TrainingDataPreparer {
    config: PrepConfig,
    extractor: WindowFeatureExtractor,
    assembler: SampleSetAssembler,
    estimator: ClassPriorEstimator,
    splitter: DataSplitter,
    validator: SampleValidator,
}

impl TrainingDataPreparer {
    /// Create a preparer from a validated configuration.
    ///
    /// # Errors
    ///
    /// [`PrepError::Validation`] if any section of `config` is invalid.
    pub fn new(config: PrepConfig) -> Result<Self> {
        config.validate().map_err(PrepError::Validation)?;

        Ok(Self {
            extractor: WindowFeatureExtractor::new(config.windows.clone()),
            assembler: SampleSetAssembler::new(config.assembly.clone()),
            estimator: ClassPriorEstimator::new(config.prior.clone()),
            splitter: DataSplitter::new(),
            validator: SampleValidator::new(),
            config,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &PrepConfig {
        &self.config
    }

    /// Prepare a run with the configured seed.
    pub fn prepare(&self, p_raw: &[RawSample], u_raw: &[RawSample]) -> Result<PreparedData> {
        self.prepare_with_seed(p_raw, u_raw, self.config.seed)
    }

    /// Prepare a run with an explicit seed.
    ///
    /// Data-quality findings are logged, never fatal. Feature extraction
    /// never fails; pool-level problems are returned as errors.
    ///
    /// # Errors
    ///
    /// - [`PrepError::InsufficientPositiveSamples`] if `p_raw` is empty
    /// - [`PrepError::InsufficientUnlabeledSamples`] if U is empty after overlap removal
    /// - [`PrepError::PriorEstimation`] with fewer than two positives
    /// - [`PrepError::Validation`] for unusable split ratios
    pub fn prepare_with_seed(
        &self,
        p_raw: &[RawSample],
        u_raw: &[RawSample],
        seed: u64,
    ) -> Result<PreparedData> {
        log::info!(
            "Preparing PU training data: {} positive rows, {} unlabeled rows, seed {}",
            p_raw.len(),
            u_raw.len(),
            seed
        );

        for (name, rows) in [("positive", p_raw), ("unlabeled", u_raw)] {
            let report = self.validator.validate(rows);
            if !report.is_valid() {
                log::warn!("Data-quality findings in {name} pool:");
                report.log_findings();
            }
        }

        // Both pools share one timeline per dataset so windows see every
        // reading of the dataset, whatever its label.
        let timelines = build_timelines([p_raw, u_raw]);

        let (p_features, p_stats) = self.extractor.extract_batch(p_raw, &timelines);
        let (u_features, u_stats) = self.extractor.extract_batch(u_raw, &timelines);
        let mut extraction = p_stats;
        extraction.merge(&u_stats);

        let (pool, assembly) = self
            .assembler
            .assemble_with_report(p_features, u_features, seed)?;

        let prior = self.estimator.estimate(&pool)?;

        let pool = if self.config.shuffle_before_split {
            pool.shuffled(seed ^ SHUFFLE_SEED_SALT)
        } else {
            pool
        };

        let split = self.splitter.split(pool, &self.config.split)?;

        log::info!(
            "Prepared pool of {} ({} P / {} U), prior {:.4} ({}), test ids retained: {}",
            split.total_len(),
            assembly.positives,
            assembly.unlabeled,
            prior.value,
            prior.method,
            split.test_ids.len()
        );

        Ok(PreparedData {
            split,
            prior,
            assembly,
            extraction,
            seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::SampleLabel;
    use crate::schema::FEATURE_COUNT;
    use crate::split::SplitConfig;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::HashSet;

    fn rows(ids: std::ops::Range<u64>, positive: bool) -> Vec<RawSample> {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        ids.map(|id| {
            let base = if positive { 900.0 } else { 300.0 };
            let total = base + (id % 7) as f64 * 10.0;
            RawSample::new(
                id,
                1,
                start + Duration::minutes(id as i64 * 5),
                total * 0.6,
                total * 0.4,
                total * 0.3,
                total * 0.7,
                total,
                positive,
            )
        })
        .collect()
    }

    #[test]
    fn test_prepare_counts_and_matrices() {
        let preparer = TrainingDataPreparer::new(
            PrepConfig::default().with_split(SplitConfig::new(0.6, 0.25, 0.15)),
        )
        .unwrap();
        let prepared = preparer
            .prepare_with_seed(&rows(0..5, true), &rows(100..160, false), 7)
            .unwrap();

        assert_eq!(prepared.assembly.unlabeled, 50);
        assert_eq!(prepared.split.sizes(), (33, 13, 9));
        assert_eq!(prepared.prior.n_positive, 5);
        assert_eq!(prepared.prior.n_unlabeled, 50);

        let (train, validation, test) = prepared.matrices();
        assert_eq!(train.features.dim(), (33, FEATURE_COUNT));
        assert_eq!(validation.len(), 13);
        assert_eq!(test.ids, prepared.test_ids());
        assert_eq!(
            train.labels.iter().filter(|&&l| l == 1.0).count(),
            prepared.split.train.with_label(SampleLabel::Positive).count()
        );
    }

    #[test]
    fn test_without_shuffle_positives_lead() {
        let preparer =
            TrainingDataPreparer::new(PrepConfig::default().with_shuffle_before_split(false))
                .unwrap();
        let prepared = preparer
            .prepare(&rows(0..4, true), &rows(10..30, false))
            .unwrap();

        let first: Vec<_> = prepared.split.train.entries()[..4]
            .iter()
            .map(|e| e.label)
            .collect();
        assert!(first.iter().all(|l| l.is_positive()));
    }

    #[test]
    fn test_same_seed_same_test_ids() {
        let preparer = TrainingDataPreparer::new(PrepConfig::default()).unwrap();
        let p = rows(0..3, true);
        let u = rows(100..400, false);

        let a = preparer.prepare(&p, &u).unwrap();
        let b = preparer.prepare(&p, &u).unwrap();
        assert_eq!(a.test_ids(), b.test_ids());
        assert_eq!(a.prior, b.prior);
    }

    #[test]
    fn test_splits_disjoint_and_complete() {
        let preparer = TrainingDataPreparer::new(PrepConfig::default()).unwrap();
        let prepared = preparer
            .prepare(&rows(0..6, true), &rows(50..90, false))
            .unwrap();

        let mut seen = HashSet::new();
        for pool in [
            &prepared.split.train,
            &prepared.split.validation,
            &prepared.split.test,
        ] {
            for id in pool.all_ids() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 46);
    }

    #[test]
    fn test_fit_scaler_uses_train_only() {
        let preparer = TrainingDataPreparer::new(PrepConfig::default()).unwrap();
        let prepared = preparer
            .prepare(&rows(0..4, true), &rows(10..40, false))
            .unwrap();

        let scaler = prepared.fit_scaler().unwrap();
        assert_eq!(scaler.n_samples(), prepared.split.train.len());
        assert_eq!(scaler.feature_count(), FEATURE_COUNT);
    }

    #[test]
    fn test_errors_propagate() {
        let preparer = TrainingDataPreparer::new(PrepConfig::default()).unwrap();

        assert!(matches!(
            preparer.prepare(&[], &rows(0..10, false)),
            Err(PrepError::InsufficientPositiveSamples)
        ));
        assert!(matches!(
            preparer.prepare(&rows(0..1, true), &rows(10..20, false)),
            Err(PrepError::PriorEstimation(_))
        ));

        let p = rows(0..3, true);
        assert!(matches!(
            preparer.prepare(&p, &p),
            Err(PrepError::InsufficientUnlabeledSamples { dropped_overlap: 3 })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PrepConfig::default().with_split(SplitConfig::new(0.0, 0.0, 0.0));
        assert!(matches!(
            TrainingDataPreparer::new(config),
            Err(PrepError::Validation(_))
        ));
    }
}
