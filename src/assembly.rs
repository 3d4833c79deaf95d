//! P/U pool assembly.
//!
//! Merges a pool of confirmed positives (P) and a pool of unlabeled
//! readings (U), possibly spanning several datasets, into one [`SamplePool`]:
//!
//! 1. **Overlap removal** - any U entry whose id is also in P is dropped, so
//!    no id is ever both POSITIVE and UNLABELED.
//! 2. **Oversampling cap** - if U still holds more than
//!    `max_unlabeled_per_positive × |P|` entries, a seeded uniform subset of
//!    exactly that size is kept. The same seed always keeps the same subset.
//! 3. **Tagging** - P entries become POSITIVE, U entries UNLABELED.
//!
//! # Example
//!
//! ```ignore
//! use pu_feature_prep::assembly::{AssemblyConfig, SampleSetAssembler};
//!
//! let assembler = SampleSetAssembler::new(AssemblyConfig::default());
//! let pool = assembler.assemble(p_pool, u_pool, 42)?;
//! assert!(pool.unlabeled_count() <= 10 * pool.positive_count());
//! ```

use crate::error::{PrepError, Result};
use crate::features::{ExtractedSample, FeatureVector};
use crate::sample::{DatasetId, SampleId};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;

/// PU label of a pool entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleLabel {
    /// Confirmed anomaly
    Positive,
    /// Unknown status (hidden positives mixed with negatives)
    Unlabeled,
}

impl SampleLabel {
    /// Numeric label handed to the trainer: 1.0 positive, 0.0 unlabeled.
    pub fn as_f64(self) -> f64 {
        match self {
            SampleLabel::Positive => 1.0,
            SampleLabel::Unlabeled => 0.0,
        }
    }

    /// Whether this is the positive label.
    pub fn is_positive(self) -> bool {
        matches!(self, SampleLabel::Positive)
    }
}

/// One entry of an assembled pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolEntry {
    /// Sample identifier
    pub id: SampleId,

    /// Owning dataset
    pub dataset_id: DatasetId,

    /// Reading time
    pub timestamp: DateTime<Utc>,

    /// Extracted features
    pub features: FeatureVector,

    /// PU label
    pub label: SampleLabel,
}

impl PoolEntry {
    /// Label an extracted sample.
    pub fn new(sample: ExtractedSample, label: SampleLabel) -> Self {
        Self {
            id: sample.id,
            dataset_id: sample.dataset_id,
            timestamp: sample.timestamp,
            features: sample.features,
            label,
        }
    }
}

/// Ordered collection of labelled feature vectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplePool {
    entries: Vec<PoolEntry>,
}

impl SamplePool {
    /// Wrap entries as a pool (order is kept as given).
    pub fn from_entries(entries: Vec<PoolEntry>) -> Self {
        Self { entries }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in pool order.
    pub fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }

    /// Consume the pool, returning its entries.
    pub fn into_entries(self) -> Vec<PoolEntry> {
        self.entries
    }

    /// Iterate over entries with a given label.
    pub fn with_label(&self, label: SampleLabel) -> impl Iterator<Item = &PoolEntry> {
        self.entries.iter().filter(move |e| e.label == label)
    }

    /// Number of POSITIVE entries.
    pub fn positive_count(&self) -> usize {
        self.with_label(SampleLabel::Positive).count()
    }

    /// Number of UNLABELED entries.
    pub fn unlabeled_count(&self) -> usize {
        self.with_label(SampleLabel::Unlabeled).count()
    }

    /// Ids carrying a given label.
    pub fn ids(&self, label: SampleLabel) -> HashSet<SampleId> {
        self.with_label(label).map(|e| e.id).collect()
    }

    /// Ids of every entry, in pool order.
    pub fn all_ids(&self) -> Vec<SampleId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Contiguous sub-pool `[range.start, range.end)`.
    pub fn slice(&self, range: Range<usize>) -> SamplePool {
        SamplePool {
            entries: self.entries[range].to_vec(),
        }
    }

    /// Reorder the pool with a seeded shuffle.
    pub fn shuffled(mut self, seed: u64) -> SamplePool {
        let mut rng = StdRng::seed_from_u64(seed);
        self.entries.shuffle(&mut rng);
        self
    }

    /// Feature matrix `[N, 41]` in pool order.
    pub fn feature_matrix(&self) -> Array2<f64> {
        let n_features = crate::schema::FEATURE_COUNT;
        let mut matrix = Array2::zeros((self.entries.len(), n_features));
        for (mut row, entry) in matrix.outer_iter_mut().zip(&self.entries) {
            for (dst, &src) in row.iter_mut().zip(entry.features.iter()) {
                *dst = src;
            }
        }
        matrix
    }

    /// Label vector `[N]` parallel to [`SamplePool::feature_matrix`].
    pub fn label_vector(&self) -> Array1<f64> {
        self.entries.iter().map(|e| e.label.as_f64()).collect()
    }
}

/// Assembly configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Upper bound of |U| / |P| after assembly
    #[serde(default = "default_max_unlabeled_per_positive")]
    pub max_unlabeled_per_positive: usize,
}

fn default_max_unlabeled_per_positive() -> usize {
    10
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            max_unlabeled_per_positive: default_max_unlabeled_per_positive(),
        }
    }
}

impl AssemblyConfig {
    /// Validate the assembly configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_unlabeled_per_positive == 0 {
            return Err("max_unlabeled_per_positive must be > 0".to_string());
        }
        Ok(())
    }
}

/// What happened during one assembly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyReport {
    /// POSITIVE entries in the pool
    pub positives: usize,

    /// U entries received
    pub unlabeled_raw: usize,

    /// U entries dropped because P holds the same id
    pub dropped_overlap: usize,

    /// Entries dropped because their id repeated within the same pool
    pub dropped_duplicates: usize,

    /// U entries dropped by the oversampling cap
    pub dropped_by_cap: usize,

    /// UNLABELED entries in the pool
    pub unlabeled: usize,
}

impl AssemblyReport {
    /// Whether the oversampling cap removed any U entry.
    pub fn cap_applied(&self) -> bool {
        self.dropped_by_cap > 0
    }
}

/// Merges P and U pools into a de-duplicated, ratio-bounded [`SamplePool`].
#[derive(Debug, Clone, Default)]
pub struct SampleSetAssembler {
    config: AssemblyConfig,
}

impl SampleSetAssembler {
    /// Create an assembler.
    pub fn new(config: AssemblyConfig) -> Self {
        Self { config }
    }

    /// Assembly configuration.
    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Assemble P and U into one pool.
    ///
    /// # Errors
    ///
    /// - [`PrepError::InsufficientPositiveSamples`] if P is empty
    /// - [`PrepError::InsufficientUnlabeledSamples`] if U is empty once P ids are removed
    pub fn assemble(
        &self,
        p_pool: Vec<ExtractedSample>,
        u_pool: Vec<ExtractedSample>,
        seed: u64,
    ) -> Result<SamplePool> {
        self.assemble_with_report(p_pool, u_pool, seed)
            .map(|(pool, _)| pool)
    }

    /// Same as [`SampleSetAssembler::assemble`], also returning counters.
    pub fn assemble_with_report(
        &self,
        p_pool: Vec<ExtractedSample>,
        u_pool: Vec<ExtractedSample>,
        seed: u64,
    ) -> Result<(SamplePool, AssemblyReport)> {
        if p_pool.is_empty() {
            return Err(PrepError::InsufficientPositiveSamples);
        }

        let mut report = AssemblyReport {
            unlabeled_raw: u_pool.len(),
            ..Default::default()
        };

        let (positives, dup_p) = dedup_by_id(p_pool);
        let p_ids: HashSet<SampleId> = positives.iter().map(|s| s.id).collect();

        let before_overlap = u_pool.len();
        let u_pool: Vec<ExtractedSample> = u_pool
            .into_iter()
            .filter(|s| !p_ids.contains(&s.id))
            .collect();
        report.dropped_overlap = before_overlap - u_pool.len();

        if report.dropped_overlap > 0 {
            log::warn!(
                "Dropped {} unlabeled samples whose id is also a confirmed positive",
                report.dropped_overlap
            );
        }

        let (unlabeled, dup_u) = dedup_by_id(u_pool);
        report.dropped_duplicates = dup_p + dup_u;
        if report.dropped_duplicates > 0 {
            log::warn!(
                "Dropped {} repeated ids within the P/U pools",
                report.dropped_duplicates
            );
        }

        if unlabeled.is_empty() {
            return Err(PrepError::InsufficientUnlabeledSamples {
                dropped_overlap: report.dropped_overlap,
            });
        }

        let cap = self
            .config
            .max_unlabeled_per_positive
            .saturating_mul(positives.len());
        let unlabeled = if unlabeled.len() > cap {
            report.dropped_by_cap = unlabeled.len() - cap;
            log::info!(
                "Unlabeled pool ({}) exceeds {}x positives ({}); drawing {} with seed {}",
                unlabeled.len(),
                self.config.max_unlabeled_per_positive,
                positives.len(),
                cap,
                seed
            );
            seeded_subset(unlabeled, cap, seed)
        } else {
            unlabeled
        };

        report.positives = positives.len();
        report.unlabeled = unlabeled.len();

        let mut entries = Vec::with_capacity(report.positives + report.unlabeled);
        entries.extend(
            positives
                .into_iter()
                .map(|s| PoolEntry::new(s, SampleLabel::Positive)),
        );
        entries.extend(
            unlabeled
                .into_iter()
                .map(|s| PoolEntry::new(s, SampleLabel::Unlabeled)),
        );

        log::info!(
            "Assembled pool: {} positive, {} unlabeled",
            report.positives,
            report.unlabeled
        );

        Ok((SamplePool { entries }, report))
    }
}

/// Keep the first occurrence of each id; returns the number dropped.
fn dedup_by_id(samples: Vec<ExtractedSample>) -> (Vec<ExtractedSample>, usize) {
    let mut seen = HashSet::with_capacity(samples.len());
    let before = samples.len();
    let kept: Vec<_> = samples.into_iter().filter(|s| seen.insert(s.id)).collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

/// Uniform subset of exactly `amount` samples, in their original order.
fn seeded_subset(samples: Vec<ExtractedSample>, amount: usize, seed: u64) -> Vec<ExtractedSample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut keep = vec![false; samples.len()];
    for idx in rand::seq::index::sample(&mut rng, samples.len(), amount) {
        keep[idx] = true;
    }
    samples
        .into_iter()
        .zip(keep)
        .filter_map(|(s, k)| k.then_some(s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FEATURE_COUNT;
    use chrono::TimeZone;

    fn extracted(id: SampleId) -> ExtractedSample {
        ExtractedSample {
            id,
            dataset_id: 1,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            features: FeatureVector::try_from_vec(vec![id as f64; FEATURE_COUNT]).unwrap(),
        }
    }

    fn pool(ids: std::ops::Range<u64>) -> Vec<ExtractedSample> {
        ids.map(extracted).collect()
    }

    #[test]
    fn test_empty_positive_pool_fails() {
        let assembler = SampleSetAssembler::default();
        let err = assembler.assemble(vec![], pool(0..5), 1).unwrap_err();
        assert!(matches!(err, PrepError::InsufficientPositiveSamples));
    }

    #[test]
    fn test_unlabeled_fully_overlapping_fails() {
        let assembler = SampleSetAssembler::default();
        let err = assembler.assemble(pool(0..5), pool(0..5), 1).unwrap_err();
        assert!(matches!(
            err,
            PrepError::InsufficientUnlabeledSamples { dropped_overlap: 5 }
        ));
    }

    #[test]
    fn test_overlap_removed() {
        let assembler = SampleSetAssembler::default();
        let (pool, report) = assembler
            .assemble_with_report(pool(0..5), pool(3..20), 1)
            .unwrap();

        assert_eq!(report.dropped_overlap, 2);
        let p = pool.ids(SampleLabel::Positive);
        let u = pool.ids(SampleLabel::Unlabeled);
        assert!(p.is_disjoint(&u));
        assert_eq!(pool.unlabeled_count(), 15);
        assert!(!report.cap_applied());
    }

    #[test]
    fn test_cap_and_reproducibility() {
        let assembler = SampleSetAssembler::default();
        let a = assembler.assemble(pool(0..3), pool(100..1100), 42).unwrap();
        let b = assembler.assemble(pool(0..3), pool(100..1100), 42).unwrap();

        assert_eq!(a.unlabeled_count(), 30);
        assert_eq!(
            a.ids(SampleLabel::Unlabeled),
            b.ids(SampleLabel::Unlabeled)
        );
    }

    #[test]
    fn test_different_seeds_draw_different_subsets() {
        let assembler = SampleSetAssembler::default();
        let a = assembler.assemble(pool(0..3), pool(100..1100), 1).unwrap();
        let b = assembler.assemble(pool(0..3), pool(100..1100), 2).unwrap();
        assert_ne!(
            a.ids(SampleLabel::Unlabeled),
            b.ids(SampleLabel::Unlabeled)
        );
    }

    #[test]
    fn test_huge_cap_factor_keeps_every_unlabeled() {
        let config = AssemblyConfig {
            max_unlabeled_per_positive: usize::MAX,
        };
        assert!(config.validate().is_ok());

        let (pool, report) = SampleSetAssembler::new(config)
            .assemble_with_report(pool(0..2), pool(10..15), 3)
            .unwrap();
        assert_eq!(pool.unlabeled_count(), 5);
        assert!(!report.cap_applied());
    }

    #[test]
    fn test_positives_first_then_unlabeled() {
        let assembler = SampleSetAssembler::default();
        let pool = assembler.assemble(pool(0..2), pool(10..14), 0).unwrap();
        let labels: Vec<_> = pool.entries().iter().map(|e| e.label).collect();
        assert_eq!(
            labels,
            vec![
                SampleLabel::Positive,
                SampleLabel::Positive,
                SampleLabel::Unlabeled,
                SampleLabel::Unlabeled,
                SampleLabel::Unlabeled,
                SampleLabel::Unlabeled
            ]
        );
    }

    #[test]
    fn test_duplicate_ids_within_pool_dropped() {
        let assembler = SampleSetAssembler::default();
        let mut u = pool(10..14);
        u.push(extracted(10));
        let (pool, report) = assembler.assemble_with_report(pool(0..1), u, 0).unwrap();
        assert_eq!(report.dropped_duplicates, 1);
        assert_eq!(pool.unlabeled_count(), 4);
    }

    #[test]
    fn test_matrices_follow_pool_order() {
        let assembler = SampleSetAssembler::default();
        let pool = assembler.assemble(pool(0..1), pool(5..7), 0).unwrap();
        let x = pool.feature_matrix();
        let y = pool.label_vector();

        assert_eq!(x.shape(), &[3, FEATURE_COUNT]);
        assert_eq!(x[[1, 0]], 5.0);
        assert_eq!(y.to_vec(), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_shuffle_is_seeded_permutation() {
        let assembler = SampleSetAssembler::default();
        let pool = assembler.assemble(pool(0..5), pool(10..40), 0).unwrap();

        let a = pool.clone().shuffled(9);
        let b = pool.clone().shuffled(9);
        assert_eq!(a.all_ids(), b.all_ids());

        let mut sorted = a.all_ids();
        sorted.sort_unstable();
        let mut original = pool.all_ids();
        original.sort_unstable();
        assert_eq!(sorted, original);
    }
}
