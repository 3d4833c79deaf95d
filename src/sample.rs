//! Raw meter readings and per-dataset time-ordered views.
//!
//! [`RawSample`] rows come from the ingestion layer and are read-only here.
//! [`DatasetTimeline`] is the "all samples of one dataset, keyed by time"
//! view the window feature extractor queries. A timeline never mixes
//! datasets: samples from another dataset are rejected at construction.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Identifier of a single reading.
pub type SampleId = u64;

/// Identifier of the dataset (meter log) a reading belongs to.
pub type DatasetId = u64;

/// One timestamped power-meter reading.
///
/// Channel readings are optional because meter logs regularly drop fields.
/// Accessors such as [`RawSample::total`] default a missing reading to 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Sample identifier (unique across datasets)
    pub id: SampleId,

    /// Owning dataset
    pub dataset_id: DatasetId,

    /// Reading time
    pub timestamp: DateTime<Utc>,

    /// Raw wattage on line 1
    #[serde(default)]
    pub raw_wattage_l1: Option<f64>,

    /// Raw wattage on line 2
    #[serde(default)]
    pub raw_wattage_l2: Option<f64>,

    /// Wattage on the 110V channel
    #[serde(default)]
    pub wattage_110v: Option<f64>,

    /// Wattage on the 220V channel
    #[serde(default)]
    pub wattage_220v: Option<f64>,

    /// Total wattage, expected to be close to 110V + 220V
    #[serde(default)]
    pub wattage_total: Option<f64>,

    /// Whether upstream labelling confirmed this timestamp as anomalous
    #[serde(default)]
    pub is_positive_label: bool,
}

impl RawSample {
    /// Create a sample with every channel present.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: SampleId,
        dataset_id: DatasetId,
        timestamp: DateTime<Utc>,
        l1: f64,
        l2: f64,
        w110: f64,
        w220: f64,
        total: f64,
        is_positive_label: bool,
    ) -> Self {
        Self {
            id,
            dataset_id,
            timestamp,
            raw_wattage_l1: Some(l1),
            raw_wattage_l2: Some(l2),
            wattage_110v: Some(w110),
            wattage_220v: Some(w220),
            wattage_total: Some(total),
            is_positive_label,
        }
    }

    /// Raw L1 wattage, 0 if missing or non-finite.
    #[inline]
    pub fn l1(&self) -> f64 {
        finite_or_zero(self.raw_wattage_l1)
    }

    /// Raw L2 wattage, 0 if missing or non-finite.
    #[inline]
    pub fn l2(&self) -> f64 {
        finite_or_zero(self.raw_wattage_l2)
    }

    /// 110V channel wattage, 0 if missing or non-finite.
    #[inline]
    pub fn w110(&self) -> f64 {
        finite_or_zero(self.wattage_110v)
    }

    /// 220V channel wattage, 0 if missing or non-finite.
    #[inline]
    pub fn w220(&self) -> f64 {
        finite_or_zero(self.wattage_220v)
    }

    /// Total wattage, 0 if missing or non-finite.
    #[inline]
    pub fn total(&self) -> f64 {
        finite_or_zero(self.wattage_total)
    }

    /// Number of channels that are absent.
    pub fn missing_channel_count(&self) -> usize {
        [
            self.raw_wattage_l1,
            self.raw_wattage_l2,
            self.wattage_110v,
            self.wattage_220v,
            self.wattage_total,
        ]
        .iter()
        .filter(|v| v.is_none())
        .count()
    }
}

#[inline]
fn finite_or_zero(reading: Option<f64>) -> f64 {
    reading.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Time-ordered view over every sample of a single dataset.
///
/// Samples are kept sorted by `(timestamp, id)` and de-duplicated by id so
/// window queries are two binary searches.
#[derive(Debug, Clone)]
pub struct DatasetTimeline {
    dataset_id: DatasetId,
    samples: Vec<RawSample>,
    positions: HashMap<SampleId, usize>,
}

impl DatasetTimeline {
    /// Build the timeline for `dataset_id`.
    ///
    /// Samples from other datasets are skipped (and logged); repeated ids
    /// keep their first occurrence.
    pub fn new<'a, I>(dataset_id: DatasetId, samples: I) -> Self
    where
        I: IntoIterator<Item = &'a RawSample>,
    {
        let mut seen = HashSet::new();
        let mut foreign = 0usize;
        let mut kept: Vec<RawSample> = Vec::new();

        for sample in samples {
            if sample.dataset_id != dataset_id {
                foreign += 1;
                continue;
            }
            if seen.insert(sample.id) {
                kept.push(sample.clone());
            }
        }

        if foreign > 0 {
            log::warn!(
                "Timeline for dataset {}: skipped {} samples belonging to other datasets",
                dataset_id,
                foreign
            );
        }

        kept.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));

        let positions = kept
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.id, idx))
            .collect();

        Self {
            dataset_id,
            samples: kept,
            positions,
        }
    }

    /// Dataset this timeline belongs to.
    pub fn dataset_id(&self) -> DatasetId {
        self.dataset_id
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the timeline holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether `id` is part of this timeline.
    pub fn contains(&self, id: SampleId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Look up a sample by id.
    pub fn get(&self, id: SampleId) -> Option<&RawSample> {
        self.positions.get(&id).map(|&idx| &self.samples[idx])
    }

    /// All samples in time order.
    pub fn samples(&self) -> &[RawSample] {
        &self.samples
    }

    /// Samples with timestamp in `[end - span, end]`, both ends inclusive.
    ///
    /// The start saturates at the earliest representable timestamp.
    pub fn window(&self, end: DateTime<Utc>, span: Duration) -> &[RawSample] {
        let start = end
            .checked_sub_signed(span)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let lo = self.samples.partition_point(|s| s.timestamp < start);
        let hi = self.samples.partition_point(|s| s.timestamp <= end);
        if lo >= hi {
            return &[];
        }
        &self.samples[lo..hi]
    }
}

/// Split samples into (positives, unlabeled) by `is_positive_label`.
pub fn partition_by_label(samples: &[RawSample]) -> (Vec<RawSample>, Vec<RawSample>) {
    samples.iter().cloned().partition(|s| s.is_positive_label)
}

/// Group samples by dataset, preserving input order within each group.
pub fn group_by_dataset(samples: &[RawSample]) -> BTreeMap<DatasetId, Vec<RawSample>> {
    let mut groups: BTreeMap<DatasetId, Vec<RawSample>> = BTreeMap::new();
    for sample in samples {
        groups.entry(sample.dataset_id).or_default().push(sample.clone());
    }
    groups
}

/// Build one timeline per dataset from any number of sample slices.
///
/// Used to give the extractor the full dataset view when P and U rows of
/// the same dataset arrive in separate pools.
pub fn build_timelines<'a, I>(pools: I) -> BTreeMap<DatasetId, DatasetTimeline>
where
    I: IntoIterator<Item = &'a [RawSample]>,
{
    let mut by_dataset: BTreeMap<DatasetId, Vec<&RawSample>> = BTreeMap::new();
    for pool in pools {
        for sample in pool {
            by_dataset.entry(sample.dataset_id).or_default().push(sample);
        }
    }

    by_dataset
        .into_iter()
        .map(|(dataset_id, samples)| {
            let timeline = DatasetTimeline::new(dataset_id, samples);
            log::debug!(
                "Dataset {}: timeline holds {} samples",
                dataset_id,
                timeline.len()
            );
            (dataset_id, timeline)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn reading(id: SampleId, dataset: DatasetId, minute: i64) -> RawSample {
        RawSample::new(id, dataset, at(minute), 1.0, 2.0, 3.0, 4.0, 7.0, false)
    }

    #[test]
    fn test_missing_channels_default_to_zero() {
        let mut s = reading(1, 1, 0);
        s.raw_wattage_l2 = None;
        s.wattage_total = None;
        assert_eq!(s.l2(), 0.0);
        assert_eq!(s.total(), 0.0);
        assert_eq!(s.missing_channel_count(), 2);
    }

    #[test]
    fn test_timeline_sorted_and_deduplicated() {
        let samples = vec![reading(3, 1, 20), reading(1, 1, 0), reading(2, 1, 10), reading(1, 1, 0)];
        let timeline = DatasetTimeline::new(1, &samples);

        assert_eq!(timeline.len(), 3);
        let ids: Vec<_> = timeline.samples().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_timeline_rejects_other_datasets() {
        let samples = vec![reading(1, 1, 0), reading(2, 2, 5)];
        let timeline = DatasetTimeline::new(1, &samples);
        assert!(timeline.contains(1));
        assert!(!timeline.contains(2));
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let samples: Vec<_> = (0..10).map(|i| reading(i, 1, i as i64 * 10)).collect();
        let timeline = DatasetTimeline::new(1, &samples);

        // [60 - 30, 60] = minutes 30, 40, 50, 60
        let window = timeline.window(at(60), Duration::minutes(30));
        let ids: Vec<_> = window.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_window_before_first_sample_is_empty() {
        let samples = vec![reading(1, 1, 100)];
        let timeline = DatasetTimeline::new(1, &samples);
        assert!(timeline.window(at(10), Duration::minutes(30)).is_empty());
    }

    #[test]
    fn test_non_finite_channels_read_as_zero() {
        let mut s = reading(1, 1, 0);
        s.wattage_total = Some(f64::NAN);
        s.raw_wattage_l1 = Some(f64::INFINITY);
        assert_eq!(s.total(), 0.0);
        assert_eq!(s.l1(), 0.0);
        assert_eq!(s.l2(), 2.0);
        assert_eq!(s.missing_channel_count(), 0);
    }

    #[test]
    fn test_window_at_earliest_timestamp_saturates() {
        let mut first = reading(1, 1, 0);
        first.timestamp = DateTime::<Utc>::MIN_UTC;
        let samples = vec![first, reading(2, 1, 0)];
        let timeline = DatasetTimeline::new(1, &samples);

        let window = timeline.window(DateTime::<Utc>::MIN_UTC, Duration::minutes(240));
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].id, 1);
    }

    #[test]
    fn test_partition_and_group() {
        let mut samples = vec![reading(1, 1, 0), reading(2, 2, 0), reading(3, 1, 5)];
        samples[1].is_positive_label = true;

        let (pos, unl) = partition_by_label(&samples);
        assert_eq!(pos.len(), 1);
        assert_eq!(unl.len(), 2);

        let groups = group_by_dataset(&samples);
        assert_eq!(groups[&1].len(), 2);
        assert_eq!(groups[&2].len(), 1);
    }

    #[test]
    fn test_build_timelines_merges_pools() {
        let p = vec![reading(1, 1, 0)];
        let u = vec![reading(2, 1, 5), reading(3, 2, 5)];
        let timelines = build_timelines([p.as_slice(), u.as_slice()]);
        assert_eq!(timelines.len(), 2);
        assert_eq!(timelines[&1].len(), 2);
    }
}
