//! Property tests for the preparation invariants
//!
//! - every extracted vector has 41 finite values
//! - no id is both POSITIVE and UNLABELED after assembly
//! - |UNLABELED| <= 10 x |POSITIVE|, with equality only when the raw U pool exceeded it
//! - the split loses and duplicates nothing
//! - the prior stays inside its clip band

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use pu_feature_prep::prelude::*;
use std::collections::HashSet;

fn reading(id: SampleId, minute: i64, total: f64, positive: bool) -> RawSample {
    RawSample::new(
        id,
        1,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute),
        total * 0.5,
        total * 0.5,
        total * 0.4,
        total * 0.6,
        total,
        positive,
    )
}

fn extracted(ids: &[SampleId], level: f64) -> Vec<ExtractedSample> {
    ids.iter()
        .map(|&id| {
            let mut values = vec![level; FEATURE_COUNT];
            values[0] = level + (id % 13) as f64;
            ExtractedSample {
                id,
                dataset_id: 1,
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                features: FeatureVector::try_from_vec(values).unwrap(),
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_fixed_dimensionality_and_finite(
        totals in proptest::collection::vec(0.0f64..20_000.0, 1..60),
        gaps in proptest::collection::vec(0i64..90, 1..60),
        target in 0usize..60,
    ) {
        let mut minute = 0;
        let samples: Vec<RawSample> = totals
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                minute += gaps[i % gaps.len()];
                reading(i as u64, minute, t, false)
            })
            .collect();
        let timeline = DatasetTimeline::new(1, &samples);
        let sample = &samples[target % samples.len()];

        let features = WindowFeatureExtractor::default().extract(sample, &timeline);
        prop_assert_eq!(features.len(), FEATURE_COUNT);
        prop_assert!(features.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn prop_missing_channels_never_produce_nan(
        mask in 0u8..32,
        total in 0.0f64..5_000.0,
    ) {
        let mut sample = reading(1, 0, total, false);
        if mask & 1 != 0 { sample.raw_wattage_l1 = None; }
        if mask & 2 != 0 { sample.raw_wattage_l2 = None; }
        if mask & 4 != 0 { sample.wattage_110v = None; }
        if mask & 8 != 0 { sample.wattage_220v = None; }
        if mask & 16 != 0 { sample.wattage_total = None; }

        let timeline = DatasetTimeline::new(1, [&sample]);
        let features = WindowFeatureExtractor::default().extract(&sample, &timeline);
        prop_assert!(features.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn prop_assembly_overlap_and_cap(
        p_ids in proptest::collection::hash_set(0u64..500, 1..20),
        u_ids in proptest::collection::hash_set(0u64..500, 1..300),
        seed in any::<u64>(),
    ) {
        let p: Vec<_> = p_ids.iter().copied().collect();
        let u: Vec<_> = u_ids.iter().copied().collect();
        let u_after_overlap = u_ids.difference(&p_ids).count();

        let result = SampleSetAssembler::default()
            .assemble(extracted(&p, 10.0), extracted(&u, 0.0), seed);

        if u_after_overlap == 0 {
            let is_insufficient_unlabeled =
                matches!(result, Err(PrepError::InsufficientUnlabeledSamples { .. }));
            prop_assert!(is_insufficient_unlabeled);
        } else {
            let pool = result.unwrap();
            let positives = pool.ids(SampleLabel::Positive);
            let unlabeled = pool.ids(SampleLabel::Unlabeled);

            prop_assert!(positives.is_disjoint(&unlabeled));
            prop_assert_eq!(positives.len(), p.len());

            let cap = 10 * positives.len();
            prop_assert!(unlabeled.len() <= cap);
            if unlabeled.len() == cap {
                prop_assert!(u_after_overlap >= cap);
            } else {
                prop_assert_eq!(unlabeled.len(), u_after_overlap);
            }
        }
    }

    #[test]
    fn prop_assembly_reproducible(
        n_p in 1usize..5,
        n_u in 60usize..400,
        seed in any::<u64>(),
    ) {
        let p: Vec<u64> = (0..n_p as u64).collect();
        let u: Vec<u64> = (1_000..1_000 + n_u as u64).collect();
        let assembler = SampleSetAssembler::default();

        let a = assembler.assemble(extracted(&p, 5.0), extracted(&u, 0.0), seed).unwrap();
        let b = assembler.assemble(extracted(&p, 5.0), extracted(&u, 0.0), seed).unwrap();
        prop_assert_eq!(a.all_ids(), b.all_ids());
    }

    #[test]
    fn prop_split_complete_and_disjoint(
        n in 0u64..400,
        train in 0.0f64..100.0,
        validation in 0.0f64..100.0,
        test in 0.0f64..100.0,
    ) {
        prop_assume!(train + validation + test > 0.0);

        let pool = SamplePool::from_entries(
            extracted(&(0..n).collect::<Vec<_>>(), 1.0)
                .into_iter()
                .map(|s| PoolEntry::new(s, SampleLabel::Unlabeled))
                .collect(),
        );
        let config = SplitConfig::new(train, validation, test);
        let result = DataSplitter::new().split(pool, &config).unwrap();

        prop_assert_eq!(result.total_len(), n as usize);
        prop_assert!((result.config.sum() - 1.0).abs() < 1e-6);

        let mut seen = HashSet::new();
        for pool in [&result.train, &result.validation, &result.test] {
            for id in pool.all_ids() {
                prop_assert!(seen.insert(id));
            }
        }
        prop_assert_eq!(result.test.all_ids(), result.test_ids);
    }

    #[test]
    fn prop_prior_within_clip_band(
        n_p in 2usize..12,
        n_u in 1usize..80,
        spread in 0.0f64..50.0,
        use_mean in any::<bool>(),
    ) {
        let p: Vec<u64> = (0..n_p as u64).collect();
        let u: Vec<u64> = (100..100 + n_u as u64).collect();
        let pool = SampleSetAssembler::default()
            .assemble(extracted(&p, spread), extracted(&u, 0.0), 1)
            .unwrap();

        let method = if use_mean { PriorMethod::Mean } else { PriorMethod::Median };
        let estimate = ClassPriorEstimator::default().estimate_with(&pool, method).unwrap();
        prop_assert!(estimate.value >= 0.1 && estimate.value <= 0.9);
    }
}
