//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```ignore
//! use pu_feature_prep::prelude::*;
//!
//! let preparer = TrainingDataPreparer::new(PrepConfig::default())?;
//! let prepared = preparer.prepare(&positives, &unlabeled)?;
//! ```
//!
//! # What's Included
//!
//! ## Pipeline
//! - [`TrainingDataPreparer`], [`PreparerBuilder`], [`PreparedData`]
//! - [`PrepConfig`] and its sections
//!
//! ## Components
//! - [`WindowFeatureExtractor`], [`SampleSetAssembler`], [`DataSplitter`],
//!   [`ClassPriorEstimator`], [`FeatureScaler`]
//!
//! ## Export
//! - [`BundleExporter`], [`TestIdStore`], [`JsonTestIdStore`]

// ============================================================================
// Pipeline
// ============================================================================

pub use crate::builder::PreparerBuilder;
pub use crate::config::{PrepConfig, RunMetadata};
pub use crate::pipeline::{PreparedData, SplitMatrices, TrainingDataPreparer};

// ============================================================================
// Samples & Features
// ============================================================================

pub use crate::features::{
    ExtractedSample, ExtractionStats, FeatureVector, WindowConfig, WindowFeatureExtractor,
};
pub use crate::sample::{
    build_timelines, group_by_dataset, partition_by_label, DatasetId, DatasetTimeline, RawSample,
    SampleId,
};
pub use crate::schema::{feature_names, FeatureSchema, WindowScale, FEATURE_COUNT, SCHEMA_VERSION};

// ============================================================================
// Assembly, Split, Prior
// ============================================================================

pub use crate::assembly::{
    AssemblyConfig, AssemblyReport, PoolEntry, SampleLabel, SamplePool, SampleSetAssembler,
};
pub use crate::prior::{ClassPriorEstimator, PriorConfig, PriorEstimate, PriorMethod};
pub use crate::split::{DataSplitter, SplitConfig, SplitResult};

// ============================================================================
// Preprocessing & Validation
// ============================================================================

pub use crate::preprocessing::FeatureScaler;
pub use crate::validation::{validate_samples, SampleValidator, ValidationResult};

// ============================================================================
// Export
// ============================================================================

pub use crate::export::{BundleExporter, ExportMetadata, JsonTestIdStore, TestIdStore};

// ============================================================================
// Errors
// ============================================================================

pub use crate::error::{PrepError, Result};
