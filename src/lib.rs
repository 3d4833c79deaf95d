//! PU Feature Prep
//!
//! Training-data preparation for Positive-Unlabeled (PU) anomaly detection
//! on power-meter time series.
//!
//! # Overview
//!
//! Raw meter readings (two raw line wattages, 110V / 220V channel wattages
//! and a total) are turned into everything a PU trainer consumes:
//!
//! - **Features**: a fixed 41-value vector per reading, built from the
//!   reading itself and short / medium / long time windows of its dataset
//! - **Pool**: confirmed positives (P) and unlabeled readings (U) merged
//!   without overlap, U bounded to 10 × |P| by a seeded draw
//! - **Prior**: the class prior π from a density-ratio estimate on the pool
//! - **Split**: contiguous train / validation / test ranges, with the test
//!   ids retained for later evaluation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       PU Feature Prep                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  sample         - Raw readings and per-dataset timelines       │
//! │  schema/        - Feature layout, names and version            │
//! │  features/      - Window feature extraction                    │
//! │  assembly       - P/U pool assembly and oversampling cap       │
//! │  prior          - Class-prior estimation                       │
//! │  split          - Contiguous train/validation/test split       │
//! │  preprocessing/ - Caller-owned feature scaler                  │
//! │  pipeline       - End-to-end preparation                       │
//! │  export/        - NumPy bundle and test-id persistence         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pu_feature_prep::prelude::*;
//!
//! let preparer = PreparerBuilder::new()
//!     .split_ratios(0.6, 0.25, 0.15)
//!     .seed(7)
//!     .build()?;
//!
//! let prepared = preparer.prepare(&positives, &unlabeled)?;
//! println!("π = {:.3} ({})", prepared.prior.value, prepared.prior.method);
//!
//! BundleExporter::new("out/run-7").export(&prepared, preparer.config())?;
//! ```

pub mod assembly;
pub mod builder;
pub mod config;
pub mod error;
pub mod export;
pub mod features;
pub mod pipeline;
pub mod prelude;
pub mod preprocessing;
pub mod prior;
pub mod sample;
pub mod schema;
pub mod split;
pub mod validation;

// Re-exports - Errors
pub use error::{PrepError, Result};

// Re-exports - Samples
pub use sample::{DatasetId, DatasetTimeline, RawSample, SampleId};

// Re-exports - Schema
pub use schema::{FeatureCategory, FeatureDef, FeatureSchema, WindowScale, FEATURE_COUNT};

// Re-exports - Config
pub use config::{PrepConfig, RunMetadata};

// Re-exports - Features
pub use features::{ExtractedSample, FeatureVector, WindowConfig, WindowFeatureExtractor};

// Re-exports - Assembly
pub use assembly::{AssemblyConfig, PoolEntry, SampleLabel, SamplePool, SampleSetAssembler};

// Re-exports - Split
pub use split::{DataSplitter, SplitConfig, SplitResult};

// Re-exports - Prior
pub use prior::{ClassPriorEstimator, PriorConfig, PriorEstimate, PriorMethod};

// Re-exports - Preprocessing
pub use preprocessing::FeatureScaler;

// Re-exports - Validation
pub use validation::{validate_samples, SampleValidator, ValidationLevel, ValidationResult};

// Re-exports - Export
pub use export::{BundleExporter, ExportMetadata, JsonTestIdStore, TestIdStore};

// Re-exports - Pipeline
pub use builder::PreparerBuilder;
pub use pipeline::{PreparedData, SplitMatrices, TrainingDataPreparer};
