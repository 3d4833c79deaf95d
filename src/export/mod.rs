//! Data Export Module
//!
//! Writes a prepared run to disk for a Python/PyTorch trainer.
//!
//! # Modules
//!
//! - **test_ids**: durable storage of the held-out test ids ([`TestIdStore`])
//! - Core export: NumPy (.npy) arrays and JSON metadata ([`BundleExporter`])
//!
//! # Bundle layout
//!
//! ```text
//! out_dir/
//! ├── train_features.npy        [N_train, 41] float64
//! ├── train_labels.npy          [N_train]     float64 (1.0 P, 0.0 U)
//! ├── validation_features.npy
//! ├── validation_labels.npy
//! ├── test_features.npy
//! ├── test_labels.npy
//! ├── test_ids.json             ids of the test rows, in row order
//! ├── prior.json                PriorEstimate
//! ├── scaler.json               fitted FeatureScaler (only when normalising)
//! └── metadata.json             schema version, feature names, counts, config
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pu_feature_prep::export::{BundleExporter, JsonTestIdStore, TestIdStore};
//!
//! let result = BundleExporter::new("out/run-7")
//!     .with_normalization(true)
//!     .export(&prepared, preparer.config())?;
//!
//! JsonTestIdStore::new("holdouts").save_test_ids("run-7", prepared.test_ids())?;
//! ```

pub mod test_ids;

use crate::config::PrepConfig;
use crate::error::{PrepError, Result};
use crate::pipeline::{PreparedData, SplitMatrices};
use crate::preprocessing::FeatureScaler;
use crate::prior::PriorMethod;
use crate::schema::{feature_names, FEATURE_COUNT, SCHEMA_VERSION};
use ndarray_npy::WriteNpyExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub use test_ids::{JsonTestIdStore, TestIdRecord, TestIdStore};

/// Metadata about an exported bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// Feature layout version
    pub schema_version: String,

    /// Number of features per row
    pub n_features: usize,

    /// Feature names in column order
    pub feature_names: Vec<String>,

    /// Rows in the train split
    pub n_train: usize,

    /// Rows in the validation split
    pub n_validation: usize,

    /// Rows in the test split
    pub n_test: usize,

    /// POSITIVE entries in the assembled pool
    pub n_positive: usize,

    /// UNLABELED entries in the assembled pool
    pub n_unlabeled: usize,

    /// Estimated class prior
    pub prior: f64,

    /// Prior reduction used
    pub prior_method: PriorMethod,

    /// Seed used for the run
    pub seed: u64,

    /// Whether features were standardised with a train-fitted scaler
    pub normalized: bool,

    /// Configuration of the run
    pub config: PrepConfig,

    /// Export timestamp (RFC 3339)
    pub export_timestamp: String,
}

/// Files written by one export.
#[derive(Debug, Clone)]
pub struct BundleExportResult {
    /// Bundle directory
    pub output_dir: PathBuf,

    /// Every file written, in write order
    pub files: Vec<PathBuf>,

    /// Metadata as written to `metadata.json`
    pub metadata: ExportMetadata,
}

/// Exports a [`PreparedData`] as NumPy arrays plus JSON side files.
#[derive(Debug, Clone)]
pub struct BundleExporter {
    output_dir: PathBuf,
    normalize: bool,
}

impl BundleExporter {
    /// Create an exporter writing into `output_dir` (created if missing).
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            normalize: false,
        }
    }

    /// Standardise every split with a scaler fitted on the train split.
    pub fn with_normalization(mut self, enabled: bool) -> Self {
        self.normalize = enabled;
        self
    }

    /// Output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the bundle.
    ///
    /// # Errors
    ///
    /// I/O and serialization failures; [`PrepError::Validation`] when
    /// normalisation is requested and the train split is empty.
    pub fn export(&self, prepared: &PreparedData, config: &PrepConfig) -> Result<BundleExportResult> {
        fs::create_dir_all(&self.output_dir)?;
        let mut files = Vec::new();

        let scaler = if self.normalize {
            let scaler = prepared.fit_scaler()?;
            files.push(self.write_json("scaler.json", &scaler)?);
            Some(scaler)
        } else {
            None
        };

        let (train, validation, test) = prepared.matrices();
        for (name, matrices) in [
            ("train", &train),
            ("validation", &validation),
            ("test", &test),
        ] {
            files.extend(self.export_split(name, matrices, scaler.as_ref())?);
        }

        files.push(self.write_json("test_ids.json", &test.ids)?);
        files.push(self.write_json("prior.json", &prepared.prior)?);

        let metadata = ExportMetadata {
            schema_version: SCHEMA_VERSION.to_string(),
            n_features: FEATURE_COUNT,
            feature_names: feature_names(),
            n_train: train.len(),
            n_validation: validation.len(),
            n_test: test.len(),
            n_positive: prepared.assembly.positives,
            n_unlabeled: prepared.assembly.unlabeled,
            prior: prepared.prior.value,
            prior_method: prepared.prior.method,
            seed: prepared.seed,
            normalized: self.normalize,
            config: config.clone(),
            export_timestamp: chrono::Utc::now().to_rfc3339(),
        };
        files.push(self.write_json("metadata.json", &metadata)?);

        log::info!(
            "Exported bundle to {} (train={}, validation={}, test={}, normalized={})",
            self.output_dir.display(),
            metadata.n_train,
            metadata.n_validation,
            metadata.n_test,
            metadata.normalized
        );

        Ok(BundleExportResult {
            output_dir: self.output_dir.clone(),
            files,
            metadata,
        })
    }

    fn export_split(
        &self,
        name: &str,
        matrices: &SplitMatrices,
        scaler: Option<&FeatureScaler>,
    ) -> Result<Vec<PathBuf>> {
        let features = match scaler {
            // An empty split has nothing to scale.
            Some(scaler) if !matrices.is_empty() => scaler.transform_matrix(&matrices.features)?,
            _ => matrices.features.clone(),
        };

        let features_path = self.output_dir.join(format!("{name}_features.npy"));
        features.write_npy(BufWriter::new(File::create(&features_path)?))?;

        let labels_path = self.output_dir.join(format!("{name}_labels.npy"));
        matrices
            .labels
            .write_npy(BufWriter::new(File::create(&labels_path)?))?;

        log::debug!(
            "Exported {}: [{} rows x {} features]",
            name,
            features.nrows(),
            features.ncols()
        );

        Ok(vec![features_path, labels_path])
    }

    fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), value)?;
        Ok(path)
    }
}

/// Read back the metadata of an exported bundle.
pub fn load_metadata<P: AsRef<Path>>(bundle_dir: P) -> Result<ExportMetadata> {
    let contents = fs::read_to_string(bundle_dir.as_ref().join("metadata.json"))?;
    let metadata: ExportMetadata = serde_json::from_str(&contents)?;
    if metadata.schema_version != SCHEMA_VERSION {
        return Err(PrepError::Validation(format!(
            "bundle schema {} does not match {}",
            metadata.schema_version, SCHEMA_VERSION
        )));
    }
    Ok(metadata)
}
