//! Error types for training-data preparation.
//!
//! Only pool-level structural problems are errors. Anything local to a
//! single reading (missing channels, sparse windows, non-finite values) is
//! absorbed by the feature extractor with a documented fallback and a log
//! line, so one malformed sample never aborts a batch.

use thiserror::Error;

/// Errors raised while assembling, splitting or estimating the prior.
///
/// Every variant is fatal for the current preparation run: the caller is
/// expected to fail the training job instead of proceeding on degenerate data.
#[derive(Debug, Error)]
pub enum PrepError {
    /// The positive pool was empty. No class prior exists without positives.
    #[error("insufficient positive samples: the P pool is empty")]
    InsufficientPositiveSamples,

    /// The unlabeled pool was empty once P ids were removed from it.
    #[error(
        "insufficient unlabeled samples: the U pool is empty after removing {dropped_overlap} ids shared with P"
    )]
    InsufficientUnlabeledSamples {
        /// Number of U entries dropped because their id was also in P
        dropped_overlap: usize,
    },

    /// The density model behind the class prior is undefined.
    #[error("class prior estimation failed: {0}")]
    PriorEstimation(String),

    /// Configuration or split ratios are invalid.
    #[error("validation error: {0}")]
    Validation(String),

    /// A feature vector did not have the expected length.
    #[error("feature vector length ({actual}) doesn't match the schema ({expected})")]
    FeatureCount {
        /// Expected number of features
        expected: usize,
        /// Actual number of features received
        actual: usize,
    },

    /// Filesystem failure while exporting or persisting ids.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding failure (JSON, TOML, NumPy).
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PrepError {
    fn from(err: serde_json::Error) -> Self {
        PrepError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for PrepError {
    fn from(err: toml::de::Error) -> Self {
        PrepError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for PrepError {
    fn from(err: toml::ser::Error) -> Self {
        PrepError::Serialization(err.to_string())
    }
}

impl From<ndarray_npy::WriteNpyError> for PrepError {
    fn from(err: ndarray_npy::WriteNpyError) -> Self {
        PrepError::Serialization(err.to_string())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PrepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mentions_dropped_overlap() {
        let err = PrepError::InsufficientUnlabeledSamples { dropped_overlap: 4 };
        assert!(err.to_string().contains("4 ids"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PrepError = io.into();
        assert!(matches!(err, PrepError::Io(_)));
    }
}
