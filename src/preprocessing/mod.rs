//! Feature preprocessing applied before model consumption.
//!
//! - **Normalization**: column-wise z-score [`FeatureScaler`] with explicit
//!   `fit` / `transform`, owned by the caller
//!
//! # Example
//!
//! ```ignore
//! use pu_feature_prep::preprocessing::FeatureScaler;
//!
//! let mut scaler = FeatureScaler::new();
//! scaler.fit(train_rows)?;               // fit on train only
//! let x_val = scaler.transform_matrix(&validation_matrix)?;
//! ```

pub mod normalization;

pub use normalization::{FeatureScaler, DEFAULT_MIN_STD};
