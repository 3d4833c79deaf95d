//! Class-prior (π) estimation for the PU loss.
//!
//! For every UNLABELED entry `x` we compute the density ratio
//!
//! ```text
//! r(x) = p_P(x) / p_U(x)
//! ```
//!
//! where `p_P` and `p_U` are Gaussian kernel density estimates fitted on the
//! POSITIVE and UNLABELED entries. Features are standardised first with a
//! scaler owned by this call, and densities are evaluated in log space
//! (log-sum-exp) so 41-dimensional kernels do not underflow.
//!
//! π is then the mean (`PriorMethod::Mean`) or the median
//! (`PriorMethod::Median`) of `r`, clipped to `[clip_min, clip_max]`
//! (default `[0.1, 0.9]`). The median is the default: the mean is unstable
//! on heavy-tailed ratio distributions and tends to saturate at the clip
//! boundary. The clip band means π can never be reported outside it, even
//! if the true prior lies outside.

use crate::assembly::{SampleLabel, SamplePool};
use crate::error::{PrepError, Result};
use crate::features::window_stats::percentile;
use crate::preprocessing::FeatureScaler;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lower bound of the reported prior.
pub const DEFAULT_PRIOR_CLIP_MIN: f64 = 0.1;

/// Upper bound of the reported prior.
pub const DEFAULT_PRIOR_CLIP_MAX: f64 = 0.9;

/// Minimum POSITIVE entries for the positive density to be defined.
pub const MIN_POSITIVE_SAMPLES: usize = 2;

/// Bound on the log density ratio before exponentiation.
const MAX_LOG_RATIO: f64 = 700.0;

/// How per-sample density ratios are reduced to π.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorMethod {
    /// Arithmetic mean of the ratios
    Mean,
    /// Median of the ratios
    #[default]
    Median,
}

impl PriorMethod {
    /// Lower-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorMethod::Mean => "mean",
            PriorMethod::Median => "median",
        }
    }
}

impl fmt::Display for PriorMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriorMethod {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(PriorMethod::Mean),
            "median" => Ok(PriorMethod::Median),
            other => Err(PrepError::Validation(format!(
                "unknown prior method '{other}', expected 'mean' or 'median'"
            ))),
        }
    }
}

/// Prior estimation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorConfig {
    /// Reduction of the density ratios
    #[serde(default)]
    pub method: PriorMethod,

    /// Lower clip bound
    #[serde(default = "default_clip_min")]
    pub clip_min: f64,

    /// Upper clip bound
    #[serde(default = "default_clip_max")]
    pub clip_max: f64,
}

fn default_clip_min() -> f64 {
    DEFAULT_PRIOR_CLIP_MIN
}

fn default_clip_max() -> f64 {
    DEFAULT_PRIOR_CLIP_MAX
}

impl Default for PriorConfig {
    fn default() -> Self {
        Self {
            method: PriorMethod::default(),
            clip_min: DEFAULT_PRIOR_CLIP_MIN,
            clip_max: DEFAULT_PRIOR_CLIP_MAX,
        }
    }
}

impl PriorConfig {
    /// Validate the clip band: `0 < clip_min < clip_max < 1`.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.clip_min > 0.0 && self.clip_min < 1.0) {
            return Err(format!("clip_min must be in (0, 1), got {}", self.clip_min));
        }
        if !(self.clip_max > 0.0 && self.clip_max < 1.0) {
            return Err(format!("clip_max must be in (0, 1), got {}", self.clip_max));
        }
        if self.clip_min >= self.clip_max {
            return Err("clip_min must be < clip_max".to_string());
        }
        Ok(())
    }
}

/// Estimated class prior and the counts it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorEstimate {
    /// π after clipping
    pub value: f64,

    /// π before clipping
    pub raw_value: f64,

    /// Reduction used
    pub method: PriorMethod,

    /// POSITIVE entries used
    pub n_positive: usize,

    /// UNLABELED entries used
    pub n_unlabeled: usize,
}

impl PriorEstimate {
    /// Whether clipping changed the raw estimate.
    pub fn was_clipped(&self) -> bool {
        self.value != self.raw_value
    }
}

/// Gaussian product-kernel density estimate with Scott's bandwidth.
#[derive(Debug, Clone)]
pub struct GaussianKde {
    points: Vec<Vec<f64>>,
    bandwidth: f64,
    log_norm: f64,
}

impl GaussianKde {
    /// Fit a KDE on `points` (all of equal dimension).
    pub fn new(points: Vec<Vec<f64>>) -> Result<Self> {
        let n = points.len();
        let d = points.first().map(Vec::len).unwrap_or(0);
        if n == 0 || d == 0 {
            return Err(PrepError::PriorEstimation(
                "density estimate needs at least one non-empty point".to_string(),
            ));
        }

        let bandwidth = scott_bandwidth(n, d);
        let d_f = d as f64;
        let log_norm = -(n as f64).ln()
            - d_f * bandwidth.ln()
            - 0.5 * d_f * (2.0 * std::f64::consts::PI).ln();

        Ok(Self {
            points,
            bandwidth,
            log_norm,
        })
    }

    /// Kernel bandwidth.
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Number of kernel centres.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the estimate has no kernel centres.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// log p(x).
    pub fn log_density(&self, x: &[f64]) -> f64 {
        let inv_two_h2 = 1.0 / (2.0 * self.bandwidth * self.bandwidth);
        let exponents: Vec<f64> = self
            .points
            .iter()
            .map(|p| {
                let sq_dist: f64 = p.iter().zip(x).map(|(a, b)| (a - b).powi(2)).sum();
                -sq_dist * inv_two_h2
            })
            .collect();
        log_sum_exp(&exponents) + self.log_norm
    }
}

/// Scott's rule: `n^(-1 / (d + 4))` in standardised units.
pub fn scott_bandwidth(n: usize, d: usize) -> f64 {
    (n as f64).powf(-1.0 / (d as f64 + 4.0))
}

/// Numerically stable `log(Σ exp(v))`.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }

    let max_val = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max_val.is_infinite() {
        return max_val;
    }

    let sum: f64 = values.iter().map(|&x| (x - max_val).exp()).sum();
    max_val + sum.ln()
}

/// Estimates π from an assembled pool.
#[derive(Debug, Clone, Default)]
pub struct ClassPriorEstimator {
    config: PriorConfig,
}

impl ClassPriorEstimator {
    /// Create an estimator.
    pub fn new(config: PriorConfig) -> Self {
        Self { config }
    }

    /// Estimator configuration.
    pub fn config(&self) -> &PriorConfig {
        &self.config
    }

    /// Estimate π with the configured method.
    pub fn estimate(&self, pool: &SamplePool) -> Result<PriorEstimate> {
        self.estimate_with(pool, self.config.method)
    }

    /// Estimate π with an explicit method.
    ///
    /// # Errors
    ///
    /// [`PrepError::PriorEstimation`] with fewer than 2 POSITIVE or no
    /// UNLABELED entries.
    pub fn estimate_with(&self, pool: &SamplePool, method: PriorMethod) -> Result<PriorEstimate> {
        let ratios = self.density_ratios(pool)?;
        let n_positive = pool.positive_count();
        let n_unlabeled = ratios.len();

        let raw_value = match method {
            PriorMethod::Mean => ratios.iter().sum::<f64>() / n_unlabeled as f64,
            PriorMethod::Median => {
                let mut sorted = ratios;
                sorted.sort_by(|a, b| a.total_cmp(b));
                percentile(&sorted, 50.0)
            }
        };

        let value = if raw_value.is_nan() {
            self.config.clip_min
        } else {
            raw_value.clamp(self.config.clip_min, self.config.clip_max)
        };

        let estimate = PriorEstimate {
            value,
            raw_value,
            method,
            n_positive,
            n_unlabeled,
        };

        if estimate.was_clipped() {
            log::warn!(
                "Class prior ({}) {:.4} clipped to {:.2} (band [{}, {}])",
                method,
                raw_value,
                value,
                self.config.clip_min,
                self.config.clip_max
            );
        }
        log::info!(
            "Class prior pi={:.4} ({}, {} positive, {} unlabeled)",
            value,
            method,
            n_positive,
            n_unlabeled
        );

        Ok(estimate)
    }

    /// Density ratio `p_P(x) / p_U(x)` for every UNLABELED entry, in pool order.
    pub fn density_ratios(&self, pool: &SamplePool) -> Result<Vec<f64>> {
        let n_positive = pool.positive_count();
        if n_positive < MIN_POSITIVE_SAMPLES {
            return Err(PrepError::PriorEstimation(format!(
                "need at least {MIN_POSITIVE_SAMPLES} positive samples, got {n_positive}"
            )));
        }
        if pool.unlabeled_count() == 0 {
            return Err(PrepError::PriorEstimation(
                "no unlabeled samples to estimate the prior on".to_string(),
            ));
        }

        let mut scaler = FeatureScaler::new();
        scaler.fit(pool.entries().iter().map(|e| e.features.as_slice()))?;

        let mut positives = Vec::with_capacity(n_positive);
        let mut unlabeled = Vec::with_capacity(pool.len() - n_positive);
        for entry in pool.entries() {
            let z = scaler.transform(&entry.features)?;
            match entry.label {
                SampleLabel::Positive => positives.push(z),
                SampleLabel::Unlabeled => unlabeled.push(z),
            }
        }

        let p_kde = GaussianKde::new(positives)?;
        let u_kde = GaussianKde::new(unlabeled.clone())?;

        Ok(unlabeled
            .iter()
            .map(|x| {
                let log_ratio = p_kde.log_density(x) - u_kde.log_density(x);
                log_ratio.clamp(-MAX_LOG_RATIO, MAX_LOG_RATIO).exp()
            })
            .collect())
    }
}
