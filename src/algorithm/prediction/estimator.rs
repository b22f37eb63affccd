//! Estimators
//!
//! An [`Estimator`] is anything that turns a feature vector into a
//! probability of the positive class. Real models and the deterministic
//! fallback implement the same trait, so scoring code never needs to know
//! which one it is holding.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::extraction::FeatureVector;
use crate::error::EstimatorError;

/// A pre-trained scoring function for one disease
pub trait Estimator: fmt::Debug + Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    /// Probability of the positive class, in [0, 1]
    fn predict_one(&self, features: &FeatureVector) -> Result<f64, EstimatorError>;

    /// Whether this is the simulated stand-in for a missing model
    fn is_fallback(&self) -> bool {
        false
    }
}

/// Deterministic stand-in used when no real estimator is available.
///
/// Probability is the last feature value divided by 100, clamped to [0, 1].
/// An empty vector scores 0.
#[derive(Debug, Clone, Default)]
pub struct FallbackEstimator;

impl FallbackEstimator {
    pub const NAME: &'static str = "fallback";
}

impl Estimator for FallbackEstimator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn predict_one(&self, features: &FeatureVector) -> Result<f64, EstimatorError> {
        let signal = features.last().unwrap_or(0.0);
        Ok((signal / 100.0).clamp(0.0, 1.0))
    }

    fn is_fallback(&self) -> bool {
        true
    }
}

/// Serialized logistic-regression artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticArtifact {
    pub name: String,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Per-feature centring, defaults to 0
    #[serde(default)]
    pub scaler_mean: Option<Vec<f64>>,
    /// Per-feature scale, defaults to 1
    #[serde(default)]
    pub scaler_scale: Option<Vec<f64>>,
}

/// Standardised logistic regression:
/// `p = sigmoid(b + Σ wᵢ · (xᵢ − μᵢ) / σᵢ)`
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticEstimator {
    name: String,
    coefficients: Vec<f64>,
    intercept: f64,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl LogisticEstimator {
    /// Plain logistic model without standardisation
    pub fn new(name: impl Into<String>, coefficients: Vec<f64>, intercept: f64) -> Self {
        let n = coefficients.len();
        Self {
            name: name.into(),
            coefficients,
            intercept,
            mean: vec![0.0; n],
            scale: vec![1.0; n],
        }
    }

    /// Build from an artifact, checking that every vector has one entry per
    /// coefficient and that scales are usable divisors.
    pub fn from_artifact(artifact: LogisticArtifact) -> Result<Self, EstimatorError> {
        let n = artifact.coefficients.len();
        let mean = artifact.scaler_mean.unwrap_or_else(|| vec![0.0; n]);
        let scale = artifact.scaler_scale.unwrap_or_else(|| vec![1.0; n]);

        if mean.len() != n || scale.len() != n {
            return Err(EstimatorError::new(
                &artifact.name,
                format!(
                    "scaler length mismatch: {n} coefficients, {} means, {} scales",
                    mean.len(),
                    scale.len()
                ),
            ));
        }
        if let Some(bad) = scale.iter().find(|s| !s.is_finite() || **s == 0.0) {
            return Err(EstimatorError::new(
                &artifact.name,
                format!("unusable scale value {bad}"),
            ));
        }
        let all_finite = artifact
            .coefficients
            .iter()
            .chain(&mean)
            .chain(std::iter::once(&artifact.intercept))
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(EstimatorError::new(&artifact.name, "non-finite parameter"));
        }

        Ok(Self {
            name: artifact.name,
            coefficients: artifact.coefficients,
            intercept: artifact.intercept,
            mean,
            scale,
        })
    }

    /// Number of features the model expects
    #[must_use]
    pub fn input_len(&self) -> usize {
        self.coefficients.len()
    }
}

impl Estimator for LogisticEstimator {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_one(&self, features: &FeatureVector) -> Result<f64, EstimatorError> {
        if features.len() != self.coefficients.len() {
            return Err(EstimatorError::new(
                &self.name,
                format!(
                    "feature length mismatch: got {}, expected {}",
                    features.len(),
                    self.coefficients.len()
                ),
            ));
        }

        let logit = features
            .as_slice()
            .iter()
            .zip(&self.coefficients)
            .zip(self.mean.iter().zip(&self.scale))
            .fold(self.intercept, |acc, ((x, w), (mu, sigma))| {
                acc + w * (x - mu) / sigma
            });

        Ok(1.0 / (1.0 + (-logit).exp()))
    }
}
