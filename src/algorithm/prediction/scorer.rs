//! Disease scorers
//!
//! A disease is backed either by an ensemble of estimators or by a
//! declarative rule. [`DiseaseScorer`] is the tagged union of the two, and
//! [`DiseaseScorer::assess`] is the single entry point the engine calls.

use std::sync::Arc;

use super::estimator::{Estimator, FallbackEstimator};
use super::extraction::FeatureVector;
use crate::error::{EstimatorError, PredictionError, Result};
use crate::models::Condition;

/// Round to two decimal places
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Averages one or more estimators into a risk percentage
#[derive(Debug, Clone)]
pub struct EnsembleScorer {
    disease: String,
    estimators: Vec<Arc<dyn Estimator>>,
}

impl EnsembleScorer {
    /// Create a scorer. An empty estimator list is replaced by the
    /// [`FallbackEstimator`].
    pub fn new(disease: impl Into<String>, estimators: Vec<Arc<dyn Estimator>>) -> Self {
        let disease = disease.into();
        let estimators = if estimators.is_empty() {
            log::info!("No estimators available for {disease}, using fallback scorer");
            vec![Arc::new(FallbackEstimator) as Arc<dyn Estimator>]
        } else {
            estimators
        };
        Self { disease, estimators }
    }

    #[must_use]
    pub fn disease(&self) -> &str {
        &self.disease
    }

    #[must_use]
    pub fn estimators(&self) -> &[Arc<dyn Estimator>] {
        &self.estimators
    }

    /// Whether any member is the simulated fallback
    #[must_use]
    pub fn uses_fallback(&self) -> bool {
        self.estimators.iter().any(|e| e.is_fallback())
    }

    /// Mean of the estimator probabilities, scaled to a percentage and
    /// rounded to two decimals.
    ///
    /// # Errors
    ///
    /// [`PredictionError::Estimator`] if any estimator fails or returns a
    /// value outside [0, 1].
    pub fn score(&self, features: &FeatureVector) -> Result<f64> {
        let mut total = 0.0;
        for estimator in &self.estimators {
            let p = estimator
                .predict_one(features)
                .map_err(|e| PredictionError::estimator(&self.disease, e))?;

            if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                return Err(PredictionError::estimator(
                    &self.disease,
                    EstimatorError::new(
                        estimator.name(),
                        format!("probability {p} outside [0, 1]"),
                    ),
                ));
            }
            total += p;
        }

        let mean = total / self.estimators.len() as f64;
        Ok(round2(mean * 100.0))
    }
}

/// Conjunction of threshold conditions
#[derive(Debug, Clone, PartialEq)]
pub struct RuleScorer {
    disease: String,
    /// Each condition paired with its position in the feature vector
    conditions: Vec<(usize, Condition)>,
}

impl RuleScorer {
    /// Bind conditions to positions in `features`.
    ///
    /// # Errors
    ///
    /// [`PredictionError::Config`] if a condition names a feature that is not
    /// in `features`, or if there are no conditions.
    pub fn new(
        disease: impl Into<String>,
        conditions: Vec<Condition>,
        features: &[String],
    ) -> Result<Self> {
        let disease = disease.into();
        if conditions.is_empty() {
            return Err(PredictionError::Config(format!(
                "rule disease {disease} has no conditions"
            )));
        }

        let conditions = conditions
            .into_iter()
            .map(|condition| {
                features
                    .iter()
                    .position(|f| *f == condition.feature)
                    .map(|index| (index, condition.clone()))
                    .ok_or_else(|| {
                        PredictionError::Config(format!(
                            "rule {condition} of {disease} refers to an unlisted feature"
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { disease, conditions })
    }

    #[must_use]
    pub fn disease(&self) -> &str {
        &self.disease
    }

    /// Whether every condition holds. Positions past the end of the vector
    /// read as 0.
    #[must_use]
    pub fn matches(&self, features: &FeatureVector) -> bool {
        self.conditions.iter().all(|(index, condition)| {
            let value = features.get(*index).unwrap_or(0.0);
            condition.op.holds(value, condition.threshold)
        })
    }
}

/// Outcome of assessing one disease for one row
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Assessment {
    /// Risk percentage in [0, 100]
    Risk(f64),
    /// Whether the rule matched
    Match(bool),
}

/// Scorer backing one disease
#[derive(Debug, Clone)]
pub enum DiseaseScorer {
    Ensemble(EnsembleScorer),
    Rule(RuleScorer),
}

impl DiseaseScorer {
    pub fn assess(&self, features: &FeatureVector) -> Result<Assessment> {
        match self {
            Self::Ensemble(scorer) => scorer.score(features).map(Assessment::Risk),
            Self::Rule(rule) => Ok(Assessment::Match(rule.matches(features))),
        }
    }

    #[must_use]
    pub const fn is_rule(&self) -> bool {
        matches!(self, Self::Rule(_))
    }
}
