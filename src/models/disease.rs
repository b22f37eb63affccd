//! Declarative disease definitions
//!
//! These are the serializable descriptions a registry is built from. Rule
//! diseases carry their conditions inline; ensemble diseases only name the
//! features their estimators expect, the estimators themselves come from a
//! model provider.

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Comparison operator of a rule condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    AtMost,
}

impl Comparison {
    #[must_use]
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::AtLeast => value >= threshold,
            Self::LessThan => value < threshold,
            Self::AtMost => value <= threshold,
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::GreaterThan => ">",
            Self::AtLeast => ">=",
            Self::LessThan => "<",
            Self::AtMost => "<=",
        }
    }
}

/// One threshold test over a named feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub feature: String,
    pub op: Comparison,
    pub threshold: f64,
}

impl Condition {
    pub fn new(feature: impl Into<String>, op: Comparison, threshold: f64) -> Self {
        Self {
            feature: feature.into(),
            op,
            threshold,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.feature, self.op.symbol(), self.threshold)
    }
}

/// Serializable description of one disease
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DiseaseDefinition {
    /// Deterministic conjunction of threshold conditions
    Rules {
        name: String,
        conditions: Vec<Condition>,
    },
    /// Learned estimators averaged into one risk percentage
    Ensemble {
        name: String,
        features: Vec<String>,
    },
}

impl DiseaseDefinition {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Rules { name, .. } | Self::Ensemble { name, .. } => name,
        }
    }

    /// Ordered, de-duplicated feature names this disease reads
    #[must_use]
    pub fn features(&self) -> Vec<String> {
        match self {
            Self::Rules { conditions, .. } => conditions
                .iter()
                .map(|c| c.feature.clone())
                .unique()
                .collect(),
            Self::Ensemble { features, .. } => features.clone(),
        }
    }
}

/// A full registry definition file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryDefinition {
    pub diseases: Vec<DiseaseDefinition>,
}
