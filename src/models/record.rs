//! Per-patient prediction output

use crate::config::{PipelineConfig, UNAVAILABLE_SENTINEL};
use crate::error::ExtractionError;

/// One computed output field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Continuous risk percentage in [0, 100]
    Risk(f64),
    /// Categorical label, possibly several joined names
    Label(String),
    /// The field could not be computed for this row
    Unavailable,
}

impl FieldValue {
    #[must_use]
    pub const fn risk(&self) -> Option<f64> {
        match self {
            Self::Risk(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Label(label) => Some(label),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }

    /// JSON form: numbers for risks, strings otherwise
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Risk(value) => serde_json::Value::from(*value),
            Self::Label(label) => serde_json::Value::from(label.as_str()),
            Self::Unavailable => serde_json::Value::from(UNAVAILABLE_SENTINEL),
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Risk(value) => write!(f, "{value:.2}"),
            Self::Label(label) => write!(f, "{label}"),
            Self::Unavailable => write!(f, "{UNAVAILABLE_SENTINEL}"),
        }
    }
}

/// Predictions for one input row
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    /// 1-based position of the row in the input
    pub patient_id: usize,
    /// One continuous field per ensemble disease, in registry order
    pub risks: Vec<(String, FieldValue)>,
    /// Joined rule matches, present when the registry has rule diseases
    pub prediction: Option<FieldValue>,
}

impl PredictionRecord {
    #[must_use]
    pub const fn new(patient_id: usize) -> Self {
        Self {
            patient_id,
            risks: Vec::new(),
            prediction: None,
        }
    }

    /// Look up a continuous field by disease name
    #[must_use]
    pub fn risk(&self, disease: &str) -> Option<&FieldValue> {
        self.risks
            .iter()
            .find(|(name, _)| name == disease)
            .map(|(_, value)| value)
    }

    /// The categorical label, if one was computed
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.prediction.as_ref().and_then(FieldValue::label)
    }

    /// Flat JSON object: patient id, risk columns, then the categorical field
    #[must_use]
    pub fn to_json(&self, config: &PipelineConfig) -> serde_json::Value {
        let mut object = serde_json::Map::with_capacity(self.risks.len() + 2);
        object.insert(config.patient_id_column.clone(), self.patient_id.into());
        for (name, value) in &self.risks {
            object.insert(name.clone(), value.to_json());
        }
        if let Some(prediction) = &self.prediction {
            object.insert(config.prediction_column.clone(), prediction.to_json());
        }
        serde_json::Value::Object(object)
    }
}

/// A recovered extraction problem
#[derive(Debug, Clone, PartialEq)]
pub struct RowIssue {
    pub patient_id: usize,
    pub disease: String,
    pub error: ExtractionError,
}

/// Observability counters collected while a batch runs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchDiagnostics {
    /// Every recovered extraction failure, in processing order
    pub issues: Vec<RowIssue>,
    /// Diseases scored by the fallback estimator
    pub fallback_diseases: Vec<String>,
}

impl BatchDiagnostics {
    #[must_use]
    pub fn missing_columns(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| matches!(issue.error, ExtractionError::MissingColumn(_)))
            .count()
    }

    #[must_use]
    pub fn invalid_values(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| matches!(issue.error, ExtractionError::InvalidValue { .. }))
            .count()
    }
}

/// Ordered predictions for a whole batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub records: Vec<PredictionRecord>,
    pub diagnostics: BatchDiagnostics,
}

impl ResultSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PredictionRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a PredictionRecord;
    type IntoIter = std::slice::Iter<'a, PredictionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
