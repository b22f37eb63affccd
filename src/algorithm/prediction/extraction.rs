//! Feature extraction
//!
//! Turns a [`Row`] into the positional [`FeatureVector`] a scorer expects.
//! Position `i` of the vector always corresponds to `feature_names[i]`.

use smallvec::SmallVec;

use crate::error::ExtractionError;
use crate::models::{Row, Value};

/// Ordered numeric inputs for one disease
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    values: SmallVec<[f64; 8]>,
}

impl FeatureVector {
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    #[must_use]
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self {
            values: SmallVec::from_vec(values),
        }
    }
}

impl From<&[f64]> for FeatureVector {
    fn from(values: &[f64]) -> Self {
        Self {
            values: SmallVec::from_slice(values),
        }
    }
}

impl FromIterator<f64> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

fn invalid(column: &str, value: &Value) -> ExtractionError {
    ExtractionError::InvalidValue {
        column: column.to_string(),
        raw: value.to_string(),
    }
}

/// Extract the named features from a row.
///
/// # Errors
///
/// - [`ExtractionError::MissingColumn`] if a name is not a column of the row
/// - [`ExtractionError::InvalidValue`] if a cell is text, empty or a
///   non-finite number
pub fn extract<S: AsRef<str>>(
    row: &Row,
    feature_names: &[S],
) -> Result<FeatureVector, ExtractionError> {
    feature_names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            let value = row
                .get(name)
                .ok_or_else(|| ExtractionError::MissingColumn(name.to_string()))?;
            value.as_finite().ok_or_else(|| invalid(name, value))
        })
        .collect::<Result<Vec<f64>, _>>()
        .map(FeatureVector::from)
}

/// Extract features for rule evaluation.
///
/// Absent columns read as `0.0`. Empty cells read as NaN, which fails every
/// threshold comparison, so a blank cell never satisfies a condition. Text
/// and non-finite numbers still fail, since a rule cannot be evaluated
/// against them.
pub fn extract_or_zero<S: AsRef<str>>(
    row: &Row,
    feature_names: &[S],
) -> Result<FeatureVector, ExtractionError> {
    feature_names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            match row.get(name) {
                None => Ok(0.0),
                Some(Value::Missing) => Ok(f64::NAN),
                Some(value) => value.as_finite().ok_or_else(|| invalid(name, value)),
            }
        })
        .collect::<Result<Vec<f64>, _>>()
        .map(FeatureVector::from)
}
