use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use medpredict::{Estimator, EstimatorError, FeatureVector, Row, Value};
use parquet::arrow::ArrowWriter;

/// Estimator returning the same probability for every vector
#[derive(Debug)]
pub struct ConstantEstimator {
    pub name: String,
    pub probability: f64,
}

impl ConstantEstimator {
    pub fn arc(name: &str, probability: f64) -> Arc<dyn Estimator> {
        Arc::new(Self {
            name: name.to_string(),
            probability,
        })
    }
}

impl Estimator for ConstantEstimator {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_one(&self, _features: &FeatureVector) -> Result<f64, EstimatorError> {
        Ok(self.probability)
    }
}

/// Estimator that always fails
#[derive(Debug)]
pub struct FailingEstimator;

impl Estimator for FailingEstimator {
    fn name(&self) -> &str {
        "failing"
    }

    fn predict_one(&self, _features: &FeatureVector) -> Result<f64, EstimatorError> {
        Err(EstimatorError::new("failing", "model file truncated"))
    }
}

/// Row with the four screening columns
pub fn screening_row(age: f64, bmi: f64, cholesterol: f64, blood_pressure: f64) -> Row {
    Row::from_pairs([
        ("Age", Value::from(age)),
        ("BMI", Value::from(bmi)),
        ("Cholesterol", Value::from(cholesterol)),
        ("Blood Pressure", Value::from(blood_pressure)),
    ])
}

/// `n` rows that match no screening rule
pub fn healthy_rows(n: usize) -> Vec<Row> {
    (0..n).map(|_| screening_row(40.0, 22.0, 200.0, 120.0)).collect()
}

/// Write a small patient dataset: an integer age column, float columns and a
/// string name column
pub fn write_patients(path: &Path, patients: &[(&str, i64, f64, f64, f64)]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Name", DataType::Utf8, true),
        Field::new("Age", DataType::Int64, true),
        Field::new("BMI", DataType::Float64, true),
        Field::new("Cholesterol", DataType::Float64, true),
        Field::new("Blood Pressure", DataType::Float64, true),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(patients.iter().map(|p| p.0))),
        Arc::new(Int64Array::from_iter_values(patients.iter().map(|p| p.1))),
        Arc::new(Float64Array::from_iter_values(patients.iter().map(|p| p.2))),
        Arc::new(Float64Array::from_iter_values(patients.iter().map(|p| p.3))),
        Arc::new(Float64Array::from_iter_values(patients.iter().map(|p| p.4))),
    ];
    let batch = RecordBatch::try_new(Arc::clone(&schema), columns).unwrap();

    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

/// Write `n` identical healthy patients
pub fn write_healthy_patients(path: &Path, n: usize) {
    let patients: Vec<_> = (0..n).map(|_| ("anon", 40, 22.0, 200.0, 120.0)).collect();
    write_patients(path, &patients);
}
