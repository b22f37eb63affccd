//! Batch prediction
//!
//! [`PredictionEngine`] maps every row of a dataset to a
//! [`PredictionRecord`] by running each configured disease through feature
//! extraction and its scorer.
//!
//! Failure policy:
//! - more rows than `max_rows` fails the batch before any row is scored
//! - an extraction failure only makes the affected field `N/A`
//! - an estimator failure fails the batch

pub mod estimator;
pub mod extraction;
pub mod scorer;

use std::time::Instant;

use crate::config::{LABEL_SEPARATOR, NO_DIAGNOSIS_LABEL, PipelineConfig};
use crate::error::{ExtractionError, PredictionError, Result};
use crate::models::{BatchDiagnostics, FieldValue, PredictionRecord, ResultSet, Row, RowIssue};
use crate::registry::{DiseaseRegistry, DiseaseSpec};
use crate::utils::logging::log_batch_diagnostics;
use scorer::Assessment;

pub use estimator::{Estimator, FallbackEstimator, LogisticEstimator};
pub use extraction::{FeatureVector, extract, extract_or_zero};
pub use scorer::{EnsembleScorer, RuleScorer};

/// Runs a [`DiseaseRegistry`] over datasets
#[derive(Debug, Clone, Copy)]
pub struct PredictionEngine<'a> {
    registry: &'a DiseaseRegistry,
    max_rows: usize,
}

impl<'a> PredictionEngine<'a> {
    #[must_use]
    pub const fn new(registry: &'a DiseaseRegistry, config: &PipelineConfig) -> Self {
        Self {
            registry,
            max_rows: config.max_rows,
        }
    }

    #[must_use]
    pub const fn with_max_rows(registry: &'a DiseaseRegistry, max_rows: usize) -> Self {
        Self { registry, max_rows }
    }

    /// Check the dataset-level precondition
    pub fn check_row_count(&self, rows: usize) -> Result<()> {
        if rows > self.max_rows {
            return Err(PredictionError::RowLimitExceeded {
                rows,
                max: self.max_rows,
            });
        }
        Ok(())
    }

    /// Predict every row. Records keep input order and patient ids are
    /// 1-based row positions.
    ///
    /// # Errors
    ///
    /// - [`PredictionError::RowLimitExceeded`] before any work is done
    /// - [`PredictionError::Estimator`] if a model fails on a valid vector
    pub fn run(&self, rows: &[Row]) -> Result<ResultSet> {
        self.check_row_count(rows.len())?;

        let start = Instant::now();
        let mut diagnostics = BatchDiagnostics {
            fallback_diseases: self
                .registry
                .ensembles()
                .filter(|(_, ensemble)| ensemble.uses_fallback())
                .map(|(spec, _)| spec.name.clone())
                .collect(),
            ..BatchDiagnostics::default()
        };

        let records = rows
            .iter()
            .enumerate()
            .map(|(i, row)| self.predict_row(i + 1, row, &mut diagnostics))
            .collect::<Result<Vec<_>>>()?;

        log_batch_diagnostics(&diagnostics);
        log::info!("Scored {} rows in {:?}", records.len(), start.elapsed());

        Ok(ResultSet {
            records,
            diagnostics,
        })
    }

    /// Predict a single row
    pub fn predict_row(
        &self,
        patient_id: usize,
        row: &Row,
        diagnostics: &mut BatchDiagnostics,
    ) -> Result<PredictionRecord> {
        let mut record = PredictionRecord::new(patient_id);

        for (spec, ensemble) in self.registry.ensembles() {
            let value = match extraction::extract(row, &spec.features) {
                Ok(features) => FieldValue::Risk(ensemble.score(&features)?),
                Err(error) => {
                    record_issue(diagnostics, patient_id, spec, error);
                    FieldValue::Unavailable
                }
            };
            record.risks.push((spec.name.clone(), value));
        }

        if self.registry.has_rules() {
            record.prediction = Some(self.categorize(patient_id, row, diagnostics)?);
        }

        Ok(record)
    }

    /// Evaluate every rule disease and join the matches in priority order
    fn categorize(
        &self,
        patient_id: usize,
        row: &Row,
        diagnostics: &mut BatchDiagnostics,
    ) -> Result<FieldValue> {
        let mut matched = Vec::new();
        let mut indeterminate = false;

        for spec in self.registry.rule_specs() {
            match extraction::extract_or_zero(row, &spec.features) {
                Ok(features) => {
                    if spec.scorer.assess(&features)? == Assessment::Match(true) {
                        matched.push(spec.name.as_str());
                    }
                }
                Err(error) => {
                    record_issue(diagnostics, patient_id, spec, error);
                    indeterminate = true;
                }
            }
        }

        Ok(if indeterminate {
            FieldValue::Unavailable
        } else if matched.is_empty() {
            FieldValue::Label(NO_DIAGNOSIS_LABEL.to_string())
        } else {
            FieldValue::Label(matched.join(LABEL_SEPARATOR))
        })
    }
}

fn record_issue(
    diagnostics: &mut BatchDiagnostics,
    patient_id: usize,
    spec: &DiseaseSpec,
    error: ExtractionError,
) {
    log::warn!("Row {patient_id}: {} unavailable ({error})", spec.name);
    diagnostics.issues.push(RowIssue {
        patient_id,
        disease: spec.name.clone(),
        error,
    });
}
