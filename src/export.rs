//! Results file export
//!
//! A results file holds the patient id, the input columns and the computed
//! fields for every row of a batch. Risk columns are nullable `Float64`
//! where null means the field was unavailable; the categorical column is
//! `Utf8` and carries the `N/A` sentinel directly.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arrow::array::{
    Array, ArrayRef, AsArray, Float64Builder, Int64Array, StringArray, StringBuilder,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::config::{PipelineConfig, UNAVAILABLE_SENTINEL};
use crate::error::util::safe_open_file;
use crate::error::{PredictionError, Result};
use crate::models::{FieldValue, PredictionRecord, ResultSet, Row, Value};
use crate::registry::DiseaseRegistry;
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Write a batch's input rows and predictions to a parquet file.
///
/// `rows` and `result_set.records` must line up one-to-one.
///
/// # Arguments
/// * `path` - Destination file, overwritten if it exists
/// * `rows` - The input rows the result set was computed from
/// * `result_set` - Predictions for `rows`
/// * `registry` - Decides which output columns exist
/// * `config` - Output column names
pub fn write_results(
    path: &Path,
    rows: &[Row],
    result_set: &ResultSet,
    registry: &DiseaseRegistry,
    config: &PipelineConfig,
) -> Result<()> {
    if rows.len() != result_set.len() {
        return Err(PredictionError::Schema(format!(
            "{} input rows but {} prediction records",
            rows.len(),
            result_set.len()
        )));
    }

    let start = Instant::now();
    log_operation_start("Writing results to", path);

    let ensemble: Vec<&str> = registry.ensemble_specs().map(|s| s.name.as_str()).collect();
    let reserved = |name: &str| {
        name == config.patient_id_column
            || name == config.prediction_column
            || ensemble.contains(&name)
    };

    let mut fields = vec![Field::new(&config.patient_id_column, DataType::Int64, false)];
    let mut arrays: Vec<ArrayRef> = vec![Arc::new(Int64Array::from_iter_values(
        result_set.iter().map(|r| i64::try_from(r.patient_id).unwrap_or(i64::MAX)),
    ))];

    if let Some(first) = rows.first() {
        for (index, name) in first.schema().columns().iter().enumerate() {
            if reserved(name) {
                log::debug!("Input column {name} is replaced by the computed column");
                continue;
            }
            let (data_type, array) = input_column(rows, index);
            fields.push(Field::new(name, data_type, true));
            arrays.push(array);
        }
    }

    for disease in &ensemble {
        let mut builder = Float64Builder::with_capacity(result_set.len());
        for record in result_set {
            builder.append_option(record.risk(disease).and_then(FieldValue::risk));
        }
        fields.push(Field::new(*disease, DataType::Float64, true));
        arrays.push(Arc::new(builder.finish()));
    }

    if registry.has_rules() {
        let mut builder = StringBuilder::new();
        for record in result_set {
            match &record.prediction {
                Some(value) => builder.append_value(value.to_string()),
                None => builder.append_value(UNAVAILABLE_SENTINEL),
            }
        }
        fields.push(Field::new(&config.prediction_column, DataType::Utf8, false));
        arrays.push(Arc::new(builder.finish()));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(Arc::clone(&schema), arrays)?;

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;

    log_operation_complete("wrote", path, result_set.len(), Some(start.elapsed()));
    Ok(())
}

/// Build one input column. A column holding any text is written as `Utf8`,
/// everything else as `Float64`.
fn input_column(rows: &[Row], index: usize) -> (DataType, ArrayRef) {
    let cell = |row: &Row| row.values().get(index).cloned().unwrap_or(Value::Missing);
    let has_text = rows.iter().any(|row| matches!(cell(row), Value::Text(_)));

    if has_text {
        let mut builder = StringBuilder::new();
        for row in rows {
            match cell(row) {
                Value::Missing => builder.append_null(),
                value => builder.append_value(value.to_string()),
            }
        }
        (DataType::Utf8, Arc::new(builder.finish()))
    } else {
        let mut builder = Float64Builder::with_capacity(rows.len());
        for row in rows {
            builder.append_option(cell(row).as_finite());
        }
        (DataType::Float64, Arc::new(builder.finish()))
    }
}

/// Read a results file back into a [`ResultSet`].
///
/// Input columns are ignored. Diagnostics are not stored in the file and
/// come back empty.
///
/// # Errors
///
/// [`PredictionError::Schema`] if the patient id column, a risk column of
/// the registry or the categorical column is missing.
pub fn read_results(
    path: &Path,
    registry: &DiseaseRegistry,
    config: &PipelineConfig,
) -> Result<ResultSet> {
    let start = Instant::now();
    log_operation_start("Reading results from", path);

    let file = safe_open_file(path, "reading results")?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut records = Vec::new();
    for batch in reader {
        records.extend(batch_records(&batch?, registry, config)?);
    }

    log_operation_complete("read", path, records.len(), Some(start.elapsed()));
    Ok(ResultSet {
        records,
        diagnostics: Default::default(),
    })
}

fn batch_records(
    batch: &RecordBatch,
    registry: &DiseaseRegistry,
    config: &PipelineConfig,
) -> Result<Vec<PredictionRecord>> {
    let ids = cast(required(batch, &config.patient_id_column)?, &DataType::Int64)?;
    let ids = ids.as_primitive::<Int64Type>();

    let risk_columns = registry
        .ensemble_specs()
        .map(|spec| {
            let column = cast(required(batch, &spec.name)?, &DataType::Float64)?;
            Ok((spec.name.as_str(), column))
        })
        .collect::<Result<Vec<_>>>()?;

    let labels = if registry.has_rules() {
        let column = required(batch, &config.prediction_column)?;
        let strings = column
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                PredictionError::Schema(format!(
                    "column {} is {}, expected Utf8",
                    config.prediction_column,
                    column.data_type()
                ))
            })?
            .clone();
        Some(strings)
    } else {
        None
    };

    (0..batch.num_rows())
        .map(|row| {
            let patient_id = usize::try_from(ids.value(row)).map_err(|_| {
                PredictionError::Schema(format!("negative patient id {}", ids.value(row)))
            })?;
            let mut record = PredictionRecord::new(patient_id);

            for (name, column) in &risk_columns {
                let scores = column.as_primitive::<Float64Type>();
                let value = if scores.is_null(row) {
                    FieldValue::Unavailable
                } else {
                    FieldValue::Risk(scores.value(row))
                };
                record.risks.push(((*name).to_string(), value));
            }

            record.prediction = labels.as_ref().map(|labels| {
                if labels.is_null(row) || labels.value(row) == UNAVAILABLE_SENTINEL {
                    FieldValue::Unavailable
                } else {
                    FieldValue::Label(labels.value(row).to_string())
                }
            });
            Ok(record)
        })
        .collect()
}

fn required<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| PredictionError::Schema(format!("results file has no column {name}")))
}
