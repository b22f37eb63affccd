//! Parquet file loading
//!
//! Reads an input dataset into [`Row`]s. Numeric and boolean columns
//! become numbers, string columns become text, and any other column type is
//! rendered to text with Arrow's display formatting.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arrow::array::{Array, ArrayRef, AsArray, LargeStringArray, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::Result;
use crate::error::util::safe_open_file;
use crate::models::{Row, RowSchema, Value};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Number of rows in a parquet file, read from the footer without decoding
/// any data
pub fn row_count(path: &Path) -> Result<usize> {
    let file = safe_open_file(path, "counting rows")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let rows = builder.metadata().file_metadata().num_rows();
    Ok(usize::try_from(rows).unwrap_or(0))
}

/// Read every row of a parquet file
pub fn read_rows(path: &Path) -> Result<Vec<Row>> {
    let start = Instant::now();
    log_operation_start("Reading rows from", path);

    let file = safe_open_file(path, "reading input rows")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = Arc::new(RowSchema::new(
        builder.schema().fields().iter().map(|f| f.name().clone()),
    ));
    let reader = builder.build()?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch?;
        rows.extend(batch_to_rows(&batch, &schema)?);
    }

    log_operation_complete("read", path, rows.len(), Some(start.elapsed()));
    Ok(rows)
}

/// Convert one record batch into rows sharing `schema`
pub fn batch_to_rows(batch: &RecordBatch, schema: &Arc<RowSchema>) -> Result<Vec<Row>> {
    let columns = batch
        .columns()
        .iter()
        .map(column_values)
        .collect::<Result<Vec<_>>>()?;

    Ok((0..batch.num_rows())
        .map(|row| {
            let values = columns.iter().map(|column| column[row].clone()).collect();
            Row::new(Arc::clone(schema), values)
        })
        .collect())
}

/// Decode one column into cell values
fn column_values(array: &ArrayRef) -> Result<Vec<Value>> {
    let values = match array.data_type() {
        dt if dt.is_numeric() || *dt == DataType::Boolean => {
            let floats = cast(array, &DataType::Float64)?;
            floats
                .as_primitive::<Float64Type>()
                .iter()
                .map(|v| v.map_or(Value::Missing, Value::Number))
                .collect()
        }
        DataType::Utf8 => array
            .as_any()
            .downcast_ref::<StringArray>()
            .map(|strings| strings.iter().map(text_value).collect())
            .unwrap_or_default(),
        DataType::LargeUtf8 => array
            .as_any()
            .downcast_ref::<LargeStringArray>()
            .map(|strings| strings.iter().map(text_value).collect())
            .unwrap_or_default(),
        other => {
            log::debug!("Reading {other} column as text");
            (0..array.len())
                .map(|i| {
                    if array.is_null(i) {
                        Ok(Value::Missing)
                    } else {
                        array_value_to_string(array, i).map(Value::Text)
                    }
                })
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };
    Ok(values)
}

fn text_value(value: Option<&str>) -> Value {
    match value {
        Some(s) if !s.trim().is_empty() => Value::Text(s.to_string()),
        _ => Value::Missing,
    }
}
