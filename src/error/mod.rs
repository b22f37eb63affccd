//! Error handling for the prediction pipeline.
//!
//! Two levels of failure exist. [`ExtractionError`] describes a single
//! disease on a single row and is recovered inside the engine. Everything in
//! [`PredictionError`] aborts the batch it occurs in.

pub mod util;

use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Failure to build a feature vector from a row
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractionError {
    /// The column is not part of the row's schema
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// The column exists but its value is not a finite number
    #[error("Invalid value in column {column}: {raw}")]
    InvalidValue {
        /// Column the value was read from
        column: String,
        /// Display form of the offending value
        raw: String,
    },
}

impl ExtractionError {
    /// Name of the column that caused the failure
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::MissingColumn(column) | Self::InvalidValue { column, .. } => column,
        }
    }
}

/// Failure raised by a single estimator
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("estimator {estimator}: {reason}")]
pub struct EstimatorError {
    /// Name of the estimator that failed
    pub estimator: String,
    /// What went wrong
    pub reason: String,
}

impl EstimatorError {
    pub fn new(estimator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            estimator: estimator.into(),
            reason: reason.into(),
        }
    }
}

/// Specialized error type for the prediction pipeline
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    /// A row could not be turned into features (only surfaced by direct
    /// extractor calls, the engine recovers these)
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// An estimator failed after extraction succeeded
    #[error("Estimator error for {disease}: {source}")]
    Estimator {
        disease: String,
        #[source]
        source: EstimatorError,
    },

    /// A categorical token is not in the aggregator's label set
    #[error("Unknown label: {0}")]
    UnknownLabel(String),

    /// The dataset is larger than a single batch may be
    #[error("Row limit exceeded: {rows} rows, maximum is {max}")]
    RowLimitExceeded { rows: usize, max: usize },

    /// Configuration or registry definition is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The uploaded file is not acceptable input
    #[error("Invalid upload {path}: {reason}")]
    InvalidUpload { path: PathBuf, reason: String },

    /// The data file does not have the expected layout
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PredictionError {
    /// Wrap an estimator failure with the disease it belongs to
    pub fn estimator(disease: impl Into<String>, source: EstimatorError) -> Self {
        Self::Estimator {
            disease: disease.into(),
            source,
        }
    }

    /// Whether this error aborts a whole batch
    #[must_use]
    pub const fn is_batch_fatal(&self) -> bool {
        !matches!(self, Self::Extraction(_))
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PredictionError>;
