//! Batch disease prediction over tabular patient data.
//!
//! A [`DiseaseRegistry`] describes which diseases are predicted and how: rule
//! diseases are matched against thresholds and joined into one categorical
//! field, ensemble diseases average the probabilities of pre-trained
//! estimators into a risk percentage. [`PredictionEngine`] runs a registry
//! over a dataset, [`BatchProcessor`] wraps it with parquet IO and a history
//! log, and the aggregate functions page and count the results.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod utils;

// Core types
pub use config::PipelineConfig;
pub use error::{EstimatorError, ExtractionError, PredictionError, Result};
pub use models::{FieldValue, PredictionRecord, ResultSet, Row, Value};
pub use registry::{DiseaseRegistry, DiseaseSpec};

// Prediction
pub use algorithm::prediction::{
    Estimator, FallbackEstimator, FeatureVector, LogisticEstimator, PredictionEngine, extract,
};
pub use registry::provider::{ArtifactModelProvider, InMemoryModelProvider, ModelProvider, NoModels};

// Aggregation
pub use algorithm::aggregate::{HistogramCounts, Pagination, histogram, paginate, paginate_results};

// Batch IO
pub use export::{read_results, write_results};
pub use history::{HistoryEntry, HistoryLog};
pub use loader::{read_rows, row_count};
pub use pipeline::{BatchOutcome, BatchProcessor, ReportView, UploadGuard, stage_upload};
