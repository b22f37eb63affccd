//! Configuration for the prediction pipeline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::util::safe_read_to_string;
use crate::error::{PredictionError, Result};

/// Default maximum number of rows accepted in one batch
pub const DEFAULT_MAX_ROWS: usize = 500;

/// Default number of records per report page
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Separator between matched disease names in the categorical field
pub const LABEL_SEPARATOR: &str = ", ";

/// Categorical label used when no rule matched
pub const NO_DIAGNOSIS_LABEL: &str = "None";

/// Rendered value of a field that could not be computed
pub const UNAVAILABLE_SENTINEL: &str = "N/A";

/// Environment variable overriding `max_rows`
pub const MAX_ROWS_ENV: &str = "MEDPREDICT_MAX_ROWS";

/// Environment variable overriding `page_size`
pub const PAGE_SIZE_ENV: &str = "MEDPREDICT_PAGE_SIZE";

/// Configuration for the batch pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Largest dataset a single batch may contain
    pub max_rows: usize,
    /// Records per report page
    pub page_size: usize,
    /// Name of the categorical output column
    pub prediction_column: String,
    /// Name of the patient identifier output column
    pub patient_id_column: String,
    /// Where staged uploads are kept while a batch runs
    pub upload_dir: PathBuf,
    /// Where results files are written
    pub predictions_dir: PathBuf,
    /// Append-only batch history log
    pub history_file: PathBuf,
    /// Optional JSON registry definition, the built-in registry is used otherwise
    pub registry_file: Option<PathBuf>,
    /// Optional directory of estimator artifacts
    pub model_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            page_size: DEFAULT_PAGE_SIZE,
            prediction_column: "Prediction".to_string(),
            patient_id_column: "Patient ID".to_string(),
            upload_dir: PathBuf::from("uploads"),
            predictions_dir: PathBuf::from("predictions"),
            history_file: PathBuf::from("history.json"),
            registry_file: None,
            model_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = safe_read_to_string(path, "loading pipeline configuration")?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MEDPREDICT_MAX_ROWS` / `MEDPREDICT_PAGE_SIZE` from the environment
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(MAX_ROWS_ENV) {
            self.max_rows = parse_override(MAX_ROWS_ENV, &raw)?;
        }
        if let Some(raw) = lookup(PAGE_SIZE_ENV) {
            self.page_size = parse_override(PAGE_SIZE_ENV, &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_rows == 0 {
            return Err(PredictionError::Config("max_rows must be at least 1".to_string()));
        }
        if self.page_size == 0 {
            return Err(PredictionError::Config("page_size must be at least 1".to_string()));
        }
        if self.prediction_column == self.patient_id_column {
            return Err(PredictionError::Config(format!(
                "prediction and patient id columns share the name {}",
                self.prediction_column
            )));
        }
        Ok(())
    }
}

fn parse_override(key: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|e| PredictionError::Config(format!("{key}={raw} is not a row count: {e}")))
}
