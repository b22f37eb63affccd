//! Batch processing
//!
//! Ties staging, loading, prediction, export and history together. A batch
//! either completes and leaves a results file plus a history entry, or fails
//! and leaves neither. The staged upload is removed in both cases.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use crate::algorithm::aggregate::{HistogramCounts, Pagination, histogram, paginate_results};
use crate::algorithm::prediction::PredictionEngine;
use crate::config::PipelineConfig;
use crate::error::util::ensure_directory;
use crate::error::{PredictionError, Result};
use crate::export::write_results;
use crate::history::{HistoryEntry, HistoryLog};
use crate::loader::{read_rows, row_count};
use crate::models::ResultSet;
use crate::registry::DiseaseRegistry;
use crate::utils::logging::log_warning;

/// Extension accepted for uploaded datasets
pub const UPLOAD_EXTENSION: &str = "parquet";

/// A staged copy of an uploaded dataset, deleted when dropped
#[derive(Debug)]
pub struct UploadGuard {
    path: PathBuf,
}

impl UploadGuard {
    /// Take ownership of a file that should not outlive the batch
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the staged copy
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File stem of the staged copy, the batch's id
    #[must_use]
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed staged upload {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log_warning(
                &format!("Failed to remove staged upload ({e})"),
                Some(&self.path),
            ),
        }
    }
}

/// Copy a dataset into `upload_dir` under a fresh `<uuid>.parquet` name
///
/// # Arguments
/// * `source` - The uploaded file, left untouched
/// * `upload_dir` - Staging directory, created if missing
///
/// # Errors
///
/// [`PredictionError::InvalidUpload`] if `source` is not a parquet file.
pub fn stage_upload(source: &Path, upload_dir: &Path) -> Result<UploadGuard> {
    let is_parquet = source
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(UPLOAD_EXTENSION));
    if !is_parquet {
        return Err(PredictionError::InvalidUpload {
            path: source.to_path_buf(),
            reason: format!("expected a .{UPLOAD_EXTENSION} file"),
        });
    }
    if !source.is_file() {
        return Err(PredictionError::InvalidUpload {
            path: source.to_path_buf(),
            reason: "no such file".to_string(),
        });
    }

    ensure_directory(upload_dir, "staging uploads")?;
    let staged = upload_dir.join(format!("{}.{UPLOAD_EXTENSION}", Uuid::new_v4()));
    let guard = copy_into(source, UploadGuard::new(staged))?;

    log::info!("Staged {} as {}", source.display(), guard.path().display());
    Ok(guard)
}

/// Copy `source` to the guarded path. On failure the guard is dropped, which
/// removes anything the copy left behind.
fn copy_into(source: &Path, guard: UploadGuard) -> Result<UploadGuard> {
    std::fs::copy(source, guard.path())?;
    Ok(guard)
}

/// Result of a completed batch
#[derive(Debug)]
pub struct BatchOutcome {
    pub result_set: ResultSet,
    /// Path of the written results file
    pub result_file: PathBuf,
    pub history: HistoryEntry,
}

/// One page of a result set ready for display
#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub rows: Vec<serde_json::Value>,
    pub pagination: Pagination,
    pub histogram: HistogramCounts,
    /// Records whose categorical field is `N/A`
    pub unavailable: usize,
}

/// Runs batches against a shared registry
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    registry: Arc<DiseaseRegistry>,
    config: PipelineConfig,
    history: HistoryLog,
}

impl BatchProcessor {
    /// # Errors
    ///
    /// [`PredictionError::Config`] if a disease name collides with an output
    /// column of `config`.
    pub fn new(registry: Arc<DiseaseRegistry>, config: PipelineConfig) -> Result<Self> {
        registry.check_output_columns(&config)?;
        let history = HistoryLog::new(&config.history_file);
        Ok(Self {
            registry,
            config,
            history,
        })
    }

    #[must_use]
    pub fn registry(&self) -> &DiseaseRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub const fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Process a staged upload. The guard is consumed so the staged file is
    /// removed however the batch ends.
    ///
    /// # Errors
    ///
    /// - [`PredictionError::RowLimitExceeded`] before any row is decoded
    /// - any load, estimator or write failure
    pub fn process(&self, upload: UploadGuard) -> Result<BatchOutcome> {
        let start = Instant::now();
        let engine = PredictionEngine::new(&self.registry, &self.config);

        engine.check_row_count(row_count(upload.path())?)?;
        let rows = read_rows(upload.path())?;
        let result_set = engine.run(&rows)?;

        ensure_directory(&self.config.predictions_dir, "writing results")?;
        let result_name = format!("results_{}.{UPLOAD_EXTENSION}", upload.stem());
        let result_file = self.config.predictions_dir.join(&result_name);
        write_results(&result_file, &rows, &result_set, &self.registry, &self.config)?;

        let history = HistoryEntry::new(upload.file_name(), result_name, result_set.len());
        if let Err(e) = self.history.append(&history) {
            if let Err(remove) = std::fs::remove_file(&result_file) {
                log_warning(
                    &format!("Failed to remove orphaned results file ({remove})"),
                    Some(&result_file),
                );
            }
            return Err(e);
        }

        log::info!(
            "Batch {} finished: {} rows in {:?}",
            history.short_id(),
            result_set.len(),
            start.elapsed()
        );

        Ok(BatchOutcome {
            result_set,
            result_file,
            history,
        })
    }

    /// Build the display view of one page
    pub fn report(&self, result_set: &ResultSet, page: usize) -> Result<ReportView> {
        let (records, pagination) = paginate_results(result_set, page, self.config.page_size);
        let histogram = histogram(result_set, &self.registry.categorical_labels())?;

        Ok(ReportView {
            rows: records.iter().map(|r| r.to_json(&self.config)).collect(),
            pagination,
            unavailable: histogram.unavailable(),
            histogram,
        })
    }
}
