//! Batch history log
//!
//! One JSON object per line, appended after every successful batch.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::util::{ensure_directory, safe_read_to_string};
use crate::error::{PredictionError, Result};

/// Timestamp format of history entries
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Record of one processed batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    /// Local time the batch finished
    pub timestamp: String,
    /// Name of the staged input file
    pub file: String,
    /// Name of the results file in the predictions directory
    pub result_file: String,
    pub rows: usize,
}

impl HistoryEntry {
    /// New entry stamped with a fresh id and the current local time
    pub fn new(file: impl Into<String>, result_file: impl Into<String>, rows: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            file: file.into(),
            result_file: result_file.into(),
            rows,
        }
    }

    /// First eight characters of the id
    #[must_use]
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

/// Append-only history file
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a JSON line, creating the file if needed
    pub fn append(&self, entry: &HistoryEntry) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_directory(parent, "history log")?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(entry)?)?;

        log::debug!("Appended history entry {} to {}", entry.id, self.path.display());
        Ok(())
    }

    /// Every entry in append order. A log that does not exist yet is empty.
    ///
    /// # Errors
    ///
    /// [`PredictionError::Json`] if a line is not a valid entry.
    pub fn entries(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let text = safe_read_to_string(&self.path, "reading history log")?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(PredictionError::from))
            .collect()
    }
}
