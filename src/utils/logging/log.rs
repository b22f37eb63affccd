//! Logging helpers
//!
//! Consistent messages for file operations and batch diagnostics.

use std::path::Path;
use std::time::Duration;

use crate::models::BatchDiagnostics;

/// Log the start of a file operation
///
/// # Arguments
/// * `operation` - Description of the operation, e.g. "Reading rows from"
/// * `path` - File being operated on
pub fn log_operation_start(operation: &str, path: &Path) {
    log::info!("{} {}", operation, path.display());
}

/// Log the completion of a file operation
///
/// # Arguments
/// * `operation` - Past-tense verb, e.g. "read" or "wrote"
/// * `path` - File that was operated on
/// * `rows` - Number of rows or records handled
/// * `elapsed` - Optional elapsed time
pub fn log_operation_complete(operation: &str, path: &Path, rows: usize, elapsed: Option<Duration>) {
    match elapsed {
        Some(duration) => log::info!(
            "Successfully {operation} {rows} rows ({}) in {duration:?}",
            path.display()
        ),
        None => log::info!("Successfully {operation} {rows} rows ({})", path.display()),
    }
}

/// Log a recoverable problem
///
/// # Arguments
/// * `message` - Warning message
/// * `path` - Optional path related to the warning
pub fn log_warning(message: &str, path: Option<&Path>) {
    if let Some(path) = path {
        log::warn!("{}: {}", message, path.display());
    } else {
        log::warn!("{message}");
    }
}

/// Summarise the recovered issues and fallback use of a finished batch
pub fn log_batch_diagnostics(diagnostics: &BatchDiagnostics) {
    if !diagnostics.issues.is_empty() {
        log::warn!(
            "Batch finished with {} recovered issue(s): {} missing column(s), {} invalid value(s)",
            diagnostics.issues.len(),
            diagnostics.missing_columns(),
            diagnostics.invalid_values()
        );
    }
    for disease in &diagnostics.fallback_diseases {
        log::info!("{disease} was scored by the fallback estimator");
    }
}
