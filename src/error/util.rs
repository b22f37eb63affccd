//! Utility functions for error handling
//!
//! File-system helpers that attach the path and purpose to IO failures.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{PredictionError, Result};

fn io_error(kind: io::ErrorKind, message: String) -> PredictionError {
    PredictionError::Io(io::Error::new(kind, message))
}

/// Safely open a file with rich error information
///
/// # Arguments
/// * `path` - The path to the file to open
/// * `purpose` - Why the file is being opened (for error context)
pub fn safe_open_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if !path.exists() {
        return Err(io_error(
            io::ErrorKind::NotFound,
            format!("File not found: {} (needed for: {purpose})", path.display()),
        ));
    }

    if !path.is_file() {
        return Err(io_error(
            io::ErrorKind::InvalidInput,
            format!("Path is not a file: {} (expected a file for: {purpose})", path.display()),
        ));
    }

    fs::File::open(path).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::PermissionDenied => "Permission denied - check file permissions".to_string(),
            _ => format!("Failed to open file for: {purpose}"),
        };
        io_error(e.kind(), format!("{context}: {} ({e})", path.display()))
    })
}

/// Read a whole text file, see [`safe_open_file`] for the error context
pub fn safe_read_to_string(path: &Path, purpose: &str) -> Result<String> {
    let mut file = safe_open_file(path, purpose)?;
    let mut content = String::new();

    io::Read::read_to_string(&mut file, &mut content).map_err(|e| {
        let reason = if e.kind() == io::ErrorKind::InvalidData {
            "not valid UTF-8 text".to_string()
        } else {
            format!("read failed ({e})")
        };
        io_error(e.kind(), format!("Cannot load {} for {purpose}: {reason}", path.display()))
    })?;
    Ok(content)
}

/// Make sure a directory exists, creating it and its parents when needed
pub fn ensure_directory(path: &Path, purpose: &str) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }

    if path.exists() {
        return Err(io_error(
            io::ErrorKind::InvalidInput,
            format!("Path is not a directory: {} (expected a directory for: {purpose})", path.display()),
        ));
    }

    fs::create_dir_all(path).map_err(|e| {
        io_error(
            e.kind(),
            format!("Failed to create directory {} for {purpose}: {e}", path.display()),
        )
    })
}
