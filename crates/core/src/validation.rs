//! Input validation utilities.
//!
//! Configured values end up in HTTP paths (worksheet names, database ids) and in
//! `Content-Disposition` headers and file paths (download filenames), so they are checked once at
//! startup.

use crate::{SyncError, SyncResult};

/// Validates that a download filename is a plain `.csv` file name.
///
/// Rejects empty names, path separators, parent references, control characters and quotes
/// (the name is embedded in a quoted `Content-Disposition` header).
///
/// # Errors
///
/// Returns a `SyncError::Config` describing the first problem found.
pub fn validate_download_filename(filename: &str) -> SyncResult<()> {
    const MAX_FILENAME_LEN: usize = 255;

    if filename.trim().is_empty() {
        return Err(SyncError::Config("filename cannot be empty".into()));
    }

    if filename.len() > MAX_FILENAME_LEN {
        return Err(SyncError::Config(format!(
            "filename exceeds maximum length of {} characters",
            MAX_FILENAME_LEN
        )));
    }

    if filename.contains(&['/', '\\', '"'][..]) || filename.chars().any(char::is_control) {
        return Err(SyncError::Config(format!(
            "filename '{}' contains invalid characters",
            filename.escape_default()
        )));
    }

    if filename.starts_with('.') {
        return Err(SyncError::Config(format!(
            "filename '{filename}' must not start with '.'"
        )));
    }

    if !filename.to_ascii_lowercase().ends_with(".csv") {
        return Err(SyncError::Config(format!(
            "filename '{filename}' must end with .csv"
        )));
    }

    Ok(())
}

/// Validates a required non-empty setting, returning it trimmed.
///
/// # Errors
///
/// Returns a `SyncError::Config` naming `field` if the value is empty or whitespace-only.
pub fn require_non_empty(field: &str, value: &str) -> SyncResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SyncError::Config(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_owned())
}
