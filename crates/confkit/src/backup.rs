//! Timestamped pre-write backups.
//!
//! Every mutating commit snapshots the target file to a sibling
//! `<name>.<YYYYmmdd-HHMMSS>.bak` before the first write. Backups are
//! never pruned or restored automatically; they exist so a failed edit
//! can be undone by hand with a single copy.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::{Error, Result};

/// Compute the backup path for `path` at the current local time,
/// deduplicating with a numeric suffix when a backup from the same
/// second already exists.
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let candidate = sibling(path, &format!("{stamp}.bak"));
    if !candidate.exists() {
        return candidate;
    }
    let mut n = 1u32;
    loop {
        let candidate = sibling(path, &format!("{stamp}-{n}.bak"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Copy `path` to a fresh timestamped backup and return the backup path.
///
/// The original file is untouched. Fails with [`Error::BackupFailed`]
/// without writing anything if the copy cannot complete, so a failed
/// backup never leaves a half-written snapshot behind a successful edit.
pub fn snapshot(path: &Path) -> Result<PathBuf> {
    let backup = backup_path(path);
    fs::copy(path, &backup).map_err(|source| Error::BackupFailed {
        path: path.to_path_buf(),
        backup: backup.clone(),
        source,
    })?;
    log::debug!("backed up {} to {}", path.display(), backup.display());
    Ok(backup)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "backup".to_string(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!("{name}.{suffix}"))
}

// =============================================================================
// Tests
// =============================================================================
