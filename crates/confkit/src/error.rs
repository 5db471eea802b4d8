//! Error types for configuration patching.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading, patching, or committing a
/// configuration document.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration file does not exist and the caller did not ask
    /// for it to be created.
    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The file exists but could not be written, typically because it is
    /// owned by another user or lives in a protected directory.
    #[error("permission denied writing {}", .path.display())]
    WriteDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The pre-write backup could not be created. The original file is
    /// untouched when this is returned.
    #[error("failed to back up {} to {}", .path.display(), .backup.display())]
    BackupFailed {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The edited file was written but failed post-write verification.
    /// The file on disk holds the rejected content; the backup holds the
    /// last working content and is never restored automatically.
    #[error("verification failed for {}: {detail}{}", .path.display(), backup_hint(.backup))]
    VerificationFailed {
        path: PathBuf,
        detail: String,
        backup: Option<PathBuf>,
    },

    /// A directive was built from an invalid regular expression.
    #[error("invalid directive pattern '{pattern}'")]
    BadPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Any other I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Classify a write-side I/O error, mapping permission problems to
    /// [`Error::WriteDenied`] so callers can suggest a remediation.
    pub fn from_write(path: &std::path::Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            Error::WriteDenied {
                path: path.to_path_buf(),
                source,
            }
        } else {
            Error::Io(source)
        }
    }
}

fn backup_hint(backup: &Option<PathBuf>) -> String {
    match backup {
        Some(b) => format!(" (previous content backed up at {})", b.display()),
        None => String::new(),
    }
}

/// Result alias for confkit operations.
pub type Result<T> = std::result::Result<T, Error>;
