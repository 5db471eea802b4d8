//! Error types for certificate provisioning.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while provisioning certificates.
#[derive(Debug, Error)]
pub enum Error {
    /// mkcert is not installed or not found in PATH.
    #[error("mkcert not found. Install it with `brew install mkcert nss`")]
    MkcertNotFound,

    /// mkcert ran but reported failure.
    #[error("mkcert failed: {message}")]
    MkcertFailed {
        /// Description of what was being generated
        message: String,
        /// Standard error output from mkcert
        stderr: String,
    },

    /// A certificate file exists without its key (or vice versa).
    /// Regenerating would silently replace the surviving half, so the
    /// pair must be removed explicitly first.
    #[error("incomplete certificate pair for {subject}: {} is missing", .missing.display())]
    IncompletePair {
        subject: String,
        missing: PathBuf,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for certificate operations.
pub type Result<T> = std::result::Result<T, Error>;
