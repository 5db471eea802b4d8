//! Error types for Homebrew operations.
//!
//! Errors are categorized so callers can decide between retrying,
//! ignoring, and surfacing remediation advice. Categorization is driven
//! by the stderr text brew produces, which is the only signal it gives
//! beyond a nonzero exit code.

use thiserror::Error;

/// Categories of Homebrew errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network-related errors (transient, retryable)
    Network,
    /// Formula not found in any tap
    NotFound,
    /// Permission denied (may need sudo)
    Permission,
    /// Formula is already installed
    AlreadyInstalled,
    /// Homebrew not found or not configured
    BrewNotFound,
    /// A service did not reach the expected state in time
    Timeout,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Whether this error can be safely ignored (operation already done).
    #[must_use]
    pub fn is_ignorable(&self) -> bool {
        matches!(self, Self::AlreadyInstalled)
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your internet connection and try again",
            Self::NotFound => "Verify the formula name or add the required tap",
            Self::Permission => "Check directory permissions or run with appropriate access",
            Self::AlreadyInstalled => "No action needed - formula is already installed",
            Self::BrewNotFound => "Install Homebrew from https://brew.sh",
            Self::Timeout => "Check the service log with `brew services info`",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur during Homebrew operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network-related error (connection, timeout, DNS, etc.)
    #[error("network error: {message}")]
    Network {
        /// Detailed error message from the failed network operation
        message: String,
    },

    /// Formula not found in any configured tap, or not installed when an
    /// installed formula was required
    #[error("formula not found: {name}")]
    NotFound {
        /// Name of the formula that could not be found
        name: String,
    },

    /// Permission denied
    #[error("permission denied: {message}")]
    Permission {
        /// Details about what permission was denied
        message: String,
    },

    /// Formula is already installed
    #[error("already installed: {name}")]
    AlreadyInstalled {
        /// Name of the already-installed formula
        name: String,
    },

    /// Homebrew is not installed or not found in PATH
    #[error("Homebrew not found. Install it from https://brew.sh")]
    BrewNotFound,

    /// A service did not reach the expected state within the polling window
    #[error("service {name} did not reach '{expected}' within {waited_secs}s")]
    ServiceTimeout {
        /// Service whose state was being watched
        name: String,
        /// State that was expected
        expected: String,
        /// Total time spent polling
        waited_secs: u64,
    },

    /// Command execution failed
    #[error("command failed: {message}")]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Network { .. } => ErrorCategory::Network,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Permission { .. } => ErrorCategory::Permission,
            Error::AlreadyInstalled { .. } => ErrorCategory::AlreadyInstalled,
            Error::BrewNotFound => ErrorCategory::BrewNotFound,
            Error::ServiceTimeout { .. } => ErrorCategory::Timeout,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether this error can be safely ignored.
    #[must_use]
    pub fn is_ignorable(&self) -> bool {
        self.category().is_ignorable()
    }

    /// Create an error from brew command output.
    ///
    /// Analyzes stderr to categorize the error appropriately.
    #[must_use]
    pub fn from_brew_output(stderr: &str, formula: Option<&str>) -> Self {
        let stderr_lower = stderr.to_lowercase();

        // Network errors
        if stderr_lower.contains("curl")
            || stderr_lower.contains("could not resolve")
            || stderr_lower.contains("connection refused")
            || stderr_lower.contains("timed out")
            || stderr_lower.contains("network")
            || stderr_lower.contains("failed to download")
            || stderr_lower.contains("error: sha256 mismatch")
        {
            return Error::Network {
                message: stderr.trim().to_string(),
            };
        }

        // Not found errors
        if stderr_lower.contains("no available formula")
            || stderr_lower.contains("no formulae found")
            || stderr_lower.contains("unknown command")
            || stderr_lower.contains("error: no such keg")
            || stderr_lower.contains("couldn't find")
        {
            return Error::NotFound {
                name: formula.unwrap_or("unknown").to_string(),
            };
        }

        // Already installed
        if stderr_lower.contains("already installed")
            || stderr_lower.contains("is already an installed")
        {
            return Error::AlreadyInstalled {
                name: formula.unwrap_or("unknown").to_string(),
            };
        }

        // Permission errors
        if stderr_lower.contains("permission denied")
            || stderr_lower.contains("operation not permitted")
            || stderr_lower.contains("cannot write")
            || stderr_lower.contains("sudo")
        {
            return Error::Permission {
                message: stderr.trim().to_string(),
            };
        }

        // Default to command failed
        Error::CommandFailed {
            message: format!(
                "brew command failed{}",
                formula.map(|n| format!(" for {n}")).unwrap_or_default()
            ),
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Result type for Homebrew operations.
pub type Result<T> = std::result::Result<T, Error>;
