//! Backend abstraction for Homebrew operations.
//!
//! The [`Backend`] trait isolates everything that shells out to `brew`,
//! so service orchestration logic can be exercised against an in-memory
//! fake in tests.

mod brew;

pub use brew::BrewBackend;

use std::path::PathBuf;

use crate::error::Result;
use crate::types::ServiceRecord;

/// Operations against a Homebrew installation.
pub trait Backend {
    /// The Homebrew prefix (`/opt/homebrew` on Apple Silicon).
    fn prefix(&self) -> Result<PathBuf>;

    /// Install a formula.
    fn install(&self, formula: &str) -> Result<()>;

    /// Uninstall a formula.
    fn uninstall(&self, formula: &str) -> Result<()>;

    /// Whether a formula is installed.
    fn is_installed(&self, formula: &str) -> Result<bool>;

    /// All services brew knows about, one record per installed formula
    /// that provides one.
    fn services(&self) -> Result<Vec<ServiceRecord>>;

    /// Start a service (`brew services start`).
    fn service_start(&self, service: &str) -> Result<()>;

    /// Stop a service (`brew services stop`).
    fn service_stop(&self, service: &str) -> Result<()>;
}

/// Create the default backend for this system.
pub fn default_backend() -> Result<Box<dyn Backend>> {
    Ok(Box::new(BrewBackend::new()?))
}
