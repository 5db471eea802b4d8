//! Homebrew formula and service management.
//!
//! This crate wraps the `brew` CLI behind a typed [`Client`]: formula
//! installs converge rather than fail when already satisfied, service
//! state is read from `brew services list --json` instead of scraping
//! human output, and bare service names resolve to whichever versioned
//! variant (`mysql@8.4`) is actually installed.
//!
//! All process execution lives behind the [`backend::Backend`] trait so
//! orchestration logic can be tested without a Homebrew installation.
//!
//! # Example
//!
//! ```no_run
//! use brewops::Client;
//!
//! # fn main() -> brewops::Result<()> {
//! let client = Client::new()?;
//! client.install("httpd")?;
//! client.restart_service("httpd")?;
//! println!("httpd is {}", client.service_status("httpd")?);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod error;
pub mod services;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use services::ServiceManager;
pub use types::{ServiceRecord, ServiceStatus};

use backend::Backend;

// =============================================================================
// Client
// =============================================================================

/// High-level client for Homebrew operations.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a client using the real brew executable.
    ///
    /// Fails with [`Error::BrewNotFound`] when Homebrew is not installed.
    pub fn new() -> Result<Self> {
        Ok(Self {
            backend: backend::default_backend()?,
        })
    }

    /// The Homebrew prefix.
    pub fn prefix(&self) -> Result<std::path::PathBuf> {
        self.backend.prefix()
    }

    // =========================================================================
    // Formulas
    // =========================================================================

    /// Install a formula; already installed counts as success.
    pub fn install(&self, formula: &str) -> Result<()> {
        self.backend.install(formula)
    }

    /// Uninstall a formula.
    pub fn uninstall(&self, formula: &str) -> Result<()> {
        self.backend.uninstall(formula)
    }

    /// Whether a formula is installed.
    pub fn is_installed(&self, formula: &str) -> Result<bool> {
        self.backend.is_installed(formula)
    }

    // =========================================================================
    // Services
    // =========================================================================

    /// Resolve a bare service name to the installed variant.
    pub fn resolve_service(&self, name: &str) -> Result<String> {
        self.manager().resolve(name)
    }

    /// Status of a service after alias resolution.
    pub fn service_status(&self, name: &str) -> Result<ServiceStatus> {
        self.manager().status(name)
    }

    /// Start a service; returns `false` when it was already running.
    pub fn start_service(&self, name: &str) -> Result<bool> {
        self.manager().start(name)
    }

    /// Stop a service; returns `false` when there was nothing to stop.
    pub fn stop_service(&self, name: &str) -> Result<bool> {
        self.manager().stop(name)
    }

    /// Stop, start, and wait for a service to report running.
    pub fn restart_service(&self, name: &str) -> Result<()> {
        self.manager().restart(name)
    }

    fn manager(&self) -> ServiceManager<'_> {
        ServiceManager::new(self.backend.as_ref())
    }
}
