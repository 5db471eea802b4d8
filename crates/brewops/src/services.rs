//! Service lifecycle control over `brew services`.
//!
//! Homebrew installs versioned formulas under suffixed names (`mysql@8.4`,
//! `php@8.3`), and which one is present varies by machine. The manager
//! resolves a bare service name to the installed variant before every
//! operation, so `status`, `start` and `stop` always agree on which
//! formula they are talking about.

use std::thread;
use std::time::Duration;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{ServiceRecord, ServiceStatus};

/// How often restart polls for the service to come back.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How many polls before restart gives up.
const POLL_ATTEMPTS: u32 = 20;

/// Lifecycle operations for one backend.
pub struct ServiceManager<'a> {
    backend: &'a dyn Backend,
    poll_interval: Duration,
    poll_attempts: u32,
}

impl<'a> ServiceManager<'a> {
    /// Create a manager with the default restart polling window (10s).
    #[must_use]
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self {
            backend,
            poll_interval: POLL_INTERVAL,
            poll_attempts: POLL_ATTEMPTS,
        }
    }

    /// Override the restart polling window.
    #[must_use]
    pub fn with_polling(mut self, interval: Duration, attempts: u32) -> Self {
        self.poll_interval = interval;
        self.poll_attempts = attempts;
        self
    }

    /// Resolve `name` to the installed service it refers to.
    ///
    /// An exact match wins. Otherwise the newest installed
    /// version-suffixed variant (`name@x.y`) is chosen, so asking for
    /// `mysql` on a machine with only `mysql@8.4` works. Returns the
    /// name unchanged when nothing matches; status then reports
    /// not-installed.
    pub fn resolve(&self, name: &str) -> Result<String> {
        let services = self.backend.services()?;
        Ok(resolve_name(name, &services))
    }

    /// Current status of `name`, after alias resolution.
    pub fn status(&self, name: &str) -> Result<ServiceStatus> {
        let services = self.backend.services()?;
        let resolved = resolve_name(name, &services);
        Ok(lookup_status(&resolved, &services))
    }

    /// Start `name` if it is not already running.
    ///
    /// Returns `true` when the service was actually started and `false`
    /// when it was already running. Starting a service whose formula is
    /// not installed fails with [`Error::NotFound`].
    pub fn start(&self, name: &str) -> Result<bool> {
        let services = self.backend.services()?;
        let resolved = resolve_name(name, &services);
        match lookup_status(&resolved, &services) {
            ServiceStatus::Running => {
                log::debug!("{resolved} already running");
                Ok(false)
            }
            ServiceStatus::Stopped => {
                self.backend.service_start(&resolved)?;
                Ok(true)
            }
            ServiceStatus::NotInstalled => Err(Error::NotFound {
                name: resolved.clone(),
            }),
        }
    }

    /// Stop `name` if it is running.
    ///
    /// Returns `true` when the service was actually stopped. Stopping a
    /// stopped or uninstalled service is a no-op so teardown can sweep
    /// every known service without checking first.
    pub fn stop(&self, name: &str) -> Result<bool> {
        let services = self.backend.services()?;
        let resolved = resolve_name(name, &services);
        match lookup_status(&resolved, &services) {
            ServiceStatus::Running => {
                self.backend.service_stop(&resolved)?;
                Ok(true)
            }
            ServiceStatus::Stopped | ServiceStatus::NotInstalled => {
                log::debug!("{resolved} not running, nothing to stop");
                Ok(false)
            }
        }
    }

    /// Stop then start `name`, waiting for it to come back.
    ///
    /// After issuing the start, polls at a fixed interval until the
    /// service reports running, failing with [`Error::ServiceTimeout`]
    /// when the polling window is exhausted. Launchd acknowledges the
    /// start immediately; only the poll proves the process stayed up.
    pub fn restart(&self, name: &str) -> Result<()> {
        let services = self.backend.services()?;
        let resolved = resolve_name(name, &services);

        match lookup_status(&resolved, &services) {
            ServiceStatus::NotInstalled => {
                return Err(Error::NotFound {
                    name: resolved.clone(),
                });
            }
            ServiceStatus::Running => {
                self.backend.service_stop(&resolved)?;
            }
            ServiceStatus::Stopped => {}
        }

        self.backend.service_start(&resolved)?;

        for attempt in 0..self.poll_attempts {
            let services = self.backend.services()?;
            if lookup_status(&resolved, &services).is_running() {
                log::debug!("{resolved} running after {attempt} poll(s)");
                return Ok(());
            }
            thread::sleep(self.poll_interval);
        }

        Err(Error::ServiceTimeout {
            name: resolved,
            expected: "started".to_string(),
            waited_secs: (self.poll_interval * self.poll_attempts).as_secs(),
        })
    }
}

/// Pick the service record `name` refers to.
fn resolve_name(name: &str, services: &[ServiceRecord]) -> String {
    if services.iter().any(|s| s.name == name) {
        return name.to_string();
    }

    let prefix = format!("{name}@");
    services
        .iter()
        .filter(|s| s.name.starts_with(&prefix))
        .max_by_key(|s| version_key(&s.name[prefix.len()..]))
        .map_or_else(|| name.to_string(), |s| s.name.clone())
}

fn lookup_status(resolved: &str, services: &[ServiceRecord]) -> ServiceStatus {
    services
        .iter()
        .find(|s| s.name == resolved)
        .map_or(ServiceStatus::NotInstalled, |s| s.status)
}

/// Sortable key for a version suffix: numeric segments compare
/// numerically, so `10.1` sorts above `9.9`.
fn version_key(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|seg| seg.parse().unwrap_or(0))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
