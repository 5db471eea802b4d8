//! Core types for Homebrew formula and service state.

use std::fmt;

/// Observed state of a Homebrew-managed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    /// The launchd job is loaded and running (or scheduled).
    Running,
    /// The formula is installed but its service is not running.
    Stopped,
    /// The formula is not installed at all.
    NotInstalled,
}

impl ServiceStatus {
    /// Map a `brew services` status string to a state.
    ///
    /// Brew reports `started`, `scheduled`, `none`, `stopped`, `error`
    /// and `unknown`; anything that is not actively running collapses to
    /// [`ServiceStatus::Stopped`]. Not-installed never appears here
    /// because brew omits uninstalled formulas from the listing.
    #[must_use]
    pub fn from_brew_status(status: &str) -> Self {
        match status {
            "started" | "scheduled" => Self::Running,
            _ => Self::Stopped,
        }
    }

    /// Whether the service is actively running.
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::NotInstalled => "not installed",
        };
        write!(f, "{s}")
    }
}

/// One row of `brew services list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    /// Formula name exactly as brew reports it (may carry a version
    /// suffix such as `mysql@8.4`).
    pub name: String,
    /// Current state of the service.
    pub status: ServiceStatus,
    /// User the launchd job runs as, when loaded.
    pub user: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_brew_status() {
        assert_eq!(
            ServiceStatus::from_brew_status("started"),
            ServiceStatus::Running
        );
        assert_eq!(
            ServiceStatus::from_brew_status("scheduled"),
            ServiceStatus::Running
        );
        assert_eq!(
            ServiceStatus::from_brew_status("none"),
            ServiceStatus::Stopped
        );
        assert_eq!(
            ServiceStatus::from_brew_status("stopped"),
            ServiceStatus::Stopped
        );
        assert_eq!(
            ServiceStatus::from_brew_status("error"),
            ServiceStatus::Stopped
        );
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ServiceStatus::Running.to_string(), "running");
        assert_eq!(ServiceStatus::NotInstalled.to_string(), "not installed");
    }
}
