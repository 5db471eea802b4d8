//! Real Homebrew CLI backend using `brew` commands.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{ServiceRecord, ServiceStatus};
use std::path::PathBuf;
use std::process::Command;

/// Backend that executes real `brew` commands.
pub struct BrewBackend {
    /// Path to the brew executable
    brew_path: String,
}

impl BrewBackend {
    /// Create a new `BrewBackend`.
    ///
    /// Returns an error if Homebrew is not installed.
    pub fn new() -> Result<Self> {
        let brew_path = find_brew()?;
        Ok(Self { brew_path })
    }

    /// Run a brew command and return output.
    fn run_brew(&self, args: &[&str]) -> Result<std::process::Output> {
        log::debug!("brew {}", args.join(" "));
        let output = Command::new(&self.brew_path)
            .args(args)
            .output()
            .map_err(|e| Error::CommandFailed {
                message: format!("failed to execute brew: {e}"),
                stderr: String::new(),
            })?;
        Ok(output)
    }

    /// Run a brew command and check for success.
    fn run_brew_checked(&self, args: &[&str], formula: Option<&str>) -> Result<String> {
        let output = self.run_brew(args)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::from_brew_output(&stderr, formula));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Backend for BrewBackend {
    fn prefix(&self) -> Result<PathBuf> {
        let output = self.run_brew_checked(&["--prefix"], None)?;
        let prefix = output.trim();
        if prefix.is_empty() {
            return Err(Error::Other("brew --prefix returned nothing".to_string()));
        }
        Ok(PathBuf::from(prefix))
    }

    fn install(&self, formula: &str) -> Result<()> {
        match self.run_brew_checked(&["install", "--formula", formula], Some(formula)) {
            Ok(_) => Ok(()),
            // Installing an installed formula is convergence, not failure.
            Err(e) if e.is_ignorable() => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn uninstall(&self, formula: &str) -> Result<()> {
        self.run_brew_checked(&["uninstall", "--formula", formula], Some(formula))?;
        Ok(())
    }

    fn is_installed(&self, formula: &str) -> Result<bool> {
        let output = self.run_brew(&["info", "--json=v2", "--formula", formula])?;

        if !output.status.success() {
            return Ok(false);
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        let installed = json["formulae"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|f| f["installed"].as_array())
            .is_some_and(|arr| !arr.is_empty());

        Ok(installed)
    }

    fn services(&self) -> Result<Vec<ServiceRecord>> {
        let output = self.run_brew(&["services", "list", "--json"])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::from_brew_output(&stderr, None));
        }
        let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        Ok(parse_services(&json))
    }

    fn service_start(&self, service: &str) -> Result<()> {
        self.run_brew_checked(&["services", "start", service], Some(service))?;
        Ok(())
    }

    fn service_stop(&self, service: &str) -> Result<()> {
        self.run_brew_checked(&["services", "stop", service], Some(service))?;
        Ok(())
    }
}

/// Find the brew executable path.
fn find_brew() -> Result<String> {
    // Check common locations
    let paths = [
        "/opt/homebrew/bin/brew",              // Apple Silicon
        "/usr/local/bin/brew",                 // Intel
        "/home/linuxbrew/.linuxbrew/bin/brew", // Linux
    ];

    for path in &paths {
        if std::path::Path::new(path).exists() {
            return Ok((*path).to_string());
        }
    }

    // Try which
    let output = Command::new("which")
        .arg("brew")
        .output()
        .map_err(|_| Error::BrewNotFound)?;

    if output.status.success() {
        let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !path.is_empty() {
            return Ok(path);
        }
    }

    Err(Error::BrewNotFound)
}

/// Parse service records from `brew services list --json`.
fn parse_services(json: &serde_json::Value) -> Vec<ServiceRecord> {
    let empty = Vec::new();
    let services = json.as_array().unwrap_or(&empty);

    services
        .iter()
        .filter_map(|entry| {
            let name = entry["name"].as_str()?;
            let status = entry["status"].as_str().unwrap_or("none");
            Some(ServiceRecord {
                name: name.to_string(),
                status: ServiceStatus::from_brew_status(status),
                user: entry["user"].as_str().map(ToString::to_string),
            })
        })
        .collect()
}
