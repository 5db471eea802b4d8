//! Centralized path resolution for frevo
//!
//! This module provides path resolution with environment variable
//! support, making it easy to symlink frevo configs from a dotfiles
//! repository.
//!
//! # Environment Variables
//!
//! - `FREVO_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/frevo`)
//! - `FREVO_STATE_DIR` - Override state directory
//! - `FREVO_SITES_DIR` - Override the directory site roots are created under
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `FREVO_CONFIG_DIR` environment variable
//! 2. Existing `~/.config/frevo/` (backwards compatibility)
//! 3. `XDG_CONFIG_HOME/frevo` (if set)
//! 4. Default: `~/.config/frevo`
//!
//! For state_dir():
//! 1. `FREVO_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/frevo` (if set)
//! 3. Default: `~/.local/state/frevo`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "FREVO_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "FREVO_STATE_DIR";

/// Environment variable for sites directory override
pub const ENV_SITES_DIR: &str = "FREVO_SITES_DIR";

/// Get the frevo config directory path
///
/// Priority:
/// 1. `FREVO_CONFIG_DIR` env var
/// 2. Existing `~/.config/frevo/` (backwards compat)
/// 3. `XDG_CONFIG_HOME/frevo`
/// 4. Default
pub fn config_dir() -> Result<PathBuf> {
    // 1. Check environment variable override
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    // 2. Check for existing ~/.config/frevo (backwards compatibility)
    if let Some(home) = dirs::home_dir() {
        let existing = home.join(".config").join("frevo");
        if existing.exists() {
            log::debug!("Using existing config dir: {}", existing.display());
            return Ok(existing);
        }
    }

    // 3. Check XDG_CONFIG_HOME
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("frevo");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    // 4. Default: ~/.config/frevo
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("frevo");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the frevo state directory path (lock file, logs)
///
/// Priority:
/// 1. `FREVO_STATE_DIR` env var
/// 2. `XDG_STATE_HOME/frevo`
/// 3. Default: `~/.local/state/frevo`
pub fn state_dir() -> Result<PathBuf> {
    // 1. Check environment variable override
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    // 2. Check XDG_STATE_HOME
    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join("frevo");
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    // 3. Default: ~/.local/state/frevo
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join("frevo");
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Get the directory new site roots are created under
///
/// Priority:
/// 1. `FREVO_SITES_DIR` env var
/// 2. Default: `~/Sites`
pub fn sites_dir() -> Result<PathBuf> {
    // 1. Check environment variable override
    if let Ok(dir) = std::env::var(ENV_SITES_DIR) {
        let path = expand(&dir);
        log::debug!("Using sites dir from {}: {}", ENV_SITES_DIR, path.display());
        return Ok(path);
    }

    // 2. Default: ~/Sites
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join("Sites");
    log::debug!("Using default sites dir: {}", path.display());
    Ok(path)
}

/// Directory holding one virtual host file per site.
pub fn vhosts_dir() -> Result<PathBuf> {
    Ok(config_dir()?.join("vhosts"))
}

/// Directory holding certificate pairs.
pub fn certs_dir() -> Result<PathBuf> {
    Ok(config_dir()?.join("certs"))
}

/// Expand ~ and environment variables in a path string.
///
/// This is the canonical path expansion function for frevo. All modules
/// should use this instead of calling shellexpand directly.
///
/// # Examples
///
/// ```
/// use frevo::paths;
///
/// // Expands ~ to home directory
/// let home_path = paths::expand("~/Sites");
///
/// // Expands environment variables
/// let var_path = paths::expand("$HOME/Sites");
/// ```
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
