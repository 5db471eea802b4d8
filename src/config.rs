use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::paths;

// ============================================================================
// Execution policy
// ============================================================================

/// How mutating operations behave for this invocation.
///
/// Built once from the CLI flags and passed by reference; nothing reads
/// flags or globals after startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct Policy {
    /// Report what would change without touching anything.
    pub dry_run: bool,
    /// Skip confirmation prompts on destructive operations.
    pub force: bool,
    /// Verbosity level from repeated -v flags.
    pub verbose: u8,
}

// ============================================================================
// Settings schema
// ============================================================================

/// User-editable settings from `~/.config/frevo/config.toml`.
///
/// Every field has a default, so a missing file means a stock setup:
/// `.test` domains, PHP 8.4, MySQL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Top-level domain served locally (sites become `<name>.<tld>`)
    #[serde(default = "default_tld")]
    pub tld: String,

    /// PHP version the web server loads (switchable with `frevo use`)
    #[serde(default = "default_php_version")]
    pub php_version: String,

    /// HTTP port httpd listens on
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// HTTPS port httpd listens on
    #[serde(default = "default_https_port")]
    pub https_port: u16,

    /// Directory new site roots are created under (overrides `~/Sites`)
    #[serde(default)]
    pub sites_dir: Option<String>,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tld: default_tld(),
            php_version: default_php_version(),
            http_port: default_http_port(),
            https_port: default_https_port(),
            sites_dir: None,
            database: DatabaseSettings::default(),
        }
    }
}

/// Database section of the settings file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Formula providing the server (`mysql`, `mysql@8.4`, `mariadb`)
    #[serde(default = "default_db_formula")]
    pub formula: String,

    /// Administrative user
    #[serde(default = "default_db_user")]
    pub user: String,

    /// Administrative password; Homebrew servers ship with none
    #[serde(default)]
    pub password: String,

    /// Host the server listens on
    #[serde(default = "default_db_host")]
    pub host: String,

    /// Port the server listens on
    #[serde(default = "default_db_port")]
    pub port: u16,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            formula: default_db_formula(),
            user: default_db_user(),
            password: String::new(),
            host: default_db_host(),
            port: default_db_port(),
        }
    }
}

fn default_tld() -> String {
    "test".to_string()
}

fn default_php_version() -> String {
    "8.4".to_string()
}

fn default_http_port() -> u16 {
    80
}

fn default_https_port() -> u16 {
    443
}

fn default_db_formula() -> String {
    "mysql".to_string()
}

fn default_db_user() -> String {
    "root".to_string()
}

fn default_db_host() -> String {
    "127.0.0.1".to_string()
}

fn default_db_port() -> u16 {
    3306
}

/// Check that a PHP version reads like `8.4`.
///
/// Also guards `frevo use`, which takes the version from the command
/// line before any settings are written.
pub fn validate_php_version(version: &str) -> Result<()> {
    if version.is_empty() || !version.chars().all(|c| c.is_ascii_digit() || c == '.') {
        bail!("php version must look like '8.4', got '{version}'");
    }
    Ok(())
}

impl Settings {
    /// Load settings from the config directory, falling back to defaults
    /// when no file exists yet.
    pub fn load() -> Result<Self> {
        let config_path = Self::path()?;

        if !config_path.exists() {
            log::debug!("no settings file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Could not read config file: {}", config_path.display()))?;

        let settings: Self =
            toml::from_str(&content).context("Invalid TOML format in frevo config")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save the settings to the config directory.
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = paths::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)?;

        Ok(config_path)
    }

    /// Location of the settings file.
    pub fn path() -> Result<PathBuf> {
        Ok(paths::config_dir()?.join("config.toml"))
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<()> {
        if self.tld.is_empty() || !self.tld.chars().all(|c| c.is_ascii_alphanumeric()) {
            bail!(
                "tld must be a single alphanumeric label, got '{}'",
                self.tld
            );
        }
        validate_php_version(&self.php_version)?;
        if self.http_port == self.https_port {
            bail!("http_port and https_port must differ");
        }
        if self.database.formula.is_empty() {
            bail!("database.formula must not be empty");
        }
        Ok(())
    }

    /// The directory new site roots are created under.
    pub fn sites_root(&self) -> Result<PathBuf> {
        match &self.sites_dir {
            Some(dir) => Ok(paths::expand(dir)),
            None => paths::sites_dir(),
        }
    }

    /// The PHP formula for the configured version.
    pub fn php_formula(&self) -> String {
        format!("php@{}", self.php_version)
    }

    /// The wildcard certificate subject for the configured TLD.
    pub fn wildcard_subject(&self) -> String {
        format!("*.{}", self.tld)
    }

    /// Fully qualified domain for a site name, unless the name already
    /// carries the TLD.
    pub fn qualify(&self, name: &str) -> String {
        let suffix = format!(".{}", self.tld);
        if name.ends_with(&suffix) {
            name.to_string()
        } else {
            format!("{name}{suffix}")
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.tld, "test");
        assert_eq!(settings.php_version, "8.4");
        assert_eq!(settings.http_port, 80);
        assert_eq!(settings.database.formula, "mysql");
        settings.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str("tld = \"wip\"\n").unwrap();
        assert_eq!(settings.tld, "wip");
        assert_eq!(settings.php_version, "8.4");
        assert_eq!(settings.database.user, "root");
    }

    #[test]
    fn test_nested_database_section() {
        let settings: Settings =
            toml::from_str("[database]\nformula = \"mariadb\"\nport = 3307\n").unwrap();
        assert_eq!(settings.database.formula, "mariadb");
        assert_eq!(settings.database.port, 3307);
        assert_eq!(settings.database.host, "127.0.0.1");
    }

    #[test]
    fn test_validate_rejects_dotted_tld() {
        let settings = Settings {
            tld: "co.test".to_string(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_php_version() {
        let settings = Settings {
            php_version: "eight".to_string(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_php_version_direct() {
        assert!(validate_php_version("8.3").is_ok());
        assert!(validate_php_version("7").is_ok());
        assert!(validate_php_version("latest").is_err());
        assert!(validate_php_version("").is_err());
    }

    #[test]
    fn test_validate_rejects_port_clash() {
        let settings = Settings {
            http_port: 8080,
            https_port: 8080,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_php_formula() {
        let settings = Settings::default();
        assert_eq!(settings.php_formula(), "php@8.4");
    }

    #[test]
    fn test_qualify() {
        let settings = Settings::default();
        assert_eq!(settings.qualify("mysite"), "mysite.test");
        assert_eq!(settings.qualify("mysite.test"), "mysite.test");
    }

    #[test]
    fn test_wildcard_subject() {
        assert_eq!(Settings::default().wildcard_subject(), "*.test");
    }

    #[test]
    fn test_round_trip_serialization() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.tld, settings.tld);
        assert_eq!(parsed.php_version, settings.php_version);
    }
}
