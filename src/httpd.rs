//! Apache httpd configuration management.
//!
//! All edits to `httpd.conf` go through confkit so they are idempotent,
//! backed up, and previewable under `--dry-run`. The directive set here
//! is the full delta between a stock Homebrew httpd and one serving
//! frevo sites: listen port, enabled modules, the PHP module (a
//! singleton, since Apache refuses to start with two), and the include
//! of the vhosts directory. Every real write is verified with
//! `httpd -t` before the caller is allowed to restart anything.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use confkit::{Directive, MutationReport, ScopedMutation};

use crate::config::Policy;
use crate::runner;

// =============================================================================
// Httpd
// =============================================================================

pub struct Httpd {
    prefix: PathBuf,
    conf: PathBuf,
    vhosts_dir: PathBuf,
    http_port: u16,
}

impl Httpd {
    pub fn new(prefix: &Path, vhosts_dir: &Path, http_port: u16) -> Self {
        Self {
            prefix: prefix.to_path_buf(),
            conf: prefix.join("etc/httpd/httpd.conf"),
            vhosts_dir: vhosts_dir.to_path_buf(),
            http_port,
        }
    }

    pub fn conf_path(&self) -> &Path {
        &self.conf
    }

    /// Path of the PHP Apache module for a given version, as Homebrew
    /// lays it out.
    pub fn php_module_path(&self, version: &str) -> PathBuf {
        self.prefix
            .join(format!("opt/php@{version}/lib/httpd/modules/libphp.so"))
    }

    /// Converge `httpd.conf` on the full frevo directive set, verifying
    /// the written file with `httpd -t`.
    pub fn ensure_base(&self, php_version: &str, policy: Policy) -> Result<MutationReport> {
        let mut directives = self.base_directives()?;
        directives.push(self.php_directive(php_version)?);
        self.converge(&directives, policy)
    }

    /// Swap the active PHP module to `version`. Any previously loaded
    /// PHP module line is evicted first, so the document never carries
    /// two. Verified with `httpd -t` before returning; on rejection the
    /// caller must not restart.
    pub fn switch_php(&self, version: &str, policy: Policy) -> Result<MutationReport> {
        let directive = self.php_directive(version)?;
        self.converge(&[directive], policy)
    }

    /// PHP version currently loaded in `httpd.conf`, parsed from the
    /// module path. `None` when the file or the directive is absent.
    pub fn active_php(&self) -> Result<Option<String>> {
        let content = match fs::read_to_string(&self.conf) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", self.conf.display()));
            }
        };
        for line in content.lines() {
            let line = line.trim_start();
            if line.starts_with("LoadModule php_module")
                && let Some(idx) = line.find("php@")
            {
                let version: String = line[idx + 4..]
                    .chars()
                    .take_while(|c| c.is_ascii_digit() || *c == '.')
                    .collect();
                if !version.is_empty() {
                    return Ok(Some(version));
                }
            }
        }
        Ok(None)
    }

    /// Remove every frevo-owned line from `httpd.conf`.
    ///
    /// Only the PHP module and the vhosts include are ours to take
    /// back. The listen port, server name, and bundled modules stay:
    /// stock Apache runs fine with them enabled.
    pub fn retract(&self, policy: Policy) -> Result<MutationReport> {
        let php = Directive::new(
            "php module",
            r"^\s*LoadModule\s+php\d*_module\s",
            "LoadModule php_module",
        )?;
        let include = self.include_directive()?;
        let report = ScopedMutation::new(&self.conf)
            .dry_run(policy.dry_run)
            .apply(|doc| {
                doc.remove(&php);
                doc.remove(&include);
                Ok(())
            })?;
        Ok(report)
    }

    /// Run Apache's own syntax check against the live configuration.
    pub fn self_test(&self) -> Result<()> {
        let conf = self.conf.display().to_string();
        runner::run_capture(self.prefix.join("bin/httpd"), &["-t", "-f", &conf])
            .context("httpd configuration self-test failed")?;
        Ok(())
    }

    fn converge(&self, directives: &[Directive], policy: Policy) -> Result<MutationReport> {
        let report = ScopedMutation::new(&self.conf)
            .dry_run(policy.dry_run)
            .apply_verified(
                |doc| {
                    for directive in directives {
                        let outcome = if directive.is_singleton() {
                            doc.ensure_singleton(directive)
                        } else {
                            doc.ensure(directive)
                        };
                        if outcome.changed() {
                            log::debug!("httpd.conf: converged {}", directive.name());
                        }
                    }
                    Ok(())
                },
                |_| self.self_test().map_err(|err| format!("{err:#}")),
            )?;
        Ok(report)
    }

    // =========================================================================
    // Directive set
    // =========================================================================

    fn base_directives(&self) -> Result<Vec<Directive>> {
        let listen = Directive::new(
            "listen port",
            &format!(r"^\s*Listen\s+{}\s*$", self.http_port),
            &format!("Listen {}", self.http_port),
        )?
        .with_family(r"^\s*Listen\s")?
        .with_anchor(r"^\s*#?\s*LoadModule\b")?;

        let server_name = Directive::new(
            "server name",
            r"^\s*ServerName\s",
            "ServerName localhost",
        )?
        .with_disabled(r"^\s*#\s*ServerName\b")?;

        let mut directives = vec![listen, server_name];
        for module in ["rewrite", "ssl", "socache_shmcb"] {
            directives.push(load_module(module)?);
        }
        directives.push(self.include_directive()?);
        Ok(directives)
    }

    fn include_directive(&self) -> Result<Directive> {
        let pattern = format!("{}/*.conf", self.vhosts_dir.display());
        Ok(Directive::new(
            "vhosts include",
            &format!(r#"^\s*IncludeOptional\s+"{}""#, regex::escape(&pattern)),
            &format!("IncludeOptional \"{pattern}\""),
        )?)
    }

    fn php_directive(&self, version: &str) -> Result<Directive> {
        let module = self.php_module_path(version).display().to_string();
        Ok(Directive::new(
            &format!("php {version} module"),
            &format!(r"^\s*LoadModule\s+php_module\s+{}\s*$", regex::escape(&module)),
            &format!("LoadModule php_module {module}"),
        )?
        // Evict php5_module/php7_module era lines too, not just ours.
        .with_family(r"^\s*LoadModule\s+php\d*_module\s")?
        .with_anchor(r"^\s*<IfModule\s+unixd_module>")?)
    }
}

/// Uncomment-or-append for one of httpd's own bundled modules.
fn load_module(name: &str) -> Result<Directive> {
    Ok(Directive::new(
        &format!("{name} module"),
        &format!(r"^\s*LoadModule\s+{name}_module\s"),
        &format!("LoadModule {name}_module lib/httpd/modules/mod_{name}.so"),
    )?
    .with_disabled(&format!(r"^\s*#\s*LoadModule\s+{name}_module\s"))?)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STOCK: &str = "\
ServerRoot \"/opt/homebrew/opt/httpd\"
Listen 8080
LoadModule mpm_event_module lib/httpd/modules/mod_mpm_event.so
LoadModule unixd_module lib/httpd/modules/mod_unixd.so
#LoadModule rewrite_module lib/httpd/modules/mod_rewrite.so
#LoadModule ssl_module lib/httpd/modules/mod_ssl.so
#LoadModule socache_shmcb_module lib/httpd/modules/mod_socache_shmcb.so
<IfModule unixd_module>
User _www
Group _www
</IfModule>
#ServerName www.example.com:8080
DocumentRoot \"/opt/homebrew/var/www\"
";

    fn fixture(dir: &TempDir) -> Httpd {
        let prefix = dir.path();
        fs::create_dir_all(prefix.join("etc/httpd")).unwrap();
        fs::write(prefix.join("etc/httpd/httpd.conf"), STOCK).unwrap();
        Httpd::new(prefix, &prefix.join("vhosts"), 80)
    }

    fn dry_run() -> Policy {
        Policy {
            dry_run: true,
            ..Policy::default()
        }
    }

    fn php_lines(content: &str) -> Vec<&str> {
        content
            .lines()
            .filter(|l| l.trim_start().starts_with("LoadModule php"))
            .collect()
    }

    #[test]
    fn ensure_base_converges_stock_config() {
        let dir = TempDir::new().unwrap();
        let httpd = fixture(&dir);

        let report = httpd.ensure_base("8.4", dry_run()).unwrap();
        assert!(report.changed());

        let after = &report.after;
        assert!(after.contains("Listen 80\n"));
        assert!(!after.contains("Listen 8080"));
        assert!(after.contains("\nLoadModule rewrite_module lib/httpd/modules/mod_rewrite.so"));
        assert!(after.contains("\nLoadModule ssl_module lib/httpd/modules/mod_ssl.so"));
        assert!(
            after.contains("\nLoadModule socache_shmcb_module lib/httpd/modules/mod_socache_shmcb.so")
        );
        assert!(after.contains("ServerName localhost"));
        assert!(!after.contains("#ServerName"));
        assert!(after.contains("LoadModule php_module"));
        assert!(after.contains("opt/php@8.4/lib/httpd/modules/libphp.so"));
        assert!(after.contains("IncludeOptional"));

        // Dry run: the file on disk is untouched.
        assert_eq!(
            fs::read_to_string(httpd.conf_path()).unwrap(),
            STOCK,
        );
    }

    #[test]
    fn ensure_base_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let httpd = fixture(&dir);

        let first = httpd.ensure_base("8.4", dry_run()).unwrap();
        fs::write(httpd.conf_path(), &first.after).unwrap();

        let second = httpd.ensure_base("8.4", dry_run()).unwrap();
        assert!(!second.changed());
        assert_eq!(second.after, first.after);
    }

    #[test]
    fn switch_php_never_leaves_two_module_lines() {
        let dir = TempDir::new().unwrap();
        let httpd = fixture(&dir);

        // No prior module: switching adds exactly one line.
        let report = httpd.switch_php("8.3", dry_run()).unwrap();
        assert_eq!(php_lines(&report.after).len(), 1);
        fs::write(httpd.conf_path(), &report.after).unwrap();

        // Switching again replaces it, never accumulates.
        let report = httpd.switch_php("8.4", dry_run()).unwrap();
        let lines = php_lines(&report.after);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("php@8.4"));
        assert!(!report.after.contains("php@8.3"));
    }

    #[test]
    fn switch_php_evicts_legacy_module_names() {
        let dir = TempDir::new().unwrap();
        let httpd = fixture(&dir);
        let mut content = STOCK.to_string();
        content.push_str("LoadModule php7_module /usr/local/opt/php@7.4/lib/httpd/modules/libphp7.so\n");
        fs::write(httpd.conf_path(), &content).unwrap();

        let report = httpd.switch_php("8.4", dry_run()).unwrap();
        let lines = php_lines(&report.after);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("php@8.4"));
    }

    #[test]
    fn php_directive_matches_its_own_canonical() {
        let dir = TempDir::new().unwrap();
        let httpd = fixture(&dir);
        let directive = httpd.php_directive("8.4").unwrap();
        assert!(directive.matches(directive.canonical()));
        assert!(directive.matches_family(directive.canonical()));
        assert!(directive.is_singleton());
    }

    #[test]
    fn php_module_is_inserted_before_unixd_block() {
        let dir = TempDir::new().unwrap();
        let httpd = fixture(&dir);

        let report = httpd.switch_php("8.4", dry_run()).unwrap();
        let php_at = report.after.find("LoadModule php_module").unwrap();
        let unixd_at = report.after.find("<IfModule unixd_module>").unwrap();
        assert!(php_at < unixd_at);
    }

    #[test]
    fn active_php_reads_the_loaded_version() {
        let dir = TempDir::new().unwrap();
        let httpd = fixture(&dir);
        assert_eq!(httpd.active_php().unwrap(), None);

        let report = httpd.switch_php("8.3", dry_run()).unwrap();
        fs::write(httpd.conf_path(), &report.after).unwrap();
        assert_eq!(httpd.active_php().unwrap(), Some("8.3".to_string()));
    }

    #[test]
    fn active_php_of_missing_config_is_none() {
        let dir = TempDir::new().unwrap();
        let httpd = Httpd::new(&dir.path().join("nope"), &dir.path().join("vhosts"), 80);
        assert_eq!(httpd.active_php().unwrap(), None);
    }

    #[test]
    fn retract_removes_only_frevo_lines() {
        let dir = TempDir::new().unwrap();
        let httpd = fixture(&dir);
        let mut content = STOCK.to_string();
        content.push_str(&format!(
            "LoadModule php_module {}\n",
            httpd.php_module_path("8.4").display()
        ));
        content.push_str(&format!(
            "IncludeOptional \"{}/vhosts/*.conf\"\n",
            dir.path().display()
        ));
        fs::write(httpd.conf_path(), &content).unwrap();

        let report = httpd.retract(Policy::default()).unwrap();
        assert!(report.changed());

        let after = fs::read_to_string(httpd.conf_path()).unwrap();
        assert!(!after.contains("php_module"));
        assert!(!after.contains("IncludeOptional"));
        // Everything that came with the stock file survives.
        assert!(after.contains("Listen 8080"));
        assert!(after.contains("#LoadModule rewrite_module"));
    }

    #[test]
    fn retract_of_untouched_config_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let httpd = fixture(&dir);

        let report = httpd.retract(Policy::default()).unwrap();
        assert!(!report.changed());
        assert_eq!(fs::read_to_string(httpd.conf_path()).unwrap(), STOCK);
    }

    #[test]
    fn listen_keeps_custom_port_satisfied() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path();
        fs::create_dir_all(prefix.join("etc/httpd")).unwrap();
        fs::write(prefix.join("etc/httpd/httpd.conf"), STOCK).unwrap();
        let httpd = Httpd::new(prefix, &prefix.join("vhosts"), 8080);

        // Stock already listens on 8080; nothing about Listen changes.
        let report = httpd.ensure_base("8.4", dry_run()).unwrap();
        assert!(report.after.contains("Listen 8080\n"));
        assert_eq!(report.after.matches("\nListen").count(), 1);
    }
}
