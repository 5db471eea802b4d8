//! Local DNS for the development TLD.
//!
//! Three small documents make `*.test` resolve to localhost:
//!
//! 1. a frevo-owned dnsmasq fragment mapping the TLD to 127.0.0.1,
//! 2. a `conf-file=` line in Homebrew's main `dnsmasq.conf` pulling
//!    that fragment in, and
//! 3. an `/etc/resolver/<tld>` stanza pointing macOS at dnsmasq.
//!
//! All three are converged with confkit. The resolver file lives in
//! root-owned territory; frevo attempts the write and reports the
//! failure with a copy-pasteable remediation instead of escalating
//! privileges itself.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use confkit::{Directive, MutationReport, ScopedMutation};

use crate::config::Policy;

const RESOLVER_DIR: &str = "/etc/resolver";

pub struct Dns {
    prefix: PathBuf,
    config_dir: PathBuf,
    resolver_dir: PathBuf,
    tld: String,
}

impl Dns {
    pub fn new(prefix: &Path, config_dir: &Path, tld: &str) -> Self {
        Self {
            prefix: prefix.to_path_buf(),
            config_dir: config_dir.to_path_buf(),
            resolver_dir: PathBuf::from(RESOLVER_DIR),
            tld: tld.to_string(),
        }
    }

    /// Redirect the resolver directory away from `/etc/resolver`.
    #[must_use]
    pub fn with_resolver_dir(mut self, dir: &Path) -> Self {
        self.resolver_dir = dir.to_path_buf();
        self
    }

    /// Homebrew's main dnsmasq configuration.
    pub fn main_conf(&self) -> PathBuf {
        self.prefix.join("etc/dnsmasq.conf")
    }

    /// The frevo-owned fragment holding the TLD address mapping.
    pub fn fragment_path(&self) -> PathBuf {
        self.config_dir.join("dnsmasq.conf")
    }

    /// The per-TLD macOS resolver stanza.
    pub fn resolver_path(&self) -> PathBuf {
        self.resolver_dir.join(&self.tld)
    }

    /// Converge the fragment on `address=/<tld>/127.0.0.1`, creating it
    /// if missing. The fragment is wholly frevo's, so any address line
    /// for a previous TLD is evicted.
    pub fn ensure_address(&self, policy: Policy) -> Result<MutationReport> {
        let directive = Directive::new(
            "tld address mapping",
            &format!(r"^address=/{}/127\.0\.0\.1$", regex::escape(&self.tld)),
            &format!("address=/{}/127.0.0.1", self.tld),
        )?
        .with_family(r"^address=/")?;

        let report = ScopedMutation::new(&self.fragment_path())
            .create_if_missing(true)
            .dry_run(policy.dry_run)
            .apply(|doc| {
                doc.ensure_singleton(&directive);
                Ok(())
            })?;
        Ok(report)
    }

    /// Hook the fragment into the main dnsmasq configuration. Fails
    /// with a missing-file error when dnsmasq is not installed.
    pub fn ensure_conf_file(&self, policy: Policy) -> Result<MutationReport> {
        let directive = self.conf_file_directive()?;
        let report = ScopedMutation::new(&self.main_conf())
            .dry_run(policy.dry_run)
            .apply(|doc| {
                doc.ensure(&directive);
                Ok(())
            })?;
        Ok(report)
    }

    /// Drop the `conf-file=` hook again (uninstall).
    pub fn remove_conf_file(&self, policy: Policy) -> Result<MutationReport> {
        let directive = self.conf_file_directive()?;
        let report = ScopedMutation::new(&self.main_conf())
            .dry_run(policy.dry_run)
            .apply(|doc| {
                doc.remove(&directive);
                Ok(())
            })?;
        Ok(report)
    }

    /// Write the `/etc/resolver/<tld>` stanza. The likely failure mode
    /// is a permission error for non-root users; the context carries
    /// the manual command to run instead.
    pub fn ensure_resolver(&self, policy: Policy) -> Result<MutationReport> {
        let path = self.resolver_path();
        if !policy.dry_run {
            fs::create_dir_all(&self.resolver_dir).with_context(|| self.resolver_hint())?;
        }

        let directive = Directive::new(
            "resolver nameserver",
            r"^nameserver\s+127\.0\.0\.1$",
            "nameserver 127.0.0.1",
        )?;

        let report = ScopedMutation::new(&path)
            .create_if_missing(true)
            .dry_run(policy.dry_run)
            .apply(|doc| {
                doc.ensure(&directive);
                Ok(())
            })
            .with_context(|| self.resolver_hint())?;
        Ok(report)
    }

    fn conf_file_directive(&self) -> Result<Directive> {
        let fragment = self.fragment_path().display().to_string();
        let directive = Directive::new(
            "frevo conf-file hook",
            &format!(r"^\s*conf-file={}\s*$", regex::escape(&fragment)),
            &format!("conf-file={fragment}"),
        )?;
        Ok(directive)
    }

    fn resolver_hint(&self) -> String {
        format!(
            "could not write {path}; create it manually with: \
             sudo sh -c 'mkdir -p {dir} && echo \"nameserver 127.0.0.1\" > {path}'",
            path = self.resolver_path().display(),
            dir = self.resolver_dir.display(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BREW_DNSMASQ_CONF: &str = "\
# Configuration file for dnsmasq.
#
# Format is one option per line, legal options are the same
# as the long options legal on the command line.
#conf-file=/opt/homebrew/etc/dnsmasq.d/example.conf
";

    fn dns(dir: &TempDir) -> Dns {
        let prefix = dir.path().join("brew");
        fs::create_dir_all(prefix.join("etc")).unwrap();
        fs::write(prefix.join("etc/dnsmasq.conf"), BREW_DNSMASQ_CONF).unwrap();
        let config_dir = dir.path().join("frevo");
        Dns::new(&prefix, &config_dir, "test").with_resolver_dir(&dir.path().join("resolver"))
    }

    fn apply() -> Policy {
        Policy::default()
    }

    fn dry_run() -> Policy {
        Policy {
            dry_run: true,
            ..Policy::default()
        }
    }

    #[test]
    fn fragment_is_created_with_address_line() {
        let dir = TempDir::new().unwrap();
        let dns = dns(&dir);

        let report = dns.ensure_address(apply()).unwrap();
        assert!(report.changed());
        assert_eq!(
            fs::read_to_string(dns.fragment_path()).unwrap(),
            "address=/test/127.0.0.1\n"
        );

        let again = dns.ensure_address(apply()).unwrap();
        assert!(!again.changed());
    }

    #[test]
    fn changing_tld_replaces_the_mapping() {
        let dir = TempDir::new().unwrap();
        let dns = dns(&dir);
        fs::create_dir_all(dns.fragment_path().parent().unwrap()).unwrap();
        fs::write(dns.fragment_path(), "address=/localhost/127.0.0.1\n").unwrap();

        dns.ensure_address(apply()).unwrap();
        let content = fs::read_to_string(dns.fragment_path()).unwrap();
        assert_eq!(content, "address=/test/127.0.0.1\n");
    }

    #[test]
    fn conf_file_hook_appends_once() {
        let dir = TempDir::new().unwrap();
        let dns = dns(&dir);

        let report = dns.ensure_conf_file(apply()).unwrap();
        assert!(report.changed());

        let content = fs::read_to_string(dns.main_conf()).unwrap();
        assert!(content.starts_with(BREW_DNSMASQ_CONF));
        let hook = format!("conf-file={}", dns.fragment_path().display());
        assert_eq!(content.matches(&hook).count(), 1);

        let again = dns.ensure_conf_file(apply()).unwrap();
        assert!(!again.changed());
        let content = fs::read_to_string(dns.main_conf()).unwrap();
        assert_eq!(content.matches(&hook).count(), 1);
    }

    #[test]
    fn conf_file_hook_requires_dnsmasq_installed() {
        let dir = TempDir::new().unwrap();
        let dns = Dns::new(
            &dir.path().join("no-brew"),
            &dir.path().join("frevo"),
            "test",
        );
        assert!(dns.ensure_conf_file(apply()).is_err());
    }

    #[test]
    fn removing_the_hook_restores_original_content() {
        let dir = TempDir::new().unwrap();
        let dns = dns(&dir);

        dns.ensure_conf_file(apply()).unwrap();
        let report = dns.remove_conf_file(apply()).unwrap();
        assert!(report.changed());
        assert_eq!(
            fs::read_to_string(dns.main_conf()).unwrap(),
            BREW_DNSMASQ_CONF
        );
    }

    #[test]
    fn resolver_stanza_is_written() {
        let dir = TempDir::new().unwrap();
        let dns = dns(&dir);

        let report = dns.ensure_resolver(apply()).unwrap();
        assert!(report.changed());
        assert_eq!(
            fs::read_to_string(dns.resolver_path()).unwrap(),
            "nameserver 127.0.0.1\n"
        );

        let again = dns.ensure_resolver(apply()).unwrap();
        assert!(!again.changed());
    }

    #[test]
    fn dry_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let dns = dns(&dir);

        let address = dns.ensure_address(dry_run()).unwrap();
        let hook = dns.ensure_conf_file(dry_run()).unwrap();
        let resolver = dns.ensure_resolver(dry_run()).unwrap();
        assert!(address.changed() && hook.changed() && resolver.changed());

        assert!(!dns.fragment_path().exists());
        assert!(!dns.resolver_path().exists());
        assert!(!dns.resolver_path().parent().unwrap().exists());
        assert_eq!(
            fs::read_to_string(dns.main_conf()).unwrap(),
            BREW_DNSMASQ_CONF
        );
    }
}
