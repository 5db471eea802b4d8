//! Certificate provisioning via the mkcert CLI.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};
use crate::types::{CertificatePair, san_names, wildcard_covers};

/// Mode for certificates: world-readable so servers can load them.
const CERT_MODE: u32 = 0o644;

/// Mode for private keys: owner only.
const KEY_MODE: u32 = 0o600;

/// What [`Provisioner::ensure`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioned {
    /// A new pair was generated for the subject.
    Created(CertificatePair),
    /// An existing pair already satisfies the subject. For plain
    /// domains this may be a wildcard pair rather than a per-domain one.
    AlreadySatisfied(CertificatePair),
}

impl Provisioned {
    /// The pair that satisfies the request, however it got there.
    #[must_use]
    pub fn pair(&self) -> &CertificatePair {
        match self {
            Self::Created(p) | Self::AlreadySatisfied(p) => p,
        }
    }

    /// Whether a new pair was generated.
    #[must_use]
    pub fn created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Issues and maintains locally-trusted certificate pairs in one
/// directory.
pub struct Provisioner {
    mkcert_path: String,
    certs_dir: PathBuf,
}

impl Provisioner {
    /// Create a provisioner writing pairs under `certs_dir`.
    ///
    /// Fails with [`Error::MkcertNotFound`] when mkcert is not installed.
    pub fn new(certs_dir: &Path) -> Result<Self> {
        Ok(Self {
            mkcert_path: find_mkcert()?,
            certs_dir: certs_dir.to_path_buf(),
        })
    }

    /// Create a provisioner with an explicit mkcert executable.
    #[must_use]
    pub fn with_tool(mkcert_path: &str, certs_dir: &Path) -> Self {
        Self {
            mkcert_path: mkcert_path.to_string(),
            certs_dir: certs_dir.to_path_buf(),
        }
    }

    /// Install the mkcert root CA into the system trust stores.
    /// mkcert itself makes this idempotent.
    pub fn install_ca(&self) -> Result<()> {
        self.run_mkcert(&["-install"], "installing the local CA")
    }

    /// Remove the mkcert root CA from the system trust stores.
    pub fn uninstall_ca(&self) -> Result<()> {
        self.run_mkcert(&["-uninstall"], "uninstalling the local CA")
    }

    /// Converge on a trusted pair for `subject`.
    ///
    /// An existing pair for the subject, or a wildcard pair covering it,
    /// satisfies the request without generating anything; its file modes
    /// are re-enforced either way, so a key loosened by hand is
    /// tightened back on the next run.
    pub fn ensure(&self, subject: &str) -> Result<Provisioned> {
        fs::create_dir_all(&self.certs_dir)?;

        if !subject.starts_with("*.") {
            if let Some(wildcard) = self.find_covering_wildcard(subject)? {
                log::debug!("{subject} covered by wildcard {}", wildcard.subject);
                enforce_modes(&wildcard)?;
                return Ok(Provisioned::AlreadySatisfied(wildcard));
            }
        }

        let pair = CertificatePair::for_subject(&self.certs_dir, subject);
        if pair.exists() {
            enforce_modes(&pair)?;
            return Ok(Provisioned::AlreadySatisfied(pair));
        }
        if let Some(missing) = pair.missing_half() {
            return Err(Error::IncompletePair {
                subject: subject.to_string(),
                missing: missing.to_path_buf(),
            });
        }

        self.generate(&pair)?;
        enforce_modes(&pair)?;
        Ok(Provisioned::Created(pair))
    }

    /// Delete the pair for `subject`. Returns `false` when no files
    /// existed. A pair covered by a wildcard has no files of its own, so
    /// removing it is a no-op and the wildcard survives.
    pub fn remove(&self, subject: &str) -> Result<bool> {
        let pair = CertificatePair::for_subject(&self.certs_dir, subject);
        let mut removed = false;
        for path in [&pair.cert, &pair.key] {
            if path.exists() {
                fs::remove_file(path)?;
                removed = true;
            }
        }
        Ok(removed)
    }

    /// All complete pairs in the certificate directory.
    pub fn list(&self) -> Result<Vec<CertificatePair>> {
        if !self.certs_dir.exists() {
            return Ok(Vec::new());
        }
        let mut pairs = Vec::new();
        for entry in fs::read_dir(&self.certs_dir)? {
            let path = entry?.path();
            if let Some(subject) = CertificatePair::subject_of(&path) {
                let pair = CertificatePair::for_subject(&self.certs_dir, &subject);
                if pair.exists() {
                    pairs.push(pair);
                }
            }
        }
        pairs.sort_by(|a, b| a.subject.cmp(&b.subject));
        Ok(pairs)
    }

    fn find_covering_wildcard(&self, domain: &str) -> Result<Option<CertificatePair>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(CertificatePair::is_wildcard)
            .find(|p| wildcard_covers(&p.subject, domain)))
    }

    fn generate(&self, pair: &CertificatePair) -> Result<()> {
        let names = san_names(&pair.subject);
        log::info!("generating certificate for {}", names.join(", "));

        let mut args: Vec<&str> = vec!["-cert-file"];
        let cert = pair.cert.to_string_lossy();
        let key = pair.key.to_string_lossy();
        args.push(&cert);
        args.push("-key-file");
        args.push(&key);
        args.extend(names.iter().map(String::as_str));

        self.run_mkcert(&args, &format!("generating {}", pair.subject))
    }

    fn run_mkcert(&self, args: &[&str], what: &str) -> Result<()> {
        log::debug!("mkcert {}", args.join(" "));
        let output = Command::new(&self.mkcert_path)
            .args(args)
            .output()
            .map_err(|e| Error::MkcertFailed {
                message: format!("failed to execute mkcert while {what}: {e}"),
                stderr: String::new(),
            })?;

        if !output.status.success() {
            return Err(Error::MkcertFailed {
                message: what.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Re-apply the required modes, repairing drift. Certificates stay
/// world-readable; keys are clamped to owner-only.
fn enforce_modes(pair: &CertificatePair) -> Result<()> {
    for (path, mode) in [(&pair.cert, CERT_MODE), (&pair.key, KEY_MODE)] {
        let current = fs::metadata(path)?.permissions().mode() & 0o777;
        if current != mode {
            log::warn!(
                "repairing mode of {} from {current:o} to {mode:o}",
                path.display()
            );
            fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
        }
    }
    Ok(())
}

/// Find the mkcert executable path.
fn find_mkcert() -> Result<String> {
    let paths = ["/opt/homebrew/bin/mkcert", "/usr/local/bin/mkcert"];

    for path in &paths {
        if Path::new(path).exists() {
            return Ok((*path).to_string());
        }
    }

    let output = Command::new("which")
        .arg("mkcert")
        .output()
        .map_err(|_| Error::MkcertNotFound)?;

    if output.status.success() {
        let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !path.is_empty() {
            return Ok(path);
        }
    }

    Err(Error::MkcertNotFound)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// A provisioner whose tool cannot run, proving which paths of
    /// `ensure` are satisfied without generation.
    fn offline(dir: &TempDir) -> Provisioner {
        Provisioner::with_tool("/nonexistent/mkcert", dir.path())
    }

    fn plant(dir: &TempDir, subject: &str) -> CertificatePair {
        let pair = CertificatePair::for_subject(dir.path(), subject);
        fs::write(&pair.cert, "cert").unwrap();
        fs::write(&pair.key, "key").unwrap();
        pair
    }

    fn mode_of(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    // ── ensure ───────────────────────────────────────────────────────────

    #[test]
    fn existing_pair_satisfies_without_generating() {
        let dir = TempDir::new().unwrap();
        let planted = plant(&dir, "mysite.test");

        let result = offline(&dir).ensure("mysite.test").unwrap();
        assert!(!result.created());
        assert_eq!(result.pair(), &planted);
    }

    #[test]
    fn wildcard_pair_satisfies_covered_domain() {
        let dir = TempDir::new().unwrap();
        let wildcard = plant(&dir, "*.test");

        let result = offline(&dir).ensure("mysite.test").unwrap();
        assert!(!result.created());
        assert_eq!(result.pair(), &wildcard);

        // No per-domain files were created alongside the wildcard.
        assert!(!dir.path().join("mysite.test.pem").exists());
    }

    #[test]
    fn wildcard_does_not_satisfy_deeper_subdomain() {
        let dir = TempDir::new().unwrap();
        plant(&dir, "*.test");

        // Not covered, so ensure reaches for the (unavailable) tool.
        let err = offline(&dir).ensure("a.b.test").unwrap_err();
        assert!(matches!(err, Error::MkcertFailed { .. }));
    }

    #[test]
    fn incomplete_pair_is_rejected() {
        let dir = TempDir::new().unwrap();
        let pair = CertificatePair::for_subject(dir.path(), "mysite.test");
        fs::write(&pair.cert, "cert").unwrap();

        let err = offline(&dir).ensure("mysite.test").unwrap_err();
        assert!(matches!(err, Error::IncompletePair { .. }));
    }

    // ── permissions ──────────────────────────────────────────────────────

    #[test]
    fn ensure_repairs_drifted_modes() {
        let dir = TempDir::new().unwrap();
        let pair = plant(&dir, "mysite.test");
        fs::set_permissions(&pair.cert, fs::Permissions::from_mode(0o600)).unwrap();
        fs::set_permissions(&pair.key, fs::Permissions::from_mode(0o644)).unwrap();

        offline(&dir).ensure("mysite.test").unwrap();
        assert_eq!(mode_of(&pair.cert), 0o644);
        assert_eq!(mode_of(&pair.key), 0o600);
    }

    // ── remove / list ────────────────────────────────────────────────────

    #[test]
    fn remove_deletes_both_halves() {
        let dir = TempDir::new().unwrap();
        let pair = plant(&dir, "mysite.test");

        assert!(offline(&dir).remove("mysite.test").unwrap());
        assert!(!pair.cert.exists());
        assert!(!pair.key.exists());
        assert!(!offline(&dir).remove("mysite.test").unwrap());
    }

    #[test]
    fn remove_of_wildcard_covered_domain_keeps_wildcard() {
        let dir = TempDir::new().unwrap();
        let wildcard = plant(&dir, "*.test");

        assert!(!offline(&dir).remove("mysite.test").unwrap());
        assert!(wildcard.exists());
    }

    #[test]
    fn list_returns_complete_pairs_sorted() {
        let dir = TempDir::new().unwrap();
        plant(&dir, "zzz.test");
        plant(&dir, "*.test");
        plant(&dir, "aaa.test");
        // A stray half-pair is not listed.
        let partial = CertificatePair::for_subject(dir.path(), "broken.test");
        fs::write(&partial.cert, "cert").unwrap();

        let subjects: Vec<String> = offline(&dir)
            .list()
            .unwrap()
            .into_iter()
            .map(|p| p.subject)
            .collect();
        assert_eq!(subjects, ["*.test", "aaa.test", "zzz.test"]);
    }

    #[test]
    fn list_of_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let provisioner = Provisioner::with_tool("/nonexistent/mkcert", &dir.path().join("certs"));
        assert!(provisioner.list().unwrap().is_empty());
    }
}
