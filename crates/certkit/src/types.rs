//! Certificate pair naming and subject coverage rules.

use std::path::{Path, PathBuf};

/// A certificate and private key on disk for one subject.
///
/// File names follow the mkcert convention: `mysite.test.pem` with
/// `mysite.test-key.pem`, and a leading `*.` becomes `_wildcard.` so
/// wildcard subjects produce portable file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificatePair {
    /// The subject the pair was issued for (`mysite.test` or `*.test`).
    pub subject: String,
    /// Path to the certificate (mode 0644).
    pub cert: PathBuf,
    /// Path to the private key (mode 0600).
    pub key: PathBuf,
}

impl CertificatePair {
    /// Compute the on-disk pair for `subject` under `dir`.
    #[must_use]
    pub fn for_subject(dir: &Path, subject: &str) -> Self {
        let stem = subject
            .strip_prefix("*.")
            .map_or_else(|| subject.to_string(), |rest| format!("_wildcard.{rest}"));
        Self {
            subject: subject.to_string(),
            cert: dir.join(format!("{stem}.pem")),
            key: dir.join(format!("{stem}-key.pem")),
        }
    }

    /// Recover the subject from a certificate file name, if it follows
    /// the pair convention.
    #[must_use]
    pub fn subject_of(cert_path: &Path) -> Option<String> {
        let name = cert_path.file_name()?.to_str()?;
        let stem = name.strip_suffix(".pem")?;
        if stem.ends_with("-key") {
            return None;
        }
        Some(
            stem.strip_prefix("_wildcard.")
                .map_or_else(|| stem.to_string(), |rest| format!("*.{rest}")),
        )
    }

    /// Whether both halves of the pair exist.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.cert.exists() && self.key.exists()
    }

    /// The missing half, when exactly one file exists.
    #[must_use]
    pub fn missing_half(&self) -> Option<&Path> {
        match (self.cert.exists(), self.key.exists()) {
            (true, false) => Some(&self.key),
            (false, true) => Some(&self.cert),
            _ => None,
        }
    }

    /// Whether this pair was issued for a wildcard subject.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.subject.starts_with("*.")
    }
}

/// Names to place in the certificate for `subject`.
///
/// A wildcard subject also carries the bare suffix, so `https://test`
/// works alongside `https://anything.test`. A plain domain gains a
/// `www.` alias unless it already has one.
#[must_use]
pub fn san_names(subject: &str) -> Vec<String> {
    if let Some(suffix) = subject.strip_prefix("*.") {
        return vec![subject.to_string(), suffix.to_string()];
    }
    if subject.starts_with("www.") {
        return vec![subject.to_string()];
    }
    vec![subject.to_string(), format!("www.{subject}")]
}

/// Whether a pair issued for `wildcard` satisfies a request for `domain`.
///
/// TLS wildcards match exactly one label, so `*.test` covers
/// `mysite.test` but not `a.b.test`. The bare suffix is covered too
/// because wildcard pairs are issued with it as an extra name.
#[must_use]
pub fn wildcard_covers(wildcard: &str, domain: &str) -> bool {
    let Some(suffix) = wildcard.strip_prefix("*.") else {
        return false;
    };
    if domain == suffix {
        return true;
    }
    domain
        .strip_suffix(suffix)
        .and_then(|head| head.strip_suffix('.'))
        .is_some_and(|label| !label.is_empty() && !label.contains('.'))
}
