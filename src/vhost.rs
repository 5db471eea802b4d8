//! Virtual host definitions.
//!
//! Each site frevo manages is one Apache `<VirtualHost>` file rendered
//! from a [`VHostEntry`]. The first line of the file is a marker
//! comment carrying the entry's fields as `key="value"` pairs, so a
//! rendered file can be parsed back without guessing at Apache syntax.
//! Files without the marker are somebody else's and are left alone.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use certkit::CertificatePair;

const MARKER: &str = "# frevo site:";

/// One site: qualified domain, document root, ports and the subject of
/// the certificate pair backing its TLS listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VHostEntry {
    pub domain: String,
    pub root: PathBuf,
    pub http_port: u16,
    pub https_port: u16,
    /// Certificate subject, either the domain itself or a wildcard
    /// such as `*.test` that covers it.
    pub cert: String,
}

/// Check a domain against the allowed character set. Rejected input
/// never reaches the filesystem.
pub fn validate_domain(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !ok {
        bail!("invalid domain {name:?}: only letters, digits, dots and hyphens are allowed");
    }
    Ok(())
}

impl VHostEntry {
    /// File name of the backing entity, `<domain>.conf`.
    pub fn file_name(&self) -> String {
        format!("{}.conf", self.domain)
    }

    /// Whether this entry rides on a wildcard certificate rather than
    /// a pair issued for the domain itself.
    pub fn uses_wildcard_cert(&self) -> bool {
        self.cert.starts_with("*.")
    }

    /// Render the full Apache configuration for this site, marker line
    /// first. `certs_dir` locates the certificate pair referenced by
    /// `cert`.
    pub fn render(&self, certs_dir: &Path) -> String {
        let pair = CertificatePair::for_subject(certs_dir, &self.cert);
        let root = self.root.display().to_string();

        let mut lines = vec![self.marker()];
        lines.push(format!("<VirtualHost *:{}>", self.http_port));
        lines.push(format!("    ServerName {}", self.domain));
        lines.push(format!("    DocumentRoot \"{root}\""));
        lines.extend(directory_block(&root));
        lines.push(format!("    ErrorLog \"logs/{}-error_log\"", self.domain));
        lines.push(format!(
            "    CustomLog \"logs/{}-access_log\" common",
            self.domain
        ));
        lines.push("</VirtualHost>".to_string());
        lines.push(String::new());
        lines.push(format!("<VirtualHost *:{}>", self.https_port));
        lines.push(format!("    ServerName {}", self.domain));
        lines.push(format!("    DocumentRoot \"{root}\""));
        lines.push("    SSLEngine on".to_string());
        lines.push(format!(
            "    SSLCertificateFile \"{}\"",
            pair.cert.display()
        ));
        lines.push(format!(
            "    SSLCertificateKeyFile \"{}\"",
            pair.key.display()
        ));
        lines.extend(directory_block(&root));
        lines.push("</VirtualHost>".to_string());

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    /// Parse an entry back out of a rendered file.
    pub fn parse(content: &str) -> Result<Self> {
        let line = content
            .lines()
            .find(|l| l.trim_start().starts_with(MARKER))
            .context("not a frevo site file (missing marker line)")?;
        let fields = marker_fields(line.trim_start())
            .context("malformed frevo marker line")?;

        let get = |key: &str| -> Result<&String> {
            fields
                .get(key)
                .with_context(|| format!("marker line is missing {key:?}"))
        };
        let port = |key: &str| -> Result<u16> {
            get(key)?
                .parse()
                .with_context(|| format!("marker field {key:?} is not a port number"))
        };

        let domain = get("domain")?.clone();
        validate_domain(&domain)?;

        Ok(Self {
            domain,
            root: PathBuf::from(get("root")?),
            http_port: port("http")?,
            https_port: port("https")?,
            cert: get("cert")?.clone(),
        })
    }

    fn marker(&self) -> String {
        format!(
            "{MARKER} domain=\"{}\" root=\"{}\" cert=\"{}\" http=\"{}\" https=\"{}\"",
            self.domain,
            self.root.display(),
            self.cert,
            self.http_port,
            self.https_port,
        )
    }
}

fn directory_block(root: &str) -> Vec<String> {
    vec![
        format!("    <Directory \"{root}\">"),
        "        Options Indexes FollowSymLinks".to_string(),
        "        AllowOverride All".to_string(),
        "        Require all granted".to_string(),
        "    </Directory>".to_string(),
    ]
}

/// Scan `key="value"` pairs off a marker line. Values may contain
/// anything but a double quote, which keeps paths with spaces intact.
fn marker_fields(line: &str) -> Option<HashMap<String, String>> {
    let mut fields = HashMap::new();
    let mut rest = line.strip_prefix(MARKER)?.trim_start();
    while !rest.is_empty() {
        let eq = rest.find("=\"")?;
        let key = rest[..eq].trim();
        let after = &rest[eq + 2..];
        let end = after.find('"')?;
        fields.insert(key.to_string(), after[..end].to_string());
        rest = after[end + 1..].trim_start();
    }
    Some(fields)
}
