//! MySQL management.
//!
//! frevo keeps a `[client]` credentials file under its config dir so
//! `mysql` and `mysqldump` run without prompting. The file holds the
//! password, so it is created owner-read/write only and the mode is
//! repaired if it ever loosens. Dumps stream through gzip on the way
//! to disk; restores accept both `.sql.gz` and plain `.sql` input.

use std::fs::{self, File, Permissions};
use std::io::{self, BufReader, Read};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::config::{DatabaseSettings, Policy};
use crate::runner;

const CREDENTIALS_FILE: &str = "my.cnf";
const CREDENTIALS_MODE: u32 = 0o600;

pub struct Database {
    prefix: PathBuf,
    config_dir: PathBuf,
    db: DatabaseSettings,
}

impl Database {
    pub fn new(prefix: &Path, config_dir: &Path, db: &DatabaseSettings) -> Self {
        Self {
            prefix: prefix.to_path_buf(),
            config_dir: config_dir.to_path_buf(),
            db: db.clone(),
        }
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.config_dir.join(CREDENTIALS_FILE)
    }

    /// Converge the credentials file on the configured settings with
    /// mode 0600. Returns whether anything changed (or would change).
    pub fn ensure_credentials(&self, policy: Policy) -> Result<bool> {
        let path = self.credentials_path();
        let desired = self.render_credentials();

        let content_ok = fs::read_to_string(&path).is_ok_and(|current| current == desired);
        let mode_ok = path
            .metadata()
            .is_ok_and(|m| m.permissions().mode() & 0o777 == CREDENTIALS_MODE);
        if content_ok && mode_ok {
            return Ok(false);
        }
        if content_ok {
            log::warn!("fixing permissions on {}", path.display());
        }

        if policy.dry_run {
            log::debug!("dry run: not writing {}", path.display());
            return Ok(true);
        }

        fs::create_dir_all(&self.config_dir)
            .with_context(|| format!("failed to create {}", self.config_dir.display()))?;
        fs::write(&path, &desired)
            .with_context(|| format!("failed to write {}", path.display()))?;
        fs::set_permissions(&path, Permissions::from_mode(CREDENTIALS_MODE))
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
        Ok(true)
    }

    /// Run a statement through the client and return its stdout.
    pub fn exec(&self, sql: &str) -> Result<String> {
        let defaults = self.defaults_arg();
        runner::run_capture(self.client_bin(), &[&defaults, "-e", sql])
            .with_context(|| format!("mysql statement failed: {sql}"))
    }

    /// Dump one database, gzipped, to `out`.
    pub fn dump(&self, name: &str, out: &Path) -> Result<()> {
        validate_db_name(name)?;

        let mut child = Command::new(self.dump_bin())
            .arg(self.defaults_arg())
            .arg(name)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to run mysqldump for {name}"))?;
        let stdout = child
            .stdout
            .take()
            .context("mysqldump gave no stdout handle")?;

        let file =
            File::create(out).with_context(|| format!("failed to create {}", out.display()))?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        io::copy(&mut BufReader::new(stdout), &mut encoder)
            .context("failed to stream dump output")?;

        let output = child.wait_with_output()?;
        if !output.status.success() {
            // Leave no truncated archive behind.
            let _ = fs::remove_file(out);
            bail!(
                "mysqldump failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        encoder.finish().context("failed to finalize dump archive")?;
        Ok(())
    }

    /// Feed a dump back into the server, creating the database first.
    pub fn restore(&self, name: &str, input: &Path) -> Result<()> {
        validate_db_name(name)?;
        let mut reader = open_dump(input)?;

        self.exec(&format!("CREATE DATABASE IF NOT EXISTS `{name}`"))?;

        let mut child = Command::new(self.client_bin())
            .arg(self.defaults_arg())
            .arg(name)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to run mysql for {name}"))?;
        {
            let mut stdin = child.stdin.take().context("mysql gave no stdin handle")?;
            io::copy(&mut reader, &mut stdin)
                .with_context(|| format!("failed to stream {} into mysql", input.display()))?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            bail!(
                "restore failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    fn render_credentials(&self) -> String {
        format!(
            "[client]\nuser={}\npassword={}\nhost={}\nport={}\n",
            self.db.user, self.db.password, self.db.host, self.db.port
        )
    }

    fn defaults_arg(&self) -> String {
        format!("--defaults-extra-file={}", self.credentials_path().display())
    }

    // Versioned formulas like mysql@8.0 are keg-only, so the binaries
    // are only reachable through the opt path, never plain PATH.
    fn client_bin(&self) -> PathBuf {
        self.prefix
            .join("opt")
            .join(&self.db.formula)
            .join("bin/mysql")
    }

    fn dump_bin(&self) -> PathBuf {
        self.prefix
            .join("opt")
            .join(&self.db.formula)
            .join("bin/mysqldump")
    }
}

fn validate_db_name(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !ok {
        bail!("invalid database name {name:?}: only letters, digits, '_' and '-' are allowed");
    }
    Ok(())
}

fn open_dump(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn database(dir: &TempDir) -> Database {
        Database::new(
            &dir.path().join("brew"),
            &dir.path().join("frevo"),
            &DatabaseSettings::default(),
        )
    }

    fn mode_of(path: &Path) -> u32 {
        path.metadata().unwrap().permissions().mode() & 0o777
    }

    #[test]
    fn credentials_render_as_client_section() {
        let dir = TempDir::new().unwrap();
        let db = database(&dir);
        assert_eq!(
            db.render_credentials(),
            "[client]\nuser=root\npassword=\nhost=127.0.0.1\nport=3306\n"
        );
    }

    #[test]
    fn ensure_credentials_creates_owner_only_file() {
        let dir = TempDir::new().unwrap();
        let db = database(&dir);

        assert!(db.ensure_credentials(Policy::default()).unwrap());
        let path = db.credentials_path();
        assert_eq!(mode_of(&path), 0o600);
        assert!(fs::read_to_string(&path).unwrap().starts_with("[client]"));

        // Second pass converges on nothing.
        assert!(!db.ensure_credentials(Policy::default()).unwrap());
    }

    #[test]
    fn loose_credentials_mode_is_repaired() {
        let dir = TempDir::new().unwrap();
        let db = database(&dir);
        db.ensure_credentials(Policy::default()).unwrap();

        let path = db.credentials_path();
        fs::set_permissions(&path, Permissions::from_mode(0o644)).unwrap();
        assert!(db.ensure_credentials(Policy::default()).unwrap());
        assert_eq!(mode_of(&path), 0o600);
    }

    #[test]
    fn dry_run_reports_without_writing() {
        let dir = TempDir::new().unwrap();
        let db = database(&dir);

        let policy = Policy {
            dry_run: true,
            ..Policy::default()
        };
        assert!(db.ensure_credentials(policy).unwrap());
        assert!(!db.credentials_path().exists());
    }

    #[test]
    fn defaults_arg_points_at_credentials() {
        let dir = TempDir::new().unwrap();
        let db = database(&dir);
        let arg = db.defaults_arg();
        assert!(arg.starts_with("--defaults-extra-file="));
        assert!(arg.ends_with("my.cnf"));
    }

    #[test]
    fn binaries_resolve_through_the_opt_path() {
        let dir = TempDir::new().unwrap();
        let mut settings = DatabaseSettings::default();
        settings.formula = "mysql@8.0".to_string();
        let db = Database::new(&dir.path().join("brew"), &dir.path().join("frevo"), &settings);

        let client = db.client_bin();
        assert!(client.ends_with("opt/mysql@8.0/bin/mysql"));
        assert!(db.dump_bin().ends_with("opt/mysql@8.0/bin/mysqldump"));
    }

    #[test]
    fn db_names_are_validated() {
        assert!(validate_db_name("app_dev").is_ok());
        assert!(validate_db_name("app-2024").is_ok());
        assert!(validate_db_name("").is_err());
        assert!(validate_db_name("app dev").is_err());
        assert!(validate_db_name("app;drop").is_err());
        assert!(validate_db_name("app`x`").is_err());
    }

    #[test]
    fn open_dump_decodes_gzip_input() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup.sql.gz");
        let mut encoder =
            GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(b"CREATE TABLE t (id INT);\n").unwrap();
        encoder.finish().unwrap();

        let mut content = String::new();
        open_dump(&path).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "CREATE TABLE t (id INT);\n");
    }

    #[test]
    fn open_dump_passes_plain_sql_through() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup.sql");
        fs::write(&path, "SELECT 1;\n").unwrap();

        let mut content = String::new();
        open_dump(&path).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "SELECT 1;\n");
    }
}
