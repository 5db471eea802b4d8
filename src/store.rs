//! Site registry.
//!
//! One file per site, `<domain>.conf`, in the vhosts directory. The
//! directory is the entire index: a file's presence is what makes a
//! site exist, and `list` is a directory scan. Overwriting is refused
//! so a hand-edited file is never silently replaced; replacing a site
//! is an explicit remove-then-write.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::vhost::VHostEntry;

pub struct VhostStore {
    dir: PathBuf,
}

impl VhostStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Backing file for a domain.
    pub fn path_for(&self, domain: &str) -> PathBuf {
        self.dir.join(format!("{domain}.conf"))
    }

    /// Presence of the backing file, nothing more.
    pub fn exists(&self, domain: &str) -> bool {
        self.path_for(domain).is_file()
    }

    /// All parseable entries, sorted by domain. Files without a frevo
    /// marker are logged and skipped, never touched.
    pub fn list(&self) -> Result<Vec<VHostEntry>> {
        let mut entries = Vec::new();
        let dir = match fs::read_dir(&self.dir) {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(entries),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {}", self.dir.display()));
            }
        };

        for item in dir {
            let path = item?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("conf") {
                continue;
            }
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            match VHostEntry::parse(&content) {
                Ok(entry) => entries.push(entry),
                Err(err) => log::warn!("skipping {}: {err}", path.display()),
            }
        }

        entries.sort_by(|a, b| a.domain.cmp(&b.domain));
        Ok(entries)
    }

    /// Load one entry by domain.
    pub fn read(&self, domain: &str) -> Result<VHostEntry> {
        let path = self.path_for(domain);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("no site file at {}", path.display()))?;
        VHostEntry::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Write a new entry. Refuses to overwrite: an existing file must
    /// be removed first, even under `--force`.
    pub fn write(&self, entry: &VHostEntry, content: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.path_for(&entry.domain);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                bail!(
                    "site {} already exists at {} (remove it first)",
                    entry.domain,
                    path.display()
                );
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to create {}", path.display()));
            }
        };
        file.write_all(content.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Delete a site file.
    pub fn remove(&self, domain: &str) -> Result<()> {
        let path = self.path_for(domain);
        fs::remove_file(&path).with_context(|| format!("failed to remove {}", path.display()))
    }
}
