//! Scoped mutations: snapshot, edit, verify, commit.
//!
//! [`ScopedMutation`] is the only path through which confkit writes to
//! disk. It loads the target into a [`Document`], hands it to an edit
//! closure, and commits only when the content actually changed, backing
//! the file up first. An optional verify step runs against the written
//! file; if it rejects the result, the mutation reports failure and
//! leaves both the new content and the backup in place for inspection.
//! Nothing is ever restored automatically.

use std::fs;
use std::path::{Path, PathBuf};

use crate::backup;
use crate::directive::Outcome;
use crate::document::Document;
use crate::error::{Error, Result};

/// Report of a completed mutation.
#[derive(Debug)]
pub struct MutationReport {
    /// Whether the file content changed (or would change, under dry-run).
    pub outcome: Outcome,
    /// Backup written before the commit. `None` when nothing was written
    /// or the file did not previously exist.
    pub backup: Option<PathBuf>,
    /// Content before the edit.
    pub before: String,
    /// Content after the edit (equal to `before` when unchanged).
    pub after: String,
}

impl MutationReport {
    /// Whether the edit produced (or would produce) different content.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.outcome.changed()
    }
}

/// A single edit against one configuration file.
#[derive(Debug)]
pub struct ScopedMutation {
    path: PathBuf,
    dry_run: bool,
    create_if_missing: bool,
}

impl ScopedMutation {
    /// Target `path` for editing.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            dry_run: false,
            create_if_missing: false,
        }
    }

    /// Compute the edit and report it without touching the disk. No
    /// backup is taken and no verification runs, because nothing is
    /// written.
    #[must_use]
    pub fn dry_run(mut self, yes: bool) -> Self {
        self.dry_run = yes;
        self
    }

    /// Treat a missing target as an empty document instead of failing
    /// with [`Error::ConfigNotFound`]. Used for files we create from
    /// scratch, such as a fresh resolver stanza.
    #[must_use]
    pub fn create_if_missing(mut self, yes: bool) -> Self {
        self.create_if_missing = yes;
        self
    }

    /// Run `edit` against the loaded document and commit the result.
    pub fn apply<F>(self, edit: F) -> Result<MutationReport>
    where
        F: FnOnce(&mut Document) -> Result<()>,
    {
        self.apply_verified(edit, |_| Ok(()))
    }

    /// Run `edit`, commit, then run `verify` against the written file.
    ///
    /// `verify` returns a human-readable rejection reason on failure, in
    /// which case the mutation fails with [`Error::VerificationFailed`].
    /// The rejected content stays on disk and the backup is kept; the
    /// caller decides what to do next.
    pub fn apply_verified<F, V>(self, edit: F, verify: V) -> Result<MutationReport>
    where
        F: FnOnce(&mut Document) -> Result<()>,
        V: FnOnce(&Path) -> std::result::Result<(), String>,
    {
        let existed = self.path.exists();
        let mut doc = if self.create_if_missing {
            Document::load_or_empty(&self.path)?
        } else {
            Document::load(&self.path)?
        };
        let before = doc.render();

        edit(&mut doc)?;

        // Idempotency guard: identical content is never rewritten, so an
        // unchanged file keeps its mtime and gains no backup.
        if !doc.is_modified() {
            log::debug!("{}: no changes", self.path.display());
            return Ok(MutationReport {
                outcome: Outcome::Unchanged,
                backup: None,
                after: before.clone(),
                before,
            });
        }

        let after = doc.render();

        if self.dry_run {
            log::debug!("{}: dry run, not writing", self.path.display());
            return Ok(MutationReport {
                outcome: Outcome::Changed,
                backup: None,
                before,
                after,
            });
        }

        let backup = if existed {
            Some(backup::snapshot(&self.path)?)
        } else {
            // First write to a fresh path; its directory may not exist yet.
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::from_write(&self.path, e))?;
            }
            None
        };

        doc.save()?;
        log::info!("updated {}", self.path.display());

        if let Err(detail) = verify(&self.path) {
            return Err(Error::VerificationFailed {
                path: self.path,
                detail,
                backup,
            });
        }

        Ok(MutationReport {
            outcome: Outcome::Changed,
            backup,
            before,
            after,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
