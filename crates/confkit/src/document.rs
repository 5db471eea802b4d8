//! Line-oriented configuration documents.
//!
//! A [`Document`] holds the full content of one configuration file and
//! applies directive-level edits in memory. Nothing touches the disk
//! until the caller commits through a
//! [`ScopedMutation`](crate::mutation::ScopedMutation) or calls
//! [`Document::save`] directly.

use std::fs;
use std::path::{Path, PathBuf};

use crate::directive::{Directive, Outcome};
use crate::error::{Error, Result};

/// An in-memory configuration file, edited line by line.
///
/// All content other than the lines a directive targets is preserved
/// exactly, including blank lines and comments. The original content
/// hash is kept so change detection survives edits that cancel out.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    lines: Vec<String>,
    trailing_newline: bool,
    original_hash: blake3::Hash,
}

impl Document {
    /// Load `path`, failing with [`Error::ConfigNotFound`] when it does
    /// not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Ok(Self::from_content(path, &content))
    }

    /// Load `path`, treating a missing file as empty. Used for files we
    /// own outright, such as a resolver stanza written from scratch.
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::from_content(path, ""))
        }
    }

    /// Build a document from content already in hand.
    #[must_use]
    pub fn from_content(path: &Path, content: &str) -> Self {
        let trailing_newline = content.is_empty() || content.ends_with('\n');
        let lines = content
            .strip_suffix('\n')
            .unwrap_or(content)
            .split('\n')
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        // An empty file has zero lines, not one empty line.
        let lines = if content.is_empty() { Vec::new() } else { lines };
        Self {
            path: path.to_path_buf(),
            lines,
            trailing_newline,
            original_hash: blake3::hash(content.as_bytes()),
        }
    }

    /// The file this document was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render the current content back to a string.
    #[must_use]
    pub fn render(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let mut out = self.lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    /// Whether the current content differs from what was loaded.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        blake3::hash(self.render().as_bytes()) != self.original_hash
    }

    /// Whether any line satisfies `directive`.
    #[must_use]
    pub fn contains(&self, directive: &Directive) -> bool {
        self.lines.iter().any(|l| directive.matches(l))
    }

    // =========================================================================
    // Directive operations
    // =========================================================================

    /// Converge the document on `directive`.
    ///
    /// A disabled form of the directive is rewritten in place; a
    /// satisfying line means nothing happens; otherwise the canonical
    /// line is inserted at the directive's anchor (or appended). A
    /// satisfying line anywhere in the document suppresses the rewrite
    /// and the insert, so repeated calls never duplicate.
    pub fn ensure(&mut self, directive: &Directive) -> Outcome {
        let satisfied = self.contains(directive);

        if let Some(idx) = self
            .lines
            .iter()
            .position(|l| directive.matches_disabled(l))
        {
            if satisfied {
                // Already satisfied elsewhere; rewriting the disabled
                // line would duplicate the directive.
                return Outcome::Unchanged;
            }
            log::debug!(
                "{}: enabling disabled line {} in {}",
                directive.name(),
                idx + 1,
                self.path.display()
            );
            self.lines[idx] = directive.canonical().to_string();
            return Outcome::Changed;
        }

        if satisfied {
            return Outcome::Unchanged;
        }

        let pos = directive.insert_position(&self.lines);
        log::debug!(
            "{}: inserting at line {} in {}",
            directive.name(),
            pos + 1,
            self.path.display()
        );
        self.lines.insert(pos, directive.canonical().to_string());
        if self.lines.len() == 1 {
            self.trailing_newline = true;
        }
        Outcome::Changed
    }

    /// Converge the document on `directive` as the only member of its
    /// family: every other family line is removed, then the canonical
    /// line is ensured. Used for settings that must appear exactly once,
    /// such as the interpreter module line when switching versions.
    pub fn ensure_singleton(&mut self, directive: &Directive) -> Outcome {
        let family: Vec<usize> = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, l)| directive.matches_family(l))
            .map(|(i, _)| i)
            .collect();

        // Exactly one family line that already satisfies the directive.
        if let [only] = family.as_slice() {
            if directive.matches(&self.lines[*only]) {
                return Outcome::Unchanged;
            }
        }

        for idx in family.iter().rev() {
            log::debug!(
                "{}: evicting line {} in {}",
                directive.name(),
                idx + 1,
                self.path.display()
            );
            self.lines.remove(*idx);
        }
        self.ensure(directive);
        Outcome::Changed
    }

    /// Remove every line satisfying `directive`.
    pub fn remove(&mut self, directive: &Directive) -> Outcome {
        let before = self.lines.len();
        self.lines.retain(|l| !directive.matches(l));
        if self.lines.len() == before {
            Outcome::Unchanged
        } else {
            log::debug!(
                "{}: removed {} line(s) from {}",
                directive.name(),
                before - self.lines.len(),
                self.path.display()
            );
            Outcome::Changed
        }
    }

    /// Write the current content back to the file.
    ///
    /// Prefer going through [`ScopedMutation`](crate::mutation::ScopedMutation),
    /// which backs the file up first and honors dry-run.
    pub fn save(&self) -> Result<()> {
        fs::write(&self.path, self.render()).map_err(|e| Error::from_write(&self.path, e))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    fn listen(port: u16) -> Directive {
        Directive::new(
            "listen port",
            &format!(r"^Listen {port}$"),
            &format!("Listen {port}"),
        )
        .unwrap()
        .with_family(r"^Listen \d+$")
        .unwrap()
    }

    // ── loading ──────────────────────────────────────────────────────────

    #[test]
    fn load_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = Document::load(&dir.path().join("absent.conf")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }

    #[test]
    fn load_or_empty_accepts_missing_file() {
        let dir = TempDir::new().unwrap();
        let doc = Document::load_or_empty(&dir.path().join("absent.conf")).unwrap();
        assert_eq!(doc.render(), "");
        assert!(!doc.is_modified());
    }

    #[test]
    fn render_round_trips_content() {
        let dir = TempDir::new().unwrap();
        let content = "# comment\n\nListen 80\nServerName localhost\n";
        let path = write_file(&dir, "httpd.conf", content);
        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.render(), content);
        assert!(!doc.is_modified());
    }

    #[test]
    fn render_preserves_missing_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "no-eol.conf", "Listen 80");
        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.render(), "Listen 80");
    }

    // ── ensure ───────────────────────────────────────────────────────────

    #[test]
    fn ensure_appends_when_absent() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "httpd.conf", "# header\n");
        let mut doc = Document::load(&path).unwrap();

        assert_eq!(doc.ensure(&listen(8080)), Outcome::Changed);
        assert_eq!(doc.render(), "# header\nListen 8080\n");
    }

    #[test]
    fn ensure_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "httpd.conf", "# header\n");
        let mut doc = Document::load(&path).unwrap();

        assert_eq!(doc.ensure(&listen(8080)), Outcome::Changed);
        let after_first = doc.render();
        assert_eq!(doc.ensure(&listen(8080)), Outcome::Unchanged);
        assert_eq!(doc.render(), after_first);
    }

    #[test]
    fn ensure_rewrites_disabled_form_in_place() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "httpd.conf",
            "Listen 80\n#LoadModule rewrite_module lib/mod_rewrite.so\nServerName localhost\n",
        );
        let mut doc = Document::load(&path).unwrap();

        let d = Directive::new(
            "rewrite module",
            r"^LoadModule rewrite_module\b",
            "LoadModule rewrite_module lib/mod_rewrite.so",
        )
        .unwrap()
        .with_disabled(r"^#\s*LoadModule rewrite_module\b")
        .unwrap();

        assert_eq!(doc.ensure(&d), Outcome::Changed);
        assert_eq!(
            doc.render(),
            "Listen 80\nLoadModule rewrite_module lib/mod_rewrite.so\nServerName localhost\n"
        );
    }

    #[test]
    fn ensure_leaves_disabled_form_when_already_satisfied() {
        let dir = TempDir::new().unwrap();
        let content = "#LoadModule rewrite_module lib/mod_rewrite.so\n\
                       LoadModule rewrite_module lib/mod_rewrite.so\n";
        let path = write_file(&dir, "httpd.conf", content);
        let mut doc = Document::load(&path).unwrap();

        let d = Directive::new(
            "rewrite module",
            r"^LoadModule rewrite_module\b",
            "LoadModule rewrite_module lib/mod_rewrite.so",
        )
        .unwrap()
        .with_disabled(r"^#\s*LoadModule rewrite_module\b")
        .unwrap();

        assert_eq!(doc.ensure(&d), Outcome::Unchanged);
        assert_eq!(doc.render(), content);
    }

    #[test]
    fn ensure_inserts_at_anchor() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "httpd.conf", "Listen 80\n# vhosts below\n");
        let mut doc = Document::load(&path).unwrap();

        let d = Directive::new("server name", r"^ServerName ", "ServerName localhost")
            .unwrap()
            .with_anchor(r"^# vhosts below$")
            .unwrap();

        assert_eq!(doc.ensure(&d), Outcome::Changed);
        assert_eq!(doc.render(), "Listen 80\nServerName localhost\n# vhosts below\n");
    }

    #[test]
    fn ensure_into_empty_document_gets_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let mut doc = Document::load_or_empty(&dir.path().join("fresh.conf")).unwrap();
        assert_eq!(doc.ensure(&listen(53)), Outcome::Changed);
        assert_eq!(doc.render(), "Listen 53\n");
    }

    // ── ensure_singleton ─────────────────────────────────────────────────

    #[test]
    fn singleton_replaces_other_family_members() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "httpd.conf", "# header\nListen 80\n# footer\n");
        let mut doc = Document::load(&path).unwrap();

        assert_eq!(doc.ensure_singleton(&listen(8080)), Outcome::Changed);
        assert_eq!(doc.render(), "# header\nListen 8080\n# footer\n");
    }

    #[test]
    fn singleton_never_leaves_two_lines() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "httpd.conf", "Listen 80\nListen 8080\n");
        let mut doc = Document::load(&path).unwrap();

        assert_eq!(doc.ensure_singleton(&listen(9090)), Outcome::Changed);
        assert_eq!(doc.render(), "Listen 9090\n");
    }

    #[test]
    fn singleton_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "httpd.conf", "Listen 8080\n");
        let mut doc = Document::load(&path).unwrap();

        assert_eq!(doc.ensure_singleton(&listen(8080)), Outcome::Unchanged);
        assert!(!doc.is_modified());
    }

    // ── remove ───────────────────────────────────────────────────────────

    #[test]
    fn remove_deletes_all_matches() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "httpd.conf", "Listen 80\n# keep\nListen 80\n");
        let mut doc = Document::load(&path).unwrap();

        assert_eq!(doc.remove(&listen(80)), Outcome::Changed);
        assert_eq!(doc.render(), "# keep\n");
        assert_eq!(doc.remove(&listen(80)), Outcome::Unchanged);
    }

    // ── save ─────────────────────────────────────────────────────────────

    #[test]
    fn save_writes_rendered_content() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "httpd.conf", "Listen 80\n");
        let mut doc = Document::load(&path).unwrap();
        doc.ensure_singleton(&listen(8080));
        doc.save().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "Listen 8080\n");
    }
}
