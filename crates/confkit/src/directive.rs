//! Directive definitions.
//!
//! A [`Directive`] names one logical setting inside a line-oriented
//! configuration file: the exact line we want present, plus the patterns
//! that recognize equivalent or related lines already in the file.

use regex::Regex;

use crate::error::{Error, Result};

// =============================================================================
// Outcome
// =============================================================================

/// What an ensure/remove call did to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The document was edited.
    Changed,
    /// The document already satisfied the request; nothing was touched.
    Unchanged,
}

impl Outcome {
    /// Whether this outcome edited the document.
    #[must_use]
    pub fn changed(self) -> bool {
        matches!(self, Outcome::Changed)
    }
}

// =============================================================================
// Directive
// =============================================================================

/// A single setting to converge inside a configuration file.
///
/// The `matcher` pattern decides whether a line already satisfies the
/// directive. It is matched against each line in isolation and should be
/// anchored with `^` where leading context matters. The optional pieces:
///
/// - `disabled`: recognizes a commented-out form of the same setting.
///   When found (and no satisfying line exists), the line is rewritten
///   in place instead of appending a duplicate.
/// - `anchor`: new lines are inserted immediately before the first line
///   matching this pattern instead of at end of file.
/// - `family`: for singleton directives, matches every variant of the
///   setting (for example any version of a `LoadModule` line) so that
///   converging on one variant evicts the others.
#[derive(Debug, Clone)]
pub struct Directive {
    name: String,
    canonical: String,
    matcher: Regex,
    disabled: Option<Regex>,
    anchor: Option<Regex>,
    family: Option<Regex>,
}

impl Directive {
    /// Build a directive from its display name, the pattern recognizing a
    /// satisfying line, and the canonical line to write.
    pub fn new(name: &str, matcher: &str, canonical: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            canonical: canonical.to_string(),
            matcher: compile(matcher)?,
            disabled: None,
            anchor: None,
            family: None,
        })
    }

    /// Recognize a commented-out form of this directive that should be
    /// rewritten in place rather than left behind.
    pub fn with_disabled(mut self, pattern: &str) -> Result<Self> {
        self.disabled = Some(compile(pattern)?);
        Ok(self)
    }

    /// Insert new lines before the first line matching `pattern` instead
    /// of appending at end of file.
    pub fn with_anchor(mut self, pattern: &str) -> Result<Self> {
        self.anchor = Some(compile(pattern)?);
        Ok(self)
    }

    /// Mark this directive as a singleton within the family of lines
    /// matching `pattern`: converging on it removes every other family
    /// member first.
    pub fn with_family(mut self, pattern: &str) -> Result<Self> {
        self.family = Some(compile(pattern)?);
        Ok(self)
    }

    /// Display name used in logs and summaries.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The exact line this directive writes.
    #[must_use]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Whether this directive was declared a singleton via
    /// [`with_family`](Self::with_family).
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.family.is_some()
    }

    /// Whether `line` already satisfies this directive.
    #[must_use]
    pub fn matches(&self, line: &str) -> bool {
        self.matcher.is_match(line)
    }

    /// Whether `line` is a disabled form of this directive.
    #[must_use]
    pub fn matches_disabled(&self, line: &str) -> bool {
        self.disabled.as_ref().is_some_and(|re| re.is_match(line))
    }

    /// Whether `line` belongs to this directive's singleton family.
    /// Falls back to the satisfying pattern when no family is declared.
    #[must_use]
    pub fn matches_family(&self, line: &str) -> bool {
        match &self.family {
            Some(re) => re.is_match(line),
            None => self.matcher.is_match(line),
        }
    }

    /// Index to insert at: before the first anchor match, else `len`.
    #[must_use]
    pub(crate) fn insert_position(&self, lines: &[String]) -> usize {
        if let Some(anchor) = &self.anchor {
            lines
                .iter()
                .position(|l| anchor.is_match(l))
                .unwrap_or(lines.len())
        } else {
            lines.len()
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| Error::BadPattern {
        pattern: pattern.to_string(),
        source,
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matcher_recognizes_satisfying_line() {
        let d = Directive::new(
            "rewrite module",
            r"^LoadModule rewrite_module\b",
            "LoadModule rewrite_module lib/httpd/modules/mod_rewrite.so",
        )
        .unwrap();

        assert!(d.matches("LoadModule rewrite_module lib/httpd/modules/mod_rewrite.so"));
        assert!(!d.matches("#LoadModule rewrite_module lib/httpd/modules/mod_rewrite.so"));
        assert!(!d.matches("LoadModule ssl_module lib/httpd/modules/mod_ssl.so"));
    }

    #[test]
    fn disabled_form_is_distinct_from_matcher() {
        let d = Directive::new(
            "rewrite module",
            r"^LoadModule rewrite_module\b",
            "LoadModule rewrite_module lib/httpd/modules/mod_rewrite.so",
        )
        .unwrap()
        .with_disabled(r"^#\s*LoadModule rewrite_module\b")
        .unwrap();

        assert!(d.matches_disabled("#LoadModule rewrite_module lib/httpd/modules/mod_rewrite.so"));
        assert!(!d.matches_disabled("LoadModule rewrite_module lib/httpd/modules/mod_rewrite.so"));
    }

    #[test]
    fn family_defaults_to_matcher() {
        let d = Directive::new("listen", r"^Listen 8080$", "Listen 8080").unwrap();
        assert!(d.matches_family("Listen 8080"));
        assert!(!d.matches_family("Listen 80"));
    }

    #[test]
    fn bad_pattern_is_reported() {
        let err = Directive::new("broken", r"([", "x").unwrap_err();
        assert!(matches!(err, Error::BadPattern { .. }));
    }

    #[test]
    fn insert_position_honors_anchor() {
        let d = Directive::new("include", r"^Include vhosts\.conf$", "Include vhosts.conf")
            .unwrap()
            .with_anchor(r"^# End of file$")
            .unwrap();

        let lines: Vec<String> = ["Listen 80", "# End of file", "ServerName localhost"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(d.insert_position(&lines), 1);

        let no_anchor: Vec<String> = ["Listen 80"].iter().map(ToString::to_string).collect();
        assert_eq!(d.insert_position(&no_anchor), 1);
    }
}
