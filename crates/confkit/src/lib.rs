//! Idempotent directive-level patching for shared configuration files.
//!
//! This crate edits line-oriented configuration files (Apache httpd,
//! dnsmasq, resolver stanzas) by converging them on [`Directive`]s
//! rather than templating them wholesale. Files the user may also edit
//! by hand are never regenerated; only the specific lines a directive
//! targets are touched, and everything else survives byte for byte.
//!
//! Edits flow through a [`ScopedMutation`], which snapshots the file to
//! a timestamped backup before the first write, skips the write
//! entirely when the content would not change, and can run an external
//! verification step (such as a syntax check) against the committed
//! file. A rejected verification keeps both the new content and the
//! backup on disk for manual repair.
//!
//! # Example
//!
//! ```no_run
//! use confkit::{Directive, ScopedMutation};
//!
//! # fn main() -> confkit::Result<()> {
//! let listen = Directive::new("listen port", r"^Listen 8080$", "Listen 8080")?
//!     .with_family(r"^Listen \d+$")?;
//!
//! let report = ScopedMutation::new("/opt/homebrew/etc/httpd/httpd.conf".as_ref())
//!     .apply(|doc| {
//!         doc.ensure_singleton(&listen);
//!         Ok(())
//!     })?;
//!
//! if report.changed() {
//!     println!("updated (backup: {:?})", report.backup);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod directive;
pub mod document;
pub mod error;
pub mod mutation;

pub use directive::{Directive, Outcome};
pub use document::Document;
pub use error::{Error, Result};
pub use mutation::{MutationReport, ScopedMutation};
