//! External process invocation.
//!
//! Everything frevo shells out to (httpd, mysql, mysqldump) lives at an
//! absolute path under the Homebrew prefix, so commands are taken as
//! paths rather than PATH lookups. Failures carry the program name and
//! the trimmed stderr, never a raw exit code.

use std::ffi::OsStr;
use std::process::Command;

use anyhow::{Context, Result, bail};

/// Run a command and capture its trimmed stdout. A non-zero exit is an
/// error carrying whatever the program wrote to stderr.
pub fn run_capture(cmd: impl AsRef<OsStr>, args: &[&str]) -> Result<String> {
    let cmd = cmd.as_ref();
    let shown = cmd.to_string_lossy();
    log::debug!("capturing: {} {}", shown, args.join(" "));
    let output = Command::new(cmd)
        .args(args)
        .output()
        .with_context(|| format!("Failed to execute: {} {}", shown, args.join(" ")))?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = stderr.trim();
    if detail.is_empty() {
        bail!("{shown} failed with {}", output.status);
    }
    bail!("{shown} failed: {detail}")
}
