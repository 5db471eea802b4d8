//! Command implementations.
//!
//! Each module owns one CLI subcommand. They share a [`Stack`] of
//! handles on the managed pieces, print through [`crate::ui`], and
//! propagate errors with context instead of exiting midway.

pub mod db;
pub mod install;
pub mod php;
pub mod services;
pub mod sites;
pub mod uninstall;

use std::io::IsTerminal;

use anyhow::{Context, Result, bail};
use dialoguer::Confirm;

use crate::Context as AppContext;
use crate::config::Policy;
use crate::db::Database;
use crate::dns::Dns;
use crate::httpd::Httpd;
use crate::paths;
use crate::ui;
use confkit::MutationReport;

/// Handles on the managed stack, resolved once per invocation.
///
/// Everything hangs off the Homebrew prefix, so commands connect once
/// and hand the pieces around instead of rediscovering paths.
pub struct Stack {
    pub client: brewops::Client,
    pub httpd: Httpd,
    pub dns: Dns,
    pub database: Database,
}

impl Stack {
    /// Resolve the Homebrew prefix and build a handle for every managed
    /// piece. Fails with install advice when brew itself is missing.
    pub fn connect(ctx: &AppContext) -> Result<Self> {
        let client = match brewops::Client::new() {
            Ok(client) => client,
            Err(brewops::Error::BrewNotFound) => bail!(
                "Homebrew is not installed.\n\n  Install it with:\n    /bin/bash -c \"$(curl -fsSL https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh)\"\n\n  Or visit: https://brew.sh"
            ),
            Err(err) => {
                return Err(err).context("failed to initialize the Homebrew client");
            }
        };
        let prefix = client
            .prefix()
            .context("failed to resolve the Homebrew prefix")?;
        let config_dir = paths::config_dir()?;

        Ok(Self {
            httpd: Httpd::new(&prefix, &paths::vhosts_dir()?, ctx.settings.http_port),
            dns: Dns::new(&prefix, &config_dir, &ctx.settings.tld),
            database: Database::new(&prefix, &config_dir, &ctx.settings.database),
            client,
        })
    }
}

/// Ask the user before a destructive step.
///
/// `--force` answers yes without prompting. A non-interactive session
/// without `--force` is an error rather than a silent yes, so scripts
/// must opt in to deletion explicitly.
pub fn confirm(prompt: &str, force: bool) -> Result<bool> {
    if force {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        bail!("refusing to continue without confirmation; pass --force in non-interactive sessions");
    }
    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read confirmation")?;
    Ok(confirmed)
}

/// Print the outcome of one configuration mutation.
///
/// Unchanged files report as such, dry runs as would-lines, real writes
/// with their backup path. With `-v` the unified diff follows.
pub fn report_mutation(report: &MutationReport, label: &str, policy: Policy) {
    if !report.changed() {
        ui::unchanged(&format!("{label} already up to date"));
        return;
    }
    if policy.dry_run {
        ui::would(&format!("update {label}"));
    } else {
        match &report.backup {
            Some(backup) => ui::success(&format!("{label} updated (backup: {})", backup.display())),
            None => ui::success(&format!("{label} written")),
        }
    }
    if policy.verbose > 0 {
        ui::diff(&report.before, &report.after);
    }
}
