//! Switching the PHP version Apache loads.
//!
//! Apache refuses to start with two PHP modules, so the switch rewrites
//! the single `LoadModule php_module` line and lets `httpd -t` judge
//! the result. A rejected configuration never reaches the restart; the
//! previous file is in the backup the error points at.

use anyhow::{Context, Result};

use crate::Context as AppContext;
use crate::commands::{self, Stack, install, services};
use crate::config;
use crate::ui;

pub fn use_version(ctx: &AppContext, version: &str) -> Result<()> {
    config::validate_php_version(version)?;
    let policy = ctx.policy;
    let formula = format!("php@{version}");

    ui::header(&format!("Switching to PHP {version}"));

    let stack = Stack::connect(ctx)?;
    install::install_formula(&stack.client, &formula, policy)?;

    let report = stack
        .httpd
        .switch_php(version, policy)
        .with_context(|| format!("failed to activate PHP {version}"))?;
    commands::report_mutation(&report, "httpd.conf", policy);

    if report.changed() {
        services::restart_one(&stack.client, "httpd", policy)?;
    } else {
        ui::dim("module already loaded; no restart needed");
    }

    if !policy.dry_run && ctx.settings.php_version != version {
        let mut settings = ctx.settings.clone();
        settings.php_version = version.to_string();
        let path = settings.save()?;
        log::debug!("recorded php {version} in {}", path.display());
    }

    println!();
    ui::success(&format!("PHP {version} active"));
    Ok(())
}
