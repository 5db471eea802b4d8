//! Service lifecycle: status overview, restart, stop.

use anyhow::{Context, Result};
use colored::Colorize;

use crate::Context as AppContext;
use crate::commands::Stack;
use crate::config::{Policy, Settings};
use crate::paths;
use crate::progress;
use crate::store::VhostStore;
use crate::ui;
use brewops::ServiceStatus;
use certkit::Provisioner;

/// The services frevo manages, in the order install brings them up.
pub fn managed(ctx: &AppContext) -> Vec<String> {
    vec![
        "httpd".to_string(),
        "dnsmasq".to_string(),
        ctx.settings.database.formula.clone(),
    ]
}

// =============================================================================
// Status
// =============================================================================

pub fn status(ctx: &AppContext) -> Result<()> {
    let stack = Stack::connect(ctx)?;

    ui::header("frevo status");

    ui::section("Services");
    for name in managed(ctx) {
        let resolved = stack.client.resolve_service(&name)?;
        let status = stack.client.service_status(&name)?;
        println!("  {}", status_line(&resolved, status));
    }

    ui::section("Web server");
    match stack.httpd.active_php()? {
        Some(version) => ui::kv("php", &version),
        None => ui::kv("php", "not configured"),
    }
    ui::kv("http port", &ctx.settings.http_port.to_string());
    ui::kv("https port", &ctx.settings.https_port.to_string());
    if stack.httpd.conf_path().exists() {
        match stack.httpd.self_test() {
            Ok(()) => ui::kv("config check", "passed"),
            Err(err) => {
                ui::kv("config check", "failed");
                ui::dim(&format!("{err:#}"));
            }
        }
        // A dry-run converge shows whether any managed directive drifted.
        let audit = Policy {
            dry_run: true,
            ..ctx.policy
        };
        match stack.httpd.ensure_base(&ctx.settings.php_version, audit) {
            Ok(report) if report.changed() => {
                ui::kv("directives", "drifted");
                ui::dim("run `frevo install` to converge httpd.conf");
            }
            Ok(_) => ui::kv("directives", "converged"),
            Err(err) => ui::dim(&format!("directive audit unavailable: {err:#}")),
        }
    }

    ui::section("Sites");
    let store = VhostStore::new(paths::vhosts_dir()?);
    let sites = store.list()?;
    if sites.is_empty() {
        ui::dim("none yet; add one with `frevo site add <name>`");
    } else {
        for site in &sites {
            println!(
                "  {}  {}",
                site.domain.cyan(),
                site.root.display().to_string().dimmed()
            );
        }
    }

    ui::section("Certificates");
    match Provisioner::new(&paths::certs_dir()?) {
        Ok(provisioner) => {
            let pairs = provisioner.list()?;
            if pairs.is_empty() {
                ui::dim("none issued");
            } else {
                for pair in &pairs {
                    println!("  {}", pair.subject);
                }
            }
        }
        Err(err) => ui::dim(&format!("unavailable: {err}")),
    }

    ui::section("Settings");
    ui::kv("tld", &ctx.settings.tld);
    ui::kv("database", &ctx.settings.database.formula);
    ui::kv("config", &Settings::path()?.display().to_string());

    println!();
    Ok(())
}

fn status_line(name: &str, status: ServiceStatus) -> String {
    let label = match status {
        ServiceStatus::Running => "running".green(),
        ServiceStatus::Stopped => "stopped".yellow(),
        ServiceStatus::NotInstalled => "not installed".dimmed(),
    };
    format!("{name:<16} {label}")
}

// =============================================================================
// Restart / stop
// =============================================================================

pub fn restart(ctx: &AppContext, service: Option<&str>) -> Result<()> {
    let stack = Stack::connect(ctx)?;
    for name in targets(ctx, service) {
        restart_one(&stack.client, &name, ctx.policy)?;
    }
    Ok(())
}

pub fn stop(ctx: &AppContext, service: Option<&str>) -> Result<()> {
    let stack = Stack::connect(ctx)?;
    for name in targets(ctx, service) {
        stop_one(&stack.client, &name, ctx.policy)?;
    }
    Ok(())
}

fn targets(ctx: &AppContext, service: Option<&str>) -> Vec<String> {
    match service {
        Some(name) => vec![name.to_string()],
        None => managed(ctx),
    }
}

/// Restart one service behind a spinner. The alias is resolved first so
/// the name shown is the formula actually acted on.
pub fn restart_one(client: &brewops::Client, name: &str, policy: Policy) -> Result<()> {
    if policy.dry_run {
        ui::would(&format!("restart {name}"));
        return Ok(());
    }
    let resolved = client.resolve_service(name)?;
    let pb = progress::spinner(&format!("Restarting {resolved}..."));
    match client.restart_service(&resolved) {
        Ok(()) => {
            progress::finish_success(&pb, &format!("{resolved} running"));
            Ok(())
        }
        Err(err) => {
            progress::finish_error(&pb, &format!("{resolved} did not come back"));
            Err(err).with_context(|| format!("failed to restart {resolved}"))
        }
    }
}

/// Stop one service. Stopping something not running, or not even
/// installed, reports as unchanged rather than failing.
pub fn stop_one(client: &brewops::Client, name: &str, policy: Policy) -> Result<()> {
    if policy.dry_run {
        ui::would(&format!("stop {name}"));
        return Ok(());
    }
    let resolved = client.resolve_service(name)?;
    if client.stop_service(&resolved)? {
        ui::success(&format!("{resolved} stopped"));
    } else {
        ui::unchanged(&format!("{resolved} was not running"));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
