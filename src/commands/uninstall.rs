//! Tearing the stack back down.
//!
//! The default run stops the services and takes frevo's lines back out
//! of the configuration files it edited, leaving the packages and the
//! user's data alone. `--purge` additionally drops the packages, the
//! local CA, and the frevo config and state directories. Steps that
//! fail because something is already gone report and carry on, so a
//! half-uninstalled machine can be swept clean by running again.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::Result;

use crate::Context as AppContext;
use crate::commands::{self, Stack, services};
use crate::config::Policy;
use crate::paths;
use crate::progress;
use crate::ui;
use certkit::Provisioner;

pub fn run(ctx: &AppContext, purge: bool) -> Result<()> {
    let policy = ctx.policy;

    ui::header("Uninstalling frevo");

    if !policy.dry_run {
        let prompt = if purge {
            "Stop services, revert configuration, and remove packages and all frevo data?"
        } else {
            "Stop services and revert frevo's configuration changes?"
        };
        if !commands::confirm(prompt, policy.force)? {
            ui::info("aborted; nothing touched");
            return Ok(());
        }
    }

    let stack = Stack::connect(ctx)?;

    ui::section("Services");
    for name in services::managed(ctx) {
        if let Err(err) = services::stop_one(&stack.client, &name, policy) {
            ui::warn(&format!("could not stop {name}: {err:#}"));
        }
    }

    ui::section("Apache");
    match stack.httpd.retract(policy) {
        Ok(report) => commands::report_mutation(&report, "httpd.conf", policy),
        Err(err) => ui::warn(&format!("could not revert httpd.conf: {err:#}")),
    }

    ui::section("DNS");
    match stack.dns.remove_conf_file(policy) {
        Ok(report) => commands::report_mutation(&report, "dnsmasq.conf include", policy),
        Err(err) => ui::warn(&format!("could not revert dnsmasq.conf: {err:#}")),
    }
    remove_file_step(&stack.dns.fragment_path(), policy, None);
    let resolver = stack.dns.resolver_path();
    remove_file_step(
        &resolver,
        policy,
        Some(&format!("sudo rm {}", resolver.display())),
    );

    if purge {
        ui::section("Packages");
        if policy.dry_run {
            ui::would("remove the mkcert local CA");
        } else {
            let provisioner = Provisioner::new(&paths::certs_dir()?);
            match provisioner.and_then(|p| p.uninstall_ca()) {
                Ok(()) => ui::success("local CA removed"),
                Err(err) => ui::warn(&format!("could not remove the local CA: {err}")),
            }
        }
        let php_formula = ctx.settings.php_formula();
        for formula in [
            "httpd",
            php_formula.as_str(),
            ctx.settings.database.formula.as_str(),
            "dnsmasq",
            "mkcert",
            "nss",
        ] {
            uninstall_formula(&stack.client, formula, policy);
        }

        ui::section("Data");
        for dir in [paths::config_dir()?, paths::state_dir()?] {
            if !dir.exists() {
                continue;
            }
            if policy.dry_run {
                ui::would(&format!("delete {}", dir.display()));
            } else {
                match fs::remove_dir_all(&dir) {
                    Ok(()) => ui::success(&format!("deleted {}", dir.display())),
                    Err(err) => ui::warn(&format!("could not delete {}: {err}", dir.display())),
                }
            }
        }
    }

    println!();
    if policy.dry_run {
        ui::info("dry run complete; run again without --dry-run to apply");
    } else if purge {
        ui::success("frevo is gone");
    } else {
        ui::success("stack stopped and configuration reverted");
        ui::dim("packages and site files are still in place (use --purge to remove everything)");
    }
    Ok(())
}

/// Delete one file we own, tolerating absence. A permission error
/// reports the manual command instead of failing the whole uninstall.
fn remove_file_step(path: &Path, policy: Policy, sudo_hint: Option<&str>) {
    if !path.exists() {
        ui::unchanged(&format!("{} already absent", path.display()));
        return;
    }
    if policy.dry_run {
        ui::would(&format!("delete {}", path.display()));
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => ui::success(&format!("deleted {}", path.display())),
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            match sudo_hint {
                Some(hint) => ui::warn(&format!(
                    "no permission to delete {}; remove it manually with: {hint}",
                    path.display()
                )),
                None => ui::warn(&format!("no permission to delete {}", path.display())),
            }
        }
        Err(err) => ui::warn(&format!("could not delete {}: {err}", path.display())),
    }
}

fn uninstall_formula(client: &brewops::Client, formula: &str, policy: Policy) {
    match client.is_installed(formula) {
        Ok(false) => {
            ui::unchanged(&format!("{formula} not installed"));
            return;
        }
        Ok(true) => {}
        Err(err) => {
            ui::warn(&format!("could not check {formula}: {err}"));
            return;
        }
    }
    if policy.dry_run {
        ui::would(&format!("uninstall {formula}"));
        return;
    }
    let pb = progress::spinner(&format!("Uninstalling {formula}..."));
    match client.uninstall(formula) {
        Ok(()) => progress::finish_success(&pb, &format!("{formula} removed")),
        Err(err) => progress::finish_error(&pb, &format!("{formula}: {err}")),
    }
}
