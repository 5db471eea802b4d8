//! One-shot provisioning of the whole stack.
//!
//! Brings the machine from bare Homebrew to serving `https://*.test`:
//! packages, trust store, wildcard certificate, httpd and dnsmasq
//! configuration, database credentials, and finally the services
//! themselves. Every step is idempotent, so rerunning after a partial
//! failure only does what is still missing.

use std::fs;

use anyhow::{Context, Result};

use crate::Context as AppContext;
use crate::commands::{self, Stack, services};
use crate::config::{self, Policy};
use crate::paths;
use crate::progress;
use crate::ui;
use certkit::Provisioner;

/// Converge the whole stack. An explicit `php` overrides the configured
/// version and is recorded in the settings once the config accepts it.
pub fn run(ctx: &AppContext, php: Option<&str>) -> Result<()> {
    let policy = ctx.policy;
    let php_version = match php {
        Some(version) => {
            config::validate_php_version(version)?;
            version.to_string()
        }
        None => ctx.settings.php_version.clone(),
    };

    ui::banner();
    ui::header("Setting up the frevo stack");
    if policy.dry_run {
        ui::dim("dry run: nothing will be changed");
    }

    let stack = Stack::connect(ctx)?;

    ui::section("Packages");
    for formula in package_set(ctx, &php_version) {
        install_formula(&stack.client, &formula, policy)?;
    }

    ui::section("Directories");
    let sites_root = ctx.settings.sites_root()?;
    let vhosts_dir = paths::vhosts_dir()?;
    let certs_dir = paths::certs_dir()?;
    for dir in [&sites_root, &vhosts_dir, &certs_dir] {
        if dir.exists() {
            ui::unchanged(&format!("{} exists", dir.display()));
        } else if policy.dry_run {
            ui::would(&format!("create {}", dir.display()));
        } else {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            ui::success(&format!("created {}", dir.display()));
        }
    }

    ui::section("Certificates");
    let wildcard = ctx.settings.wildcard_subject();
    if policy.dry_run {
        ui::would("install the mkcert local CA");
        ui::would(&format!("issue a wildcard certificate for {wildcard}"));
    } else {
        let provisioner = Provisioner::new(&certs_dir)?;
        provisioner
            .install_ca()
            .context("failed to install the local CA")?;
        ui::success("local CA trusted");
        let provisioned = provisioner.ensure(&wildcard)?;
        if provisioned.created() {
            ui::success(&format!("certificate issued for {wildcard}"));
        } else {
            ui::unchanged(&format!("certificate for {wildcard} already present"));
        }
    }

    ui::section("Apache");
    let report = stack
        .httpd
        .ensure_base(&php_version, policy)
        .context("failed to configure httpd")?;
    commands::report_mutation(&report, "httpd.conf", policy);
    if !policy.dry_run && ctx.settings.php_version != php_version {
        let mut settings = ctx.settings.clone();
        settings.php_version = php_version.clone();
        let path = settings.save()?;
        log::debug!("recorded php {php_version} in {}", path.display());
    }

    ui::section("Database");
    if stack.database.ensure_credentials(policy)? {
        if policy.dry_run {
            ui::would("write client credentials");
        } else {
            ui::success(&format!(
                "credentials written to {}",
                stack.database.credentials_path().display()
            ));
        }
    } else {
        ui::unchanged("client credentials already up to date");
    }

    ui::section("DNS");
    let fragment = stack.dns.ensure_address(policy)?;
    commands::report_mutation(&fragment, "dnsmasq address mapping", policy);
    let hook = stack.dns.ensure_conf_file(policy)?;
    commands::report_mutation(&hook, "dnsmasq.conf include", policy);
    let resolver = stack.dns.ensure_resolver(policy)?;
    commands::report_mutation(&resolver, &format!("resolver for .{}", ctx.settings.tld), policy);

    ui::section("Services");
    for name in services::managed(ctx) {
        services::restart_one(&stack.client, &name, policy)?;
    }

    println!();
    if policy.dry_run {
        ui::info("dry run complete; run again without --dry-run to apply");
    } else {
        ui::success(&format!(
            "ready; park a site under {} and open https://<name>.{}",
            sites_root.display(),
            ctx.settings.tld
        ));
    }
    Ok(())
}

/// Formulas the stack needs, in install order. `nss` is there so mkcert
/// can reach Firefox's trust store.
fn package_set(ctx: &AppContext, php_version: &str) -> Vec<String> {
    vec![
        "httpd".to_string(),
        format!("php@{php_version}"),
        ctx.settings.database.formula.clone(),
        "dnsmasq".to_string(),
        "mkcert".to_string(),
        "nss".to_string(),
    ]
}

/// Install one formula behind a spinner, skipping what is present.
pub fn install_formula(client: &brewops::Client, formula: &str, policy: Policy) -> Result<()> {
    if client.is_installed(formula)? {
        ui::unchanged(&format!("{formula} already installed"));
        return Ok(());
    }
    if policy.dry_run {
        ui::would(&format!("install {formula}"));
        return Ok(());
    }
    let pb = progress::spinner(&format!("Installing {formula}..."));
    match client.install(formula) {
        Ok(()) => {
            progress::finish_success(&pb, &format!("{formula} installed"));
            Ok(())
        }
        // Races with a concurrent brew are fine; installed is installed.
        Err(err) if err.is_ignorable() => {
            progress::finish_success(&pb, &format!("{formula} already installed"));
            Ok(())
        }
        Err(err) => {
            progress::finish_error(&pb, &format!("{formula} failed"));
            ui::dim(err.category().advice());
            Err(err).with_context(|| format!("failed to install {formula}"))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
