//! Site registry commands: add, remove, list.
//!
//! A site is one vhost file under the frevo config directory plus a
//! document root and a certificate that covers the domain. The vhost
//! file is the single source of truth; `ls` and `status` only ever read
//! the files back.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use colored::Colorize;

use crate::Context as AppContext;
use crate::commands::{self, Stack, services};
use crate::paths;
use crate::store::VhostStore;
use crate::ui;
use crate::vhost::{self, VHostEntry};
use certkit::{CertificatePair, Provisioner, wildcard_covers};

// =============================================================================
// Add
// =============================================================================

pub fn add(ctx: &AppContext, name: &str, root: Option<&str>) -> Result<()> {
    let policy = ctx.policy;
    let domain = ctx.settings.qualify(name);
    vhost::validate_domain(&domain)?;

    let store = VhostStore::new(paths::vhosts_dir()?);
    if store.exists(&domain) {
        bail!("site {domain} already exists; remove it first with `frevo site rm {name}`");
    }

    ui::header(&format!("Adding {domain}"));

    let stack = Stack::connect(ctx)?;
    let root_dir = site_root(ctx, &domain, root)?;

    if root_dir.is_dir() {
        ui::unchanged(&format!("document root {} exists", root_dir.display()));
    } else if policy.dry_run {
        ui::would(&format!("create document root {}", root_dir.display()));
    } else {
        fs::create_dir_all(&root_dir)
            .with_context(|| format!("failed to create {}", root_dir.display()))?;
        ui::success(&format!("created document root {}", root_dir.display()));
    }

    let certs_dir = paths::certs_dir()?;
    let subject = certificate_for(ctx, &domain, &certs_dir)?;

    let entry = VHostEntry {
        domain: domain.clone(),
        root: root_dir.clone(),
        http_port: ctx.settings.http_port,
        https_port: ctx.settings.https_port,
        cert: subject,
    };
    let content = entry.render(&certs_dir);
    if policy.dry_run {
        ui::would(&format!("write {}", store.path_for(&domain).display()));
        if policy.verbose > 0 {
            ui::diff("", &content);
        }
    } else {
        store.write(&entry, &content)?;
        ui::success(&format!("wrote {}", store.path_for(&domain).display()));
    }

    services::restart_one(&stack.client, "httpd", policy)?;

    if policy.dry_run {
        println!();
        ui::success("dry run complete; run again without --dry-run to apply");
        return Ok(());
    }

    // Read our own write back; a site that does not list is not a site.
    if !store.list()?.iter().any(|e| e.domain == domain) {
        bail!(
            "site {domain} was written but does not read back from {}",
            store.dir().display()
        );
    }

    println!();
    match probe(&domain, ctx.settings.http_port) {
        Ok(()) => {
            ui::success(&format!("{domain} is live"));
            ui::dim(&format!("https://{domain} serving {}", root_dir.display()));
        }
        Err(err) => {
            ui::warn(&format!("{domain} is registered but {err:#}"));
            ui::dim("resolver caches can lag; give it a few seconds and retry");
        }
    }
    Ok(())
}

/// One bounded GET against the fresh vhost.
///
/// Any HTTP status counts as reachable: an empty document root answers
/// 403 or 404 long before it ever answers 200. Only a transport failure
/// means the server or the resolver is not there yet.
fn probe(domain: &str, port: u16) -> Result<()> {
    let url = format!("http://{domain}:{port}/");
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(5)))
        .build()
        .into();
    match agent.get(&url).call() {
        Ok(_) | Err(ureq::Error::StatusCode(_)) => Ok(()),
        Err(err) => Err(err).with_context(|| format!("not answering at {url}")),
    }
}

/// Pick the certificate subject for a new site.
///
/// An existing wildcard that covers the domain is reused; otherwise a
/// per-domain pair is issued. The dry-run path decides from what is on
/// disk without invoking mkcert.
fn certificate_for(ctx: &AppContext, domain: &str, certs_dir: &std::path::Path) -> Result<String> {
    let wildcard = ctx.settings.wildcard_subject();

    if ctx.policy.dry_run {
        let pair = CertificatePair::for_subject(certs_dir, &wildcard);
        if pair.exists() && wildcard_covers(&wildcard, domain) {
            ui::unchanged(&format!("certificate {wildcard} covers {domain}"));
            return Ok(wildcard);
        }
        ui::would(&format!("issue a certificate for {domain}"));
        return Ok(domain.to_string());
    }

    let provisioner = Provisioner::new(certs_dir)?;
    let provisioned = provisioner
        .ensure(domain)
        .with_context(|| format!("failed to provision a certificate for {domain}"))?;
    let subject = provisioned.pair().subject.clone();
    if provisioned.created() {
        ui::success(&format!("certificate issued for {subject}"));
    } else {
        ui::unchanged(&format!("certificate {subject} covers {domain}"));
    }
    Ok(subject)
}

/// Resolve the document root: an explicit `--root` wins, otherwise the
/// site gets a directory named after it under the sites root.
fn site_root(ctx: &AppContext, domain: &str, root: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = root {
        return Ok(paths::expand(dir));
    }
    let suffix = format!(".{}", ctx.settings.tld);
    let short = domain.strip_suffix(&suffix).unwrap_or(domain);
    Ok(ctx.settings.sites_root()?.join(short))
}

// =============================================================================
// Remove
// =============================================================================

pub fn rm(ctx: &AppContext, name: &str) -> Result<()> {
    let policy = ctx.policy;
    let domain = ctx.settings.qualify(name);

    let store = VhostStore::new(paths::vhosts_dir()?);
    if !store.exists(&domain) {
        bail!("no site named {domain}");
    }
    // A file without a frevo marker is somebody else's; never delete it.
    let entry = store
        .read(&domain)
        .with_context(|| format!("{domain} does not look frevo-managed; remove it by hand"))?;
    let path = store.path_for(&domain);

    if policy.dry_run {
        ui::would(&format!("remove {}", path.display()));
        ui::would("restart httpd");
        return Ok(());
    }

    let prompt = format!("Remove site {domain} (serving {})?", entry.root.display());
    if !commands::confirm(&prompt, policy.force)? {
        ui::info("aborted; nothing removed");
        return Ok(());
    }

    // The document root and any certificate stay; only the vhost goes.
    store.remove(&domain)?;
    ui::success(&format!("removed {}", path.display()));

    let stack = Stack::connect(ctx)?;
    services::restart_one(&stack.client, "httpd", policy)?;
    Ok(())
}

// =============================================================================
// List
// =============================================================================

pub fn ls(ctx: &AppContext) -> Result<()> {
    let store = VhostStore::new(paths::vhosts_dir()?);
    let sites = store.list()?;
    if sites.is_empty() {
        ui::dim("no sites yet; add one with `frevo site add <name>`");
        return Ok(());
    }

    for site in &sites {
        let cert = if site.uses_wildcard_cert() {
            format!("({})", site.cert).dimmed()
        } else {
            format!("({})", site.cert).normal()
        };
        println!(
            "  {:<28} {}  {}",
            site.domain.cyan().bold(),
            site.root.display(),
            cert
        );
    }
    println!();
    ui::dim(&format!("{} site(s)", sites.len()));
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Context;
    use crate::config::{Policy, Settings};

    fn ctx_with_sites_dir(dir: &str) -> Context {
        let mut settings = Settings::default();
        settings.sites_dir = Some(dir.to_string());
        Context {
            settings,
            policy: Policy::default(),
        }
    }

    #[test]
    fn default_root_is_named_after_the_site() {
        let ctx = ctx_with_sites_dir("/srv/www");
        let root = site_root(&ctx, "blog.test", None).unwrap();
        assert_eq!(root, PathBuf::from("/srv/www/blog"));
    }

    #[test]
    fn explicit_root_wins() {
        let ctx = ctx_with_sites_dir("/srv/www");
        let root = site_root(&ctx, "blog.test", Some("/tmp/elsewhere")).unwrap();
        assert_eq!(root, PathBuf::from("/tmp/elsewhere"));
    }

    #[test]
    fn foreign_tld_domain_keeps_its_full_name() {
        let ctx = ctx_with_sites_dir("/srv/www");
        // qualify() appends .test, so the suffix never strips here.
        let root = site_root(&ctx, "blog.localdev.test", None).unwrap();
        assert_eq!(root, PathBuf::from("/srv/www/blog.localdev"));
    }
}
