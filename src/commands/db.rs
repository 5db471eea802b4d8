//! Database conveniences: ad-hoc SQL, dump, restore.
//!
//! These shell out to the server's own client tools with the frevo
//! credentials file, so they work against whichever formula the
//! settings name without any driver code here.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Local;

use crate::Context as AppContext;
use crate::cli::DbCommand;
use crate::commands::{self, Stack};
use crate::paths;
use crate::progress;
use crate::ui;

pub fn run(ctx: &AppContext, cmd: DbCommand) -> Result<()> {
    match cmd {
        DbCommand::Exec { sql } => exec(ctx, &sql),
        DbCommand::Dump { name, output } => dump(ctx, &name, output.as_deref()),
        DbCommand::Restore { name, input } => restore(ctx, &name, &input),
    }
}

fn exec(ctx: &AppContext, sql: &str) -> Result<()> {
    if ctx.policy.dry_run {
        ui::would(&format!("execute against {}: {sql}", ctx.settings.database.formula));
        return Ok(());
    }
    let stack = Stack::connect(ctx)?;
    stack.database.ensure_credentials(ctx.policy)?;

    let output = stack.database.exec(sql)?;
    if output.is_empty() {
        ui::success("ok");
    } else {
        print!("{output}");
    }
    Ok(())
}

fn dump(ctx: &AppContext, name: &str, output: Option<&str>) -> Result<()> {
    let out = output.map_or_else(|| default_dump_name(name), PathBuf::from);
    if ctx.policy.dry_run {
        ui::would(&format!("dump database {name} to {}", out.display()));
        return Ok(());
    }

    let stack = Stack::connect(ctx)?;
    stack.database.ensure_credentials(ctx.policy)?;

    let pb = progress::spinner(&format!("Dumping {name}..."));
    match stack.database.dump(name, &out) {
        Ok(()) => {
            let size = fs::metadata(&out).map(|m| m.len()).unwrap_or(0);
            progress::finish_success(
                &pb,
                &format!("{name} dumped to {} ({})", out.display(), ui::format_size(size)),
            );
            Ok(())
        }
        Err(err) => {
            progress::finish_error(&pb, &format!("dump of {name} failed"));
            Err(err)
        }
    }
}

fn restore(ctx: &AppContext, name: &str, input: &str) -> Result<()> {
    let input = paths::expand(input);
    if !input.is_file() {
        bail!("no dump file at {}", input.display());
    }
    if ctx.policy.dry_run {
        ui::would(&format!("restore {} into database {name}", input.display()));
        return Ok(());
    }

    let prompt = format!(
        "Restore {} into {name}? Existing tables will be overwritten",
        input.display()
    );
    if !commands::confirm(&prompt, ctx.policy.force)? {
        ui::info("aborted; nothing restored");
        return Ok(());
    }

    let stack = Stack::connect(ctx)?;
    stack.database.ensure_credentials(ctx.policy)?;

    let pb = progress::spinner(&format!("Restoring {name}..."));
    match stack.database.restore(name, &input) {
        Ok(()) => {
            progress::finish_success(&pb, &format!("{name} restored"));
            Ok(())
        }
        Err(err) => {
            progress::finish_error(&pb, &format!("restore of {name} failed"));
            Err(err).with_context(|| format!("failed to restore {}", input.display()))
        }
    }
}

/// Timestamped default so repeated dumps never clobber each other.
fn default_dump_name(name: &str) -> PathBuf {
    PathBuf::from(format!(
        "{name}-{}.sql.gz",
        Local::now().format("%Y%m%d-%H%M%S")
    ))
}

// =============================================================================
// Tests
// =============================================================================
