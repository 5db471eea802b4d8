mod cli;
mod commands;
mod config;
mod db;
mod dns;
mod httpd;
mod lock;
mod paths;
mod progress;
mod runner;
mod store;
mod ui;
mod vhost;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands, SiteCommand};
use config::{Policy, Settings};
use std::io;

/// Global context for the application
pub struct Context {
    pub settings: Settings,
    pub policy: Policy,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let settings = Settings::load()?;
    let policy = Policy {
        dry_run: cli.dry_run,
        force: cli.force,
        verbose: cli.verbose,
    };

    // One mutating frevo at a time per user. Read-only commands skip the
    // lock, and a dry run counts as read-only.
    let mut lock = lock::open(&paths::state_dir()?)?;
    let _guard = lock::acquire(&mut lock, cli.command.mutates() && !policy.dry_run)?;

    let ctx = Context { settings, policy };

    match cli.command {
        Commands::Install { php } => commands::install::run(&ctx, php.as_deref()),
        Commands::Use { version } => commands::php::use_version(&ctx, &version),
        Commands::Status => commands::services::status(&ctx),
        Commands::Restart { service } => commands::services::restart(&ctx, service.as_deref()),
        Commands::Stop { service } => commands::services::stop(&ctx, service.as_deref()),
        Commands::Site(cmd) => match cmd {
            SiteCommand::Add { name, root } => commands::sites::add(&ctx, &name, root.as_deref()),
            SiteCommand::Rm { name } => commands::sites::rm(&ctx, &name),
            SiteCommand::Ls => commands::sites::ls(&ctx),
        },
        Commands::Db(cmd) => commands::db::run(&ctx, cmd),
        Commands::Uninstall { purge } => commands::uninstall::run(&ctx, purge),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "frevo", &mut io::stdout());
            Ok(())
        }
    }
}
