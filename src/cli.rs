use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "frevo")]
#[command(version)]
#[command(about = "Local web development stack on Homebrew", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Report what would change without touching anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Skip confirmation prompts
    #[arg(short, long, global = true)]
    pub force: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install and configure the whole stack (httpd, PHP, MySQL, dnsmasq, mkcert)
    Install {
        /// PHP line to install and activate (defaults to the configured version)
        #[arg(long, value_name = "VERSION")]
        php: Option<String>,
    },

    /// Switch the active PHP version
    #[command(name = "use", disable_version_flag = true)]
    Use {
        /// PHP version, e.g. 8.4
        version: String,
    },

    /// Show services, sites and configuration at a glance
    Status,

    /// Restart managed services (all, or one by name)
    Restart {
        /// Service to restart, e.g. httpd or mysql
        service: Option<String>,
    },

    /// Stop managed services (all, or one by name)
    Stop {
        /// Service to stop
        service: Option<String>,
    },

    /// Manage sites
    #[command(subcommand)]
    Site(SiteCommand),

    /// Work with the database server
    #[command(subcommand)]
    Db(DbCommand),

    /// Remove frevo's configuration (and optionally the packages)
    Uninstall {
        /// Also uninstall the Homebrew packages and delete certificates
        #[arg(long)]
        purge: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Commands {
    /// Whether this command may mutate configuration or services, and
    /// therefore must hold the process lock.
    pub fn mutates(&self) -> bool {
        match self {
            Commands::Install { .. }
            | Commands::Use { .. }
            | Commands::Restart { .. }
            | Commands::Stop { .. }
            | Commands::Uninstall { .. } => true,
            Commands::Site(cmd) => !matches!(cmd, SiteCommand::Ls),
            Commands::Status | Commands::Db(_) | Commands::Completions { .. } => false,
        }
    }
}

// ============================================================================
// Site Commands
// ============================================================================

#[derive(Subcommand)]
pub enum SiteCommand {
    /// Register a site and issue its certificate
    Add {
        /// Site name; the TLD is appended when missing (demo -> demo.test)
        name: String,

        /// Document root (defaults to <sites dir>/<name>)
        #[arg(short, long)]
        root: Option<String>,
    },

    /// Remove a site
    Rm {
        /// Site name, with or without the TLD
        name: String,
    },

    /// List registered sites
    Ls,
}

// ============================================================================
// Db Commands
// ============================================================================

#[derive(Subcommand)]
pub enum DbCommand {
    /// Run a SQL statement and print the result
    Exec {
        /// Statement to execute
        sql: String,
    },

    /// Dump a database to a gzipped SQL file
    Dump {
        /// Database name
        name: String,

        /// Output file (defaults to <name>-<timestamp>.sql.gz)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Restore a database from a dump (.sql or .sql.gz)
    Restore {
        /// Database name
        name: String,

        /// Dump file to read
        input: String,
    },
}
