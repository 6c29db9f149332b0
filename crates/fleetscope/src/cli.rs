//! Clap derive structures for the `fleetscope` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use fleetscope_core::DatastoreType;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fleetscope -- discovery, ownership and connection services for a datastore fleet
#[derive(Debug, Parser)]
#[command(
    name = "fleetscope",
    version,
    about = "Discover datastore clusters and track who may explore them",
    long_about = "Runs the discovery, cluster access-control and user-group services\n\
        behind a multi-region Cassandra/Redis fleet explorer, and inspects\n\
        their inputs from the command line.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "FLEETSCOPE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start every service and log topology and ownership changes until Ctrl-C
    Run,

    /// Discover clusters once and list them
    #[command(alias = "ls")]
    Clusters(ClustersArgs),

    /// Fetch the cluster ownership map once and list it
    Owners,

    /// Check a cluster discovery document against the schema
    Validate(ValidateArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ClustersArgs {
    /// Only list clusters of this datastore type
    #[arg(long = "type", short = 't')]
    pub datastore_type: Option<DatastoreType>,

    /// Seconds to wait for the first cluster list
    #[arg(long, default_value = "10")]
    pub wait: u64,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// JSON document holding an array of cluster definitions
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration (file + environment)
    Show,
    /// Print the config file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: Shell,
}
