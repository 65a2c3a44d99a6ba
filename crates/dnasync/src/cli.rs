//! Clap derive structures for the `dnasync` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use dnasync_core::Scope;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// dnasync -- sync Cisco DNA Center inventory into NetBox
#[derive(Debug, Parser)]
#[command(
    name = "dnasync",
    version,
    about = "Sync Cisco DNA Center inventory into NetBox",
    long_about = "Reconciles sites and devices from one or more Cisco DNA Center\n\
        controllers into a NetBox instance, one NetBox tenant per controller.\n\n\
        Every record written carries the `cisco-dna-center` tag; records a\n\
        controller no longer reports are purged on the next sync.",
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
    /// Configuration file (defaults to the platform config dir)
    #[arg(long, env = "DNASYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "DNASYNC_OUTPUT",
        default_value = "table",
        global = true
    )]
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

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Write to an empty in-memory destination instead of NetBox
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, env = "DNASYNC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
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
    /// YAML
    Yaml,
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

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Controller and NetBox counts per tenant
    #[command(alias = "st")]
    Status(TenantArg),

    /// List controller sites
    Sites(SitesArgs),

    /// List controller devices
    #[command(alias = "dev")]
    Devices(DevicesArgs),

    /// Sync controller inventory into NetBox
    Sync(SyncArgs),

    /// Delete a dnasync-managed NetBox tenant and everything it owns
    PurgeTenant {
        /// NetBox tenant id (see `dnasync status`)
        id: u64,
    },

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared args ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TenantArg {
    /// Restrict to one controller hostname
    #[arg(long, short = 't')]
    pub tenant: Option<String>,
}

impl TenantArg {
    pub fn scope(&self) -> Scope {
        self.tenant.clone().map_or(Scope::All, Scope::Tenant)
    }
}

// ── Sites / Devices ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SitesArgs {
    #[command(subcommand)]
    pub command: SitesCommand,
}

#[derive(Debug, Subcommand)]
pub enum SitesCommand {
    /// List sites per controller, ordered by hierarchy
    #[command(alias = "ls")]
    List(TenantArg),
}

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List every device per controller, any support level
    #[command(alias = "ls")]
    List(TenantArg),
}

// ── Sync ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SyncArgs {
    #[command(subcommand)]
    pub command: SyncCommand,
}

#[derive(Debug, Subcommand)]
pub enum SyncCommand {
    /// Sync sites and purge the ones a controller no longer reports
    Sites(TenantArg),
    /// Sync supported devices; sites must be synced first
    Devices(TenantArg),
    /// Sites then devices, as a background job
    Full(TenantArg),
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration, secrets redacted
    Show,
    /// Print the configuration file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
