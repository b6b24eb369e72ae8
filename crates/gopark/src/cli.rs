//! Clap derive structures for the `gopark` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// Gate, zone and ticket operations against a GoPark server.
#[derive(Debug, Parser)]
#[command(
    name = "gopark",
    version,
    about = "Operate GoPark parking gates from the command line",
    long_about = "Browse gates and zones, check cars in and out, and follow live\n\
        zone and admin updates from a GoPark server.",
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
    /// REST API base URL (overrides config)
    #[arg(long, env = "GOPARK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Live feed WebSocket URL (overrides config)
    #[arg(long, env = "GOPARK_WS_URL", global = true)]
    pub ws_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "GOPARK_OUTPUT",
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

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, env = "GOPARK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the session in the system keyring
    Login(LoginArgs),

    /// Forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// List gates
    Gates,

    /// List zones at a gate
    #[command(alias = "z")]
    Zones(GateArgs),

    /// Check a visitor or subscriber in
    #[command(alias = "in")]
    Checkin(CheckinArgs),

    /// Check a ticket out and show the bill
    #[command(alias = "out")]
    Checkout(CheckoutArgs),

    /// Admin parking-state report
    Report,

    /// Open or close a zone for new check-ins (admin)
    ZoneOpen(ZoneOpenArgs),

    /// Follow live zone updates for a gate
    Watch(GateArgs),

    /// Follow the live admin audit log
    Audit(AuditArgs),

    /// Check whether the live feed endpoint accepts connections
    Ping(PingArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Command arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Username (prompted when omitted)
    #[arg(long, short = 'u')]
    pub username: Option<String>,

    /// Password (prompted when omitted)
    #[arg(long, env = "GOPARK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Debug, Args)]
pub struct GateArgs {
    /// Gate id (defaults to `default_gate` from config)
    #[arg(long, short = 'g')]
    pub gate: Option<String>,
}

#[derive(Debug, Args)]
pub struct CheckinArgs {
    /// Gate id (defaults to `default_gate` from config)
    #[arg(long, short = 'g')]
    pub gate: Option<String>,

    /// Zone to park in
    #[arg(long, short = 'z')]
    pub zone: String,

    /// Subscription id; checks in as a subscriber instead of a visitor
    #[arg(long, short = 's')]
    pub subscription: Option<String>,
}

#[derive(Debug, Args)]
pub struct CheckoutArgs {
    /// Ticket id
    pub ticket: String,

    /// Bill a subscriber ticket as a visitor
    #[arg(long)]
    pub force_visitor: bool,
}

#[derive(Debug, Args)]
pub struct ZoneOpenArgs {
    /// Zone id
    pub zone: String,

    /// New state
    #[arg(value_enum)]
    pub state: Toggle,
}

#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Also subscribe to a gate's zone updates on the shared connection
    #[arg(long, short = 'g')]
    pub gate: Option<String>,
}

#[derive(Debug, Args)]
pub struct PingArgs {
    /// Give up after this many seconds
    #[arg(long, default_value = "5")]
    pub timeout_secs: u64,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a config file interactively
    Init,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}
