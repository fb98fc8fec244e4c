//! Command-line argument definitions using clap.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Maintain DNS block and allow lists and filter query logs.
///
/// Allow rules are loaded first and followed through CNAMEs; block rules
/// covered by an allow rule are refused. A blocked domain blocks every name
/// beneath it.
#[derive(Parser, Debug)]
#[command(name = "dnsblock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, env = "DNSBLOCK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Primary block list (overrides files.blocked)
    #[arg(long, global = true, value_name = "FILE")]
    pub blocked: Option<PathBuf>,

    /// Additional read-only block list; repeatable
    #[arg(long = "extra-blocked", global = true, value_name = "FILE")]
    pub extra_blocked: Vec<PathBuf>,

    /// Allow list (overrides files.allowed)
    #[arg(long, global = true, value_name = "FILE")]
    pub allowed: Option<PathBuf>,

    /// Do not follow CNAME chains for allow rules
    #[arg(long, global = true)]
    pub no_aliases: bool,

    /// Output format for check and advise
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log format (logs go to stderr)
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Log output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// Single-line compact output
    Compact,
    /// JSON objects, one per line
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rewrite the primary block list with the consolidated rule set
    Simplify,

    /// Block domains, then rewrite the primary block list
    Add(DomainsArgs),

    /// Allow domains (and their CNAME targets), then rewrite the allow list
    Allow(DomainsArgs),

    /// Write BIND zone stanzas for every block rule
    Zone(ZoneArgs),

    /// Block domains, rewrite the block list and write zone stanzas
    Addgen(AddgenArgs),

    /// Write a response-policy-zone master file
    Rpz(RpzArgs),

    /// Print block rules (or allow rules)
    List(ListArgs),

    /// Show the verdict for domains and every name they alias
    Check(DomainsArgs),

    /// Suggest broader block rules for crowded parts of the block list
    Advise(AdviseArgs),

    /// Filter a DNS query log, suppressing blocked queries
    Processlog(ProcesslogArgs),
}

#[derive(Args, Debug)]
pub struct DomainsArgs {
    /// Domain names
    #[arg(required = true)]
    pub domains: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ZoneArgs {
    /// Output file (overrides files.zones)
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AddgenArgs {
    /// Domain names to block
    #[arg(required = true)]
    pub domains: Vec<String>,

    /// Zone stanza output file (overrides files.zones)
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RpzArgs {
    /// Output file (overrides files.rpz)
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Zone origin (overrides zone.rpz_origin)
    #[arg(long)]
    pub origin: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// List allow rules instead of block rules
    #[arg(long)]
    pub allowed: bool,
}

#[derive(Args, Debug)]
pub struct AdviseArgs {
    /// Report nodes with more children than this (overrides advisory.threshold)
    #[arg(long)]
    pub threshold: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ProcesslogArgs {
    /// Query log file, or - for stdin
    pub log: PathBuf,

    /// Lines resolved concurrently (overrides log_filter.concurrency)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Copy lines without an A query to the output
    #[arg(long)]
    pub pass_unmatched: bool,
}
