use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// eventtail - serve an append-only JSON lines event log over HTTP
#[derive(Parser, Debug)]
#[command(name = "eventtail")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// TCP port to listen on (default 3003)
    #[arg(value_name = "PORT")]
    pub port: Option<u16>,

    /// Address to bind the HTTP listener to (default 0.0.0.0)
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// HTML viewer served at / and /index.html
    #[arg(long, value_name = "PATH")]
    pub viewer: Option<PathBuf>,

    /// Event log file (default /tmp/agent-events.jsonl)
    #[arg(long, global = true, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// TOML config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print events as they are appended to the log
    Follow(FollowArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct FollowArgs {
    /// Replay the whole log before following (default: start at the end)
    #[arg(long)]
    pub from_start: bool,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: u64,

    /// Only print events whose JSON matches this regex
    #[arg(long, value_name = "REGEX")]
    pub grep: Option<String>,

    /// Case-insensitive --grep
    #[arg(short = 'i', long)]
    pub ignore_case: bool,

    /// Print events that do NOT match --grep
    #[arg(long)]
    pub invert: bool,

    /// Pretty-print each event
    #[arg(long)]
    pub pretty: bool,
}
