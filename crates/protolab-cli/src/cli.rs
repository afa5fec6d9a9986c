use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use protolab_harness::GuardPass;
use protolab_merge::DEFAULT_MAX_DEPTH;
use protolab_types::MergeStrategy;

#[derive(Parser)]
#[command(
    name = "protolab",
    about = "Prototype pollution research harness",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the canonical scenario battery
    Battery(BatteryArgs),
    /// List the battery scenarios
    Scenarios,
    /// Run one payload through the full scenario lifecycle
    Merge(MergeArgs),
    /// Start the HTTP server
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct BatteryArgs {
    /// Only run with the guard absent
    #[arg(long, conflicts_with = "guarded_only")]
    pub unguarded_only: bool,
    /// Only run with the guard installed
    #[arg(long)]
    pub guarded_only: bool,
    /// Run every scenario on its own forked ancestor
    #[arg(long)]
    pub scoped: bool,
}

impl BatteryArgs {
    pub fn passes(&self) -> Vec<GuardPass> {
        if self.unguarded_only {
            vec![GuardPass::Unguarded]
        } else if self.guarded_only {
            vec![GuardPass::Guarded]
        } else {
            GuardPass::BOTH.to_vec()
        }
    }
}

#[derive(Args)]
pub struct MergeArgs {
    /// merge, merge-with, defaults-deep, or mixin
    #[arg(short, long)]
    pub strategy: MergeStrategy,
    /// JSON payload
    #[arg(short, long)]
    pub payload: String,
    #[arg(long)]
    pub guard: bool,
    /// Merge into the shared ancestor itself instead of a fresh record
    #[arg(long)]
    pub ancestor_target: bool,
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub guard: bool,
    #[arg(long)]
    pub scoped: bool,
}
