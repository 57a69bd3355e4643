use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use swap_server::config::DEFAULT_LOG_PATH;

#[derive(Parser)]
#[command(
    name = "swap",
    about = "Section Swap: find students to trade class sections with",
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
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Register a swap request
    Submit(SubmitArgs),
    /// List swap requests, newest first
    List(ListArgs),
    /// Find direct or three-way swaps for a section pair
    Matches(MatchesArgs),
}

/// Location of the local request log.
#[derive(Args, Clone, Debug)]
pub struct StoreArgs {
    #[arg(long, default_value = DEFAULT_LOG_PATH)]
    pub data: PathBuf,
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Override the bind address
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Override the request log path
    #[arg(long, conflicts_with = "memory")]
    pub data: Option<PathBuf>,
    /// Keep requests in memory only
    #[arg(long)]
    pub memory: bool,
}

#[derive(Args)]
pub struct SubmitArgs {
    pub current: String,
    pub desired: String,
    pub contact: String,
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args)]
pub struct MatchesArgs {
    pub current: String,
    pub desired: String,
    #[arg(long)]
    pub contact: Option<String>,
    #[command(flatten)]
    pub store: StoreArgs,
}
