use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

#[derive(Parser, Debug)]
#[command(name = "tracker_app")]
#[command(author, version, about = "Start a media job and follow its progress", long_about = None)]
pub struct Args {
    /// Source URL of the video or playlist
    pub url: String,

    /// Treat the URL as a playlist
    #[arg(short, long)]
    pub playlist: bool,

    /// Requested quality (default: best)
    #[arg(short, long)]
    pub quality: Option<String>,

    /// Keep the result as a temporary file instead of saving it to the library
    #[arg(long)]
    pub temp_only: bool,

    /// Base URL of the job runner's REST api
    #[arg(long)]
    pub api: Option<String>,

    /// WebSocket URL of the push channel
    #[arg(long)]
    pub push: Option<String>,

    /// RON config file; command-line flags take precedence
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Poll interval in milliseconds
    #[arg(long)]
    pub poll_ms: Option<u64>,

    /// Give up after this many seconds without a terminal status
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Where log output goes
    #[arg(long, value_enum, default_value = "terminal")]
    pub log: LogTarget,

    /// Log debug detail, including dropped stale updates
    #[arg(short, long)]
    pub verbose: bool,
}
