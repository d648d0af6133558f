use clap::{Args, Parser};
use std::path::PathBuf;

use super::commands::Commands;
use super::output::OutputFormat;
use super::runtime::LogFormat;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("PROMPTCAST_GIT_HASH"),
    " ",
    env!("PROMPTCAST_BUILD_DATE"),
    ")"
);

#[derive(Parser)]
#[command(author, version, long_version = LONG_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Enable debug mode
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Log line format
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub log_format: LogFormat,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human", global = true)]
    pub output: OutputFormat,

    /// Print the Prometheus exposition to stderr when the command ends
    #[arg(long, global = true)]
    pub print_metrics: bool,

    #[command(flatten)]
    pub browser: BrowserArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Debug, Default)]
pub struct BrowserArgs {
    /// Override Chrome/Chromium executable path (defaults to PROMPTCAST_CHROME or system path)
    #[arg(long, global = true)]
    pub chrome_path: Option<PathBuf>,

    /// Run Chrome with a visible window instead of headless mode
    #[arg(long, global = true)]
    pub headful: bool,

    /// Attach to an existing Chrome DevTools websocket instead of launching a new instance
    #[arg(long, global = true)]
    pub ws_url: Option<String>,
}
