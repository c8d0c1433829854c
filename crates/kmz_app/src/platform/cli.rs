use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use super::config::DEFAULT_CONFIG_PATH;
use super::logging::LogDestination;

#[derive(Parser)]
#[command(
    name = "kmz_viewer",
    about = "Browse the NetworkLink tree and ground overlays of KMZ archives"
)]
pub struct Cli {
    /// RON configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
    /// Where log output goes (overrides the config file)
    #[arg(long, value_enum)]
    pub log: Option<LogDestination>,
    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load an archive and print its tree, overlays and skipped links
    Inspect {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Click the tree node linking `path` and print the bounds it zooms to
    Zoom { file: PathBuf, path: String },
    /// Interactive tree: type a row number to click it, `q` to quit
    Browse { file: PathBuf },
    /// Run the upload endpoint
    Serve {
        /// Listen address (overrides the config file)
        #[arg(long)]
        bind: Option<String>,
        /// Storage directory (overrides the config file)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
