//! CLI for the YTD media fetcher.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use ytd_core::config;
use ytd_core::MediaKind;

use commands::{run_check_proxy, run_fetch};

/// Top-level CLI for the YTD media fetcher.
#[derive(Debug, Parser)]
#[command(name = "ytd")]
#[command(about = "YTD: fetch the best video or audio stream of a media page", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Options shared by `video` and `audio`.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Targets to fetch (page or direct media URLs).
    #[arg(required = true, value_name = "TARGET")]
    pub targets: Vec<String>,

    /// Destination directory (default: config `download_dir`, else the current directory).
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// HTTP proxy, e.g. http://127.0.0.1:8881 (default: config `proxy`).
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Print one JSON object per notification instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download the best combined audio+video stream of each target.
    Video(FetchArgs),

    /// Download the best audio-only stream of each target.
    Audio(FetchArgs),

    /// Check whether a proxy string is well formed.
    CheckProxy {
        /// Proxy to check, e.g. http://host:port.
        proxy: String,
    },
}

impl CliCommand {
    /// Returns Ok(false) when the command ran but something it did failed.
    pub fn run_from_args() -> Result<bool> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Video(args) => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_fetch(&cfg, MediaKind::Video, &args)
            }
            CliCommand::Audio(args) => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_fetch(&cfg, MediaKind::Audio, &args)
            }
            CliCommand::CheckProxy { proxy } => Ok(run_check_proxy(&proxy)),
        }
    }
}

#[cfg(test)]
mod tests;
