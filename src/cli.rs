//! Command-line definition.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wallrand_platform::FillMode;

/// Set a random desktop wallpaper from subreddit listings.
#[derive(Debug, Parser)]
#[command(name = "wallrand", author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (default: ./config.yaml, then the user configuration directory).
    #[arg(short, long, global = true, env = "WALLRAND_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More log output; repeat for more detail. `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a commented configuration file to fill in.
    Init {
        /// Overwrite an existing configuration file.
        #[arg(long)]
        force: bool,
    },
    /// Fetch, validate and apply a random wallpaper.
    Set {
        /// How the image is fitted to the screen (zoom, fill, center, stretch, tile).
        #[arg(long, value_parser = parse_fill_mode)]
        fill_mode: Option<FillMode>,
    },
    /// Remove every cached image.
    #[command(name = "clear-cache")]
    ClearCache,
    /// Load and validate the configuration, then summarise it.
    #[command(name = "test-config")]
    TestConfig,
}

fn parse_fill_mode(value: &str) -> Result<FillMode, String> {
    value.parse().map_err(|err: wallrand_platform::error::Error| (*err).to_string())
}
