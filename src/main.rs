//! `wallrand`: set a random desktop wallpaper from subreddit listings.

mod cli;
mod commands;
mod error;

use crate::cli::Cli;
use clap::Parser;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const CRATES: [&str; 7] = [
    "wallrand",
    "wallrand_cache",
    "wallrand_config",
    "wallrand_fetch",
    "wallrand_library",
    "wallrand_platform",
    "wallrand_storage",
];

/// Our own crates log at the level chosen by `-v`; everything else only
/// reports warnings. `RUST_LOG` replaces both.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = CRATES.iter().map(|name| format!("{name}={level}")).collect();
        EnvFilter::new(format!("warn,{}", directives.join(",")))
    });
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(?err, "command failed");
            eprintln!("wallrand: {}", *err);
            ExitCode::FAILURE
        },
    }
}
