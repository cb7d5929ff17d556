//! tokcensus - A token census of a repository
//!
//! tokcensus provides:
//! - A top-down walk that skips whatever git ignores
//! - Per-file token counts from the Gemini countTokens endpoint (or locally)
//! - Two sorted reports: by path and by token count

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

mod backends;
mod cli;
mod core;
mod flows;

use crate::core::util::{cancel_on_ctrl_c, CancelToken};

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tokcensus={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    if cli.no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let cancel = CancelToken::new();
    cancel_on_ctrl_c(cancel.clone());

    cli::run(cli, cancel)
}
