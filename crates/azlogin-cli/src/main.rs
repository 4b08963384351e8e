// SPDX-License-Identifier: Apache-2.0

//! azlogin - Microsoft Entra ID tokens for Azure Cognitive Services.
//!
//! Picks a sign-in workflow from `AZURE_SODA_*` settings, reuses cached
//! sign-ins where it can, and prints a bearer token.

mod cli;
mod commands;
mod errors;
mod logging;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use crate::cli::{Cli, OutputContext};

#[tokio::main]
async fn main() -> Result<()> {
    // Variables from .env must be visible before configuration is resolved
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Failed to load .env file"),
    }

    let output_ctx = OutputContext::from_cli(cli.output, cli.verbose);
    let options = cli.config.to_options();

    match commands::run(cli.command, output_ctx, options).await {
        Ok(()) => Ok(()),
        Err(e) => {
            let formatted = errors::format_error(&e);
            eprintln!("Error: {formatted}");
            std::process::exit(1);
        }
    }
}
