// SPDX-License-Identifier: Apache-2.0

//! Command handlers for the azlogin CLI.

pub mod logout;
pub mod status;
pub mod token;
pub mod types;

use anyhow::Result;
use azlogin_core::ResolveOptions;

use crate::cli::{Commands, OutputContext};
use crate::output;

/// Dispatch to the appropriate command handler.
pub async fn run(command: Commands, ctx: OutputContext, options: ResolveOptions) -> Result<()> {
    match command {
        Commands::Token { scope, show } => {
            let result = token::run(&options, &scope, show).await?;
            output::render(&result, &ctx)
        }
        Commands::Status => {
            let result = status::run(&options)?;
            output::render(&result, &ctx)
        }
        Commands::Logout { yes } => {
            let result = logout::run(&options, yes, &ctx).await?;
            output::render(&result, &ctx)
        }
    }
}
