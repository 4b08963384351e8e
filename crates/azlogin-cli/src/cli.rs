// SPDX-License-Identifier: Apache-2.0

//! Command-line interface definition for azlogin.
//!
//! Uses clap's derive API. Configuration flags are global so every
//! subcommand resolves settings the same way.

use std::io::IsTerminal;
use std::path::PathBuf;

use azlogin_core::{COGNITIVE_SERVICES_SCOPE, ResolveOptions};
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for CLI results.
#[derive(Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with colors (default)
    #[default]
    Text,
    /// JSON output for programmatic consumption
    Json,
}

/// Global output configuration passed to commands.
#[derive(Clone)]
pub struct OutputContext {
    /// Output format (text, json)
    pub format: OutputFormat,
    /// Enable verbose output
    pub verbose: bool,
    /// Whether stdout is a terminal (TTY)
    pub is_tty: bool,
}

impl OutputContext {
    /// Creates an `OutputContext` from CLI arguments.
    pub fn from_cli(format: OutputFormat, verbose: bool) -> Self {
        Self {
            format,
            verbose,
            is_tty: std::io::stdout().is_terminal(),
        }
    }

    /// Returns true if prompts and colors should be shown.
    pub fn is_interactive(&self) -> bool {
        self.is_tty && matches!(self.format, OutputFormat::Text)
    }
}

/// azlogin - Microsoft Entra ID tokens for Azure Cognitive Services.
///
/// Picks a sign-in strategy from `AZURE_SODA_*` settings and prints a bearer
/// token, reusing cached sign-ins where possible.
#[derive(Parser)]
#[command(name = "azlogin")]
#[command(version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Output format (text, json)
    #[arg(long, short = 'o', global = true, default_value = "text", value_enum)]
    pub output: OutputFormat,

    /// Enable verbose output (info-level logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Configuration overrides
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Explicit configuration; each flag beats its `AZURE_SODA_*` variable.
#[derive(Args, Clone, Default)]
pub struct ConfigArgs {
    /// Login workflow: enabled, disabled, or advanced [env: AZURE_SODA_WEBLOGIN]
    #[arg(long, global = true, value_name = "MODE")]
    pub login_mode: Option<String>,

    /// Authentication record file (advanced mode) [env: AZURE_SODA_CREDENTIAL_PATH]
    #[arg(long, global = true, value_name = "PATH")]
    pub record_path: Option<String>,

    /// Allow an unencrypted token cache when no keyring is available;
    /// `=false` overrides the environment [env: AZURE_SODA_ALLOW_UNENCRYPTED_STORAGE]
    #[arg(
        long,
        global = true,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub allow_unencrypted_storage: Option<bool>,

    /// Config file to read instead of ~/.config/azlogin/config.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl ConfigArgs {
    /// Convert flags into resolver options. Unset flags defer to the environment.
    pub fn to_options(&self) -> ResolveOptions {
        ResolveOptions::builder()
            .maybe_login_mode(self.login_mode.clone())
            .maybe_record_path(self.record_path.clone())
            .maybe_allow_unencrypted_storage(self.allow_unencrypted_storage)
            .maybe_config_file(self.config.clone())
            .build()
    }
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Acquire a bearer token
    Token {
        /// Scope to request the token for
        #[arg(long, default_value = COGNITIVE_SERVICES_SCOPE)]
        scope: String,

        /// Print the full token instead of a masked prefix
        #[arg(long)]
        show: bool,
    },

    /// Show resolved configuration and authentication record state
    Status,

    /// Remove the authentication record and its cached refresh token
    Logout {
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}
