// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for the azlogin CLI.
//!
//! Uses `tracing` with `tracing-subscriber` for structured logging on stderr,
//! so tokens printed on stdout stay machine-readable.
//!
//! # Examples
//!
//! ```bash
//! # Default: warnings only
//! azlogin token
//!
//! # Show which credential source was used and where caches live
//! azlogin -v token
//!
//! # Debug output for troubleshooting
//! RUST_LOG=azlogin=debug azlogin token
//! ```

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Default filter directives.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "azlogin=info,reqwest=error"
    } else {
        "azlogin=warn,reqwest=error"
    }
}

/// Initialize the logging subsystem.
///
/// `RUST_LOG` takes precedence over the `verbose` flag.
pub fn init_logging(verbose: bool) {
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let filter_layer = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
