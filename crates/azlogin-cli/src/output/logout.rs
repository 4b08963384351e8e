// SPDX-License-Identifier: Apache-2.0

use console::style;
use std::io::{self, Write};

use crate::cli::OutputContext;
use crate::commands::types::LogoutResult;

use super::Renderable;

impl Renderable for LogoutResult {
    fn render_text(&self, w: &mut dyn Write, _ctx: &OutputContext) -> io::Result<()> {
        let Some(ref path) = self.record_path else {
            return writeln!(
                w,
                "{} No credential path configured; nothing is persisted.",
                style("!").yellow().bold()
            );
        };

        if self.cancelled {
            return writeln!(w, "{} Logout cancelled.", style("!").yellow().bold());
        }
        if !self.record_removed {
            return writeln!(
                w,
                "{} No authentication record at {}.",
                style("!").yellow().bold(),
                path.display()
            );
        }

        writeln!(
            w,
            "{} Removed authentication record {}.",
            style("*").green().bold(),
            path.display()
        )?;
        if let Some(store) = self.refresh_token_store {
            writeln!(w, "  Cached refresh token removed from {store}.")?;
        }
        Ok(())
    }
}
