// SPDX-License-Identifier: Apache-2.0

use chrono::Utc;
use console::style;
use std::io::{self, Write};

use crate::cli::OutputContext;
use crate::commands::types::TokenResult;

use super::Renderable;

impl Renderable for TokenResult {
    fn render_text(&self, w: &mut dyn Write, ctx: &OutputContext) -> io::Result<()> {
        if !ctx.is_tty {
            // Piped: print the bare token only
            return writeln!(w, "{}", self.token);
        }

        let minutes = (self.expires_on - Utc::now()).num_minutes();
        writeln!(w, "{} Token acquired", style("*").green().bold())?;
        if let Some(ref source) = self.source {
            writeln!(w, "  Source:  {}", style(source).cyan())?;
        }
        if let Some(ref username) = self.username {
            writeln!(w, "  Account: {}", style(username).cyan())?;
        }
        if ctx.verbose {
            writeln!(w, "  Kind:    {}", self.credential)?;
            writeln!(w, "  Scope:   {}", self.scope)?;
        }
        writeln!(
            w,
            "  Expires: {} (in {minutes} min)",
            self.expires_on.to_rfc3339()
        )?;
        writeln!(w, "  Token:   {}", self.token)?;
        Ok(())
    }
}
