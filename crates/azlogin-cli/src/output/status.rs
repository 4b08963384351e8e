// SPDX-License-Identifier: Apache-2.0

use comfy_table::{Table, presets};
use console::style;
use std::io::{self, Write};

use crate::cli::OutputContext;
use crate::commands::types::{RecordState, StatusResult};

use super::Renderable;

fn or_unset(value: Option<&str>) -> String {
    value.map_or_else(|| "(unset)".to_string(), str::to_string)
}

impl Renderable for StatusResult {
    fn render_text(&self, w: &mut dyn Write, _ctx: &OutputContext) -> io::Result<()> {
        let record = match self.record {
            RecordState::Present => style("present").green().to_string(),
            RecordState::Missing => style("missing (sign-in on next token)").yellow().to_string(),
            RecordState::Corrupt => style("corrupt (replaced on next token)").red().to_string(),
            RecordState::NotConfigured => style("not configured").dim().to_string(),
        };

        let mut table = Table::new();
        table.load_preset(presets::NOTHING);
        table.add_row(vec!["Login mode".to_string(), self.login_mode.to_string()]);
        table.add_row(vec![
            "Record path".to_string(),
            or_unset(
                self.record_path
                    .as_deref()
                    .map(|p| p.to_string_lossy())
                    .as_deref(),
            ),
        ]);
        table.add_row(vec!["Record".to_string(), record]);
        if let Some(ref username) = self.username {
            table.add_row(vec!["Account".to_string(), username.clone()]);
        }
        table.add_row(vec![
            "Unencrypted cache".to_string(),
            if self.allow_unencrypted_storage {
                "allowed".to_string()
            } else {
                "not allowed".to_string()
            },
        ]);
        table.add_row(vec!["Authority".to_string(), self.authority_host.clone()]);
        table.add_row(vec![
            "AZURE_TENANT_ID".to_string(),
            or_unset(self.environment.tenant_id.as_deref()),
        ]);
        let mut client_id = or_unset(self.environment.client_id.as_deref());
        if self.environment.client_id_defaulted {
            client_id.push_str(" (developer default)");
        }
        table.add_row(vec!["AZURE_CLIENT_ID".to_string(), client_id]);
        table.add_row(vec![
            "AZURE_CLIENT_SECRET".to_string(),
            if self.environment.client_secret_set {
                "set".to_string()
            } else {
                "(unset)".to_string()
            },
        ]);
        table.add_row(vec![
            "AZURE_USERNAME".to_string(),
            or_unset(self.environment.username.as_deref()),
        ]);

        writeln!(w, "{table}")?;
        if let Some(ref reason) = self.record_error {
            writeln!(w)?;
            writeln!(w, "{} {reason}", style("!").yellow().bold())?;
        }
        Ok(())
    }
}
