// SPDX-License-Identifier: Apache-2.0

//! Reuse an existing Azure CLI (`az`) or Azure Developer CLI (`azd`) login.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::Result;
use crate::credential::TokenCredential;
use crate::error::AuthError;
use crate::token::AccessToken;

/// How long a developer tool may take to print a token.
const CLI_TIMEOUT: Duration = Duration::from_secs(10);

/// Which developer tool to ask for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeveloperCli {
    /// Azure CLI (`az account get-access-token`).
    AzureCli,
    /// Azure Developer CLI (`azd auth token`).
    AzureDeveloperCli,
}

impl DeveloperCli {
    fn program(self) -> &'static str {
        match self {
            DeveloperCli::AzureCli => "az",
            DeveloperCli::AzureDeveloperCli => "azd",
        }
    }

    fn credential_name(self) -> &'static str {
        match self {
            DeveloperCli::AzureCli => "AzureCliCredential",
            DeveloperCli::AzureDeveloperCli => "AzureDeveloperCliCredential",
        }
    }

    fn login_command(self) -> &'static str {
        match self {
            DeveloperCli::AzureCli => "az login",
            DeveloperCli::AzureDeveloperCli => "azd auth login",
        }
    }

    fn args(self, scope: &str, tenant_id: Option<&str>) -> Vec<String> {
        let mut args: Vec<String> = match self {
            DeveloperCli::AzureCli => vec![
                "account".into(),
                "get-access-token".into(),
                "--output".into(),
                "json".into(),
                "--resource".into(),
                scope.trim_end_matches("/.default").into(),
            ],
            DeveloperCli::AzureDeveloperCli => vec![
                "auth".into(),
                "token".into(),
                "--output".into(),
                "json".into(),
                "--scope".into(),
                scope.into(),
            ],
        };
        if let Some(tenant) = tenant_id {
            args.push(match self {
                DeveloperCli::AzureCli => "--tenant".into(),
                DeveloperCli::AzureDeveloperCli => "--tenant-id".into(),
            });
            args.push(tenant.into());
        }
        args
    }
}

impl fmt::Display for DeveloperCli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeveloperCli::AzureCli => write!(f, "Azure CLI"),
            DeveloperCli::AzureDeveloperCli => write!(f, "Azure Developer CLI"),
        }
    }
}

/// Token printed by `az account get-access-token` or `azd auth token`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    #[serde(alias = "token")]
    access_token: String,
    #[serde(default)]
    expires_on: Option<String>,
    #[serde(default, rename = "expires_on")]
    expires_on_epoch: Option<i64>,
}

/// Asks a locally signed-in developer tool for a token.
#[derive(Debug, Clone)]
pub struct DeveloperCliCredential {
    cli: DeveloperCli,
    tenant_id: Option<String>,
}

impl DeveloperCliCredential {
    /// Create a credential for `cli`, optionally pinned to a tenant.
    #[must_use]
    pub fn new(cli: DeveloperCli, tenant_id: Option<String>) -> Self {
        Self { cli, tenant_id }
    }
}

#[async_trait]
impl TokenCredential for DeveloperCliCredential {
    fn name(&self) -> &str {
        self.cli.credential_name()
    }

    #[instrument(skip(self), fields(cli = %self.cli))]
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        let name = self.cli.credential_name();
        let [scope] = scopes else {
            return Err(AuthError::unavailable(name, "exactly one scope is supported"));
        };

        debug!("Requesting token from developer CLI");
        let child = Command::new(self.cli.program())
            .args(self.cli.args(scope, self.tenant_id.as_deref()))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(CLI_TIMEOUT, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AuthError::unavailable(
                    name,
                    format!("{} is not installed", self.cli.program()),
                ));
            }
            Ok(Err(e)) => return Err(AuthError::unavailable(name, e.to_string())),
            Err(_) => {
                return Err(AuthError::unavailable(
                    name,
                    format!("{} timed out", self.cli.program()),
                ));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(status = ?output.status, stderr = %stderr, "Developer CLI failed");
            if needs_login(&stderr) {
                return Err(AuthError::unavailable(
                    name,
                    format!("not signed in, run `{}`", self.cli.login_command()),
                ));
            }
            return Err(AuthError::CommandFailed {
                program: self.cli.program().to_string(),
                message: stderr,
            });
        }

        parse_cli_token(&output.stdout).map_err(|message| AuthError::CommandFailed {
            program: self.cli.program().to_string(),
            message,
        })
    }
}

fn needs_login(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    lower.contains("az login")
        || lower.contains("azd auth login")
        || lower.contains("not logged in")
        || lower.contains("no subscription found")
}

/// Parse CLI JSON output into an [`AccessToken`].
fn parse_cli_token(stdout: &[u8]) -> std::result::Result<AccessToken, String> {
    let parsed: CliToken =
        serde_json::from_slice(stdout).map_err(|e| format!("unexpected output: {e}"))?;

    let expires_on = match (parsed.expires_on_epoch, parsed.expires_on.as_deref()) {
        (Some(epoch), _) => DateTime::<Utc>::from_timestamp(epoch, 0)
            .ok_or_else(|| format!("invalid expires_on: {epoch}"))?,
        (None, Some(text)) => parse_expires_on(text)?,
        (None, None) => return Err("token has no expiry".to_string()),
    };

    Ok(AccessToken::new(parsed.access_token, expires_on))
}

/// `azd` prints RFC 3339; older `az` prints local time without offset.
fn parse_expires_on(text: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| format!("invalid expiresOn '{text}': {e}"))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| format!("invalid local time '{text}'"))
}
