// SPDX-License-Identifier: Apache-2.0

//! Forget a persisted sign-in.

use anyhow::{Context, Result, bail};
use azlogin_core::record::{self, RecordError};
use azlogin_core::{
    CachePersistence, EntraBackend, IdentityBackend, InteractiveCredential, ResolveOptions, resolve,
};
use dialoguer::Confirm;
use tracing::info;

use super::types::LogoutResult;
use crate::cli::OutputContext;

/// Remove the authentication record and the refresh token cached for it.
pub async fn run(options: &ResolveOptions, yes: bool, ctx: &OutputContext) -> Result<LogoutResult> {
    let config = resolve(options)?;
    let Some(path) = config.record_path.clone() else {
        return Ok(LogoutResult {
            record_path: None,
            record_removed: false,
            refresh_token_store: None,
            cancelled: false,
        });
    };

    let existing = match record::load(&path) {
        Ok(rec) => Some(rec),
        Err(RecordError::NotFound { .. }) => {
            return Ok(LogoutResult {
                record_path: Some(path),
                record_removed: false,
                refresh_token_store: None,
                cancelled: false,
            });
        }
        Err(_) => None,
    };

    if !yes {
        if !ctx.is_interactive() {
            bail!("Refusing to remove {} without confirmation; pass --yes", path.display());
        }
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove authentication record {}?", path.display()))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            return Ok(LogoutResult {
                record_path: Some(path),
                record_removed: false,
                refresh_token_store: None,
                cancelled: true,
            });
        }
    }

    let mut refresh_token_store = None;
    if existing.is_some() {
        let backend = EntraBackend::new().context("Failed to create HTTP client")?;
        let credential = InteractiveCredential::new(
            backend.interactive_flow(&config),
            backend.refresh_store(CachePersistence::Persistent {
                allow_unencrypted_storage: config.allow_unencrypted_storage,
            }),
            existing,
            config.allow_unencrypted_storage,
        );
        credential
            .sign_out()
            .await
            .context("Failed to remove cached refresh token")?;
        refresh_token_store = Some(credential.store_kind());
    }

    let record_removed = record::remove(&path)?;
    info!(path = %path.display(), "Logged out");

    Ok(LogoutResult {
        record_path: Some(path),
        record_removed,
        refresh_token_store,
        cancelled: false,
    })
}
