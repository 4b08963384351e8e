// SPDX-License-Identifier: Apache-2.0

//! Acquire a bearer token.

use anyhow::{Context, Result};
use azlogin_core::{Credential, EntraBackend, ResolveOptions, derive_for, resolve, select};
use secrecy::ExposeSecret;
use tracing::debug;

use super::types::TokenResult;

/// Characters of the token shown when masked.
const VISIBLE_PREFIX: usize = 8;

/// Resolve configuration, select a credential and fetch one token.
pub async fn run(options: &ResolveOptions, scope: &str, show: bool) -> Result<TokenResult> {
    let config = resolve(options)?;
    let backend = EntraBackend::new().context("Failed to create HTTP client")?;
    let credential = select(&config, &backend).await?;
    debug!(kind = %credential.kind(), "Credential selected");

    let provider = derive_for(&credential, scope);
    let token = provider.access_token().await?;

    let source = match &credential {
        Credential::NonInteractive(chain) => chain.successful_source().map(str::to_string),
        Credential::Interactive(_) => Some(provider.credential_name().to_string()),
    };
    let username = credential
        .as_interactive()
        .and_then(azlogin_core::InteractiveCredential::record)
        .map(|r| r.username);

    let secret = token.token.expose_secret();
    Ok(TokenResult {
        credential: credential.kind(),
        source,
        username,
        scope: scope.to_string(),
        expires_on: token.expires_on,
        token: if show {
            secret.to_string()
        } else {
            mask(secret)
        },
    })
}

fn mask(token: &str) -> String {
    let prefix: String = token.chars().take(VISIBLE_PREFIX).collect();
    format!("{prefix}...")
}
