// SPDX-License-Identifier: Apache-2.0

//! Ordered chain of silent credential sources.
//!
//! Sources are tried in order:
//! 1. Environment (`AZURE_CLIENT_SECRET` or `AZURE_USERNAME`/`AZURE_PASSWORD`)
//! 2. Azure CLI
//! 3. Azure Developer CLI
//! 4. Browser login, when enabled
//!
//! A source that is not configured is skipped. Any other failure stops the
//! chain. Once a source succeeds it is used directly from then on.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::TokenCredential;
use super::interactive::InteractiveCredential;
use crate::Result;
use crate::error::AuthError;
use crate::token::{AccessToken, TokenCache};

const NAME: &str = "NonInteractiveCredential";

/// Credential that walks a list of sources until one produces a token.
#[derive(Debug)]
pub struct NonInteractiveCredential {
    links: Vec<Arc<dyn TokenCredential>>,
    browser_fallback: bool,
    successful: OnceLock<usize>,
    cache: TokenCache,
}

impl NonInteractiveCredential {
    /// Build a chain from silent `sources`, optionally ending in `browser_fallback`.
    #[must_use]
    pub fn new(
        sources: Vec<Arc<dyn TokenCredential>>,
        browser_fallback: Option<Arc<InteractiveCredential>>,
    ) -> Self {
        let has_fallback = browser_fallback.is_some();
        let mut links = sources;
        if let Some(fallback) = browser_fallback {
            links.push(fallback);
        }
        Self {
            links,
            browser_fallback: has_fallback,
            successful: OnceLock::new(),
            cache: TokenCache::default(),
        }
    }

    /// Whether the chain ends in an interactive browser login.
    #[must_use]
    pub fn has_browser_fallback(&self) -> bool {
        self.browser_fallback
    }

    /// Names of the chain links, in order.
    #[must_use]
    pub fn source_names(&self) -> Vec<&str> {
        self.links.iter().map(|link| link.name()).collect()
    }

    /// Name of the source that last produced a token, if any did.
    #[must_use]
    pub fn successful_source(&self) -> Option<&str> {
        self.successful
            .get()
            .and_then(|&i| self.links.get(i))
            .map(|link| link.name())
    }

    async fn fetch(&self, scopes: &[&str]) -> Result<AccessToken> {
        if let Some(link) = self.successful.get().and_then(|&i| self.links.get(i)) {
            debug!(source = link.name(), "Using previously successful source");
            return link.get_token(scopes).await;
        }

        let mut attempts = Vec::with_capacity(self.links.len());
        for (index, link) in self.links.iter().enumerate() {
            match link.get_token(scopes).await {
                Ok(token) => {
                    info!(source = link.name(), "Acquired token");
                    let _ = self.successful.set(index);
                    return Ok(token);
                }
                Err(e) if e.is_unavailable() => {
                    debug!(source = link.name(), error = %e, "Source unavailable, trying next");
                    attempts.push((link.name().to_string(), e.to_string()));
                }
                Err(e) => {
                    debug!(source = link.name(), error = %e, "Source failed, stopping chain");
                    attempts.push((link.name().to_string(), e.to_string()));
                    break;
                }
            }
        }

        Err(AuthError::TokenAcquisitionFailed { attempts })
    }
}

#[async_trait]
impl TokenCredential for NonInteractiveCredential {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(skip(self))]
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        self.cache
            .get_or_refresh(scopes, || self.fetch(scopes))
            .await
    }
}
