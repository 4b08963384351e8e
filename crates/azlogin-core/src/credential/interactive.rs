// SPDX-License-Identifier: Apache-2.0

//! Interactive credential with refresh-token caching.
//!
//! A token request is served, in order of preference, from:
//! 1. The in-memory access-token cache
//! 2. A silent refresh with the cached refresh token of the recorded account
//! 3. A new interactive login

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::TokenCredential;
use crate::Result;
use crate::cache::{RefreshTokenStore, StoreKind};
use crate::error::AuthError;
use crate::identity::{InteractiveFlow, InteractiveGrant};
use crate::record::AuthenticationRecord;
use crate::token::{AccessToken, TokenCache};

const NAME: &str = "InteractiveCredential";

/// Credential that signs the user in through the browser.
#[derive(Debug)]
pub struct InteractiveCredential {
    flow: Arc<dyn InteractiveFlow>,
    store: Arc<dyn RefreshTokenStore>,
    record: RwLock<Option<AuthenticationRecord>>,
    allow_unencrypted_storage: bool,
    cache: TokenCache,
}

impl InteractiveCredential {
    /// Create a credential.
    ///
    /// # Arguments
    ///
    /// * `flow` - Sign-in workflow
    /// * `store` - Where refresh tokens are kept
    /// * `record` - Account to refresh silently, if a previous login is known
    /// * `allow_unencrypted_storage` - Whether `store` may be a plain file
    #[must_use]
    pub fn new(
        flow: Arc<dyn InteractiveFlow>,
        store: Arc<dyn RefreshTokenStore>,
        record: Option<AuthenticationRecord>,
        allow_unencrypted_storage: bool,
    ) -> Self {
        Self {
            flow,
            store,
            record: RwLock::new(record),
            allow_unencrypted_storage,
            cache: TokenCache::default(),
        }
    }

    /// Account of the most recent login, if any.
    #[must_use]
    pub fn record(&self) -> Option<AuthenticationRecord> {
        self.record
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Where refresh tokens are kept.
    #[must_use]
    pub fn store_kind(&self) -> StoreKind {
        self.store.kind()
    }

    /// Whether refresh tokens may be kept in a plain file.
    #[must_use]
    pub fn allow_unencrypted_storage(&self) -> bool {
        self.allow_unencrypted_storage
    }

    /// Sign in now and return the account record.
    ///
    /// The access token from the login is cached for `scopes`, so the next
    /// [`get_token`](TokenCredential::get_token) does not prompt again.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InteractiveAuthFailed`] if the user does not
    /// complete the login.
    #[instrument(skip(self))]
    pub async fn authenticate(&self, scopes: &[&str]) -> Result<AuthenticationRecord> {
        let hint = self.record().map(|r| r.username);
        let grant = self.flow.login(scopes, hint.as_deref()).await?;
        let record = grant.record.clone();
        let token = self.accept(grant);
        self.cache.insert(scopes, token).await;
        Ok(record)
    }

    /// Forget the cached refresh token and access tokens for the current account.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh-token store cannot be updated.
    pub async fn sign_out(&self) -> anyhow::Result<()> {
        self.cache.clear().await;
        if let Some(record) = self.record() {
            self.store.remove(&record.home_account_id)?;
            debug!(username = %record.username, "Removed cached refresh token");
        }
        Ok(())
    }

    async fn acquire(&self, scopes: &[&str]) -> Result<AccessToken> {
        let record = self.record();

        if let Some(record) = &record
            && let Some(refresh_token) = self.store.load(&record.home_account_id)
        {
            match self.flow.refresh(record, &refresh_token, scopes).await {
                Ok(grant) => return Ok(self.accept(grant)),
                Err(AuthError::InteractionRequired { message }) => {
                    info!(reason = %message, "Cached sign-in expired, logging in again");
                }
                Err(e) => return Err(e),
            }
        }

        let hint = record.map(|r| r.username);
        let grant = self.flow.login(scopes, hint.as_deref()).await?;
        Ok(self.accept(grant))
    }

    /// Keep the refresh token and account from a grant, returning its access token.
    fn accept(&self, grant: InteractiveGrant) -> AccessToken {
        let InteractiveGrant {
            token,
            record,
            refresh_token,
        } = grant;

        if let Some(refresh_token) = refresh_token
            && let Err(e) = self.store.store(&record.home_account_id, &refresh_token)
        {
            warn!(
                error = %e,
                kind = %self.store.kind(),
                "Failed to cache refresh token; next process will prompt again"
            );
        }

        *self.record.write().unwrap_or_else(PoisonError::into_inner) = Some(record);
        token
    }
}

#[async_trait]
impl TokenCredential for InteractiveCredential {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(skip(self))]
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        self.cache
            .get_or_refresh(scopes, || self.acquire(scopes))
            .await
    }
}
