// SPDX-License-Identifier: Apache-2.0

//! Access tokens and the shared per-credential token cache.

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::Result;

/// Tokens expiring within this window are refreshed before use.
pub const REFRESH_MARGIN_SECONDS: i64 = 300;

/// A bearer token with its expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The bearer token value.
    pub token: SecretString,
    /// When the token stops being accepted.
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    /// Create a token that expires at `expires_on`.
    #[must_use]
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            expires_on,
        }
    }

    /// Create a token that expires `expires_in` seconds from now.
    #[must_use]
    pub fn expiring_in(token: impl Into<String>, expires_in: i64) -> Self {
        Self::new(token, Utc::now() + Duration::seconds(expires_in))
    }

    /// Check if the token can still be handed out.
    ///
    /// # Arguments
    ///
    /// * `margin` - Minimum remaining lifetime required
    #[must_use]
    pub fn is_usable(&self, margin: Duration) -> bool {
        self.expires_on - Utc::now() > margin
    }
}

/// Cache key for a set of scopes.
#[must_use]
pub fn scope_key(scopes: &[&str]) -> String {
    scopes.join(" ")
}

/// In-memory token cache with single-flight refresh.
///
/// Reads are shared. A cache miss takes the refresh lock and re-checks the
/// cache before fetching, so concurrent callers waiting on the lock reuse the
/// token fetched by whoever held it.
#[derive(Debug)]
pub struct TokenCache {
    tokens: RwLock<HashMap<String, AccessToken>>,
    refresh: Mutex<()>,
    margin: Duration,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(Duration::seconds(REFRESH_MARGIN_SECONDS))
    }
}

impl TokenCache {
    /// Create an empty cache with the given refresh margin.
    #[must_use]
    pub fn new(margin: Duration) -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
            refresh: Mutex::new(()),
            margin,
        }
    }

    /// Return a usable cached token for `scopes`, if any.
    pub async fn get(&self, scopes: &[&str]) -> Option<AccessToken> {
        let tokens = self.tokens.read().await;
        tokens
            .get(&scope_key(scopes))
            .filter(|t| t.is_usable(self.margin))
            .cloned()
    }

    /// Store a token for `scopes`, replacing any previous one.
    pub async fn insert(&self, scopes: &[&str], token: AccessToken) {
        self.tokens.write().await.insert(scope_key(scopes), token);
    }

    /// Drop every cached token.
    pub async fn clear(&self) {
        self.tokens.write().await.clear();
    }

    /// Return a cached token or run `fetch` to obtain a new one.
    ///
    /// At most one `fetch` runs at a time per cache. Errors from `fetch` are
    /// returned to the caller that ran it; waiting callers retry on their own.
    pub async fn get_or_refresh<F, Fut>(&self, scopes: &[&str], fetch: F) -> Result<AccessToken>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken>>,
    {
        if let Some(token) = self.get(scopes).await {
            trace!("Token cache hit");
            return Ok(token);
        }

        let _guard = self.refresh.lock().await;

        // Another caller may have refreshed while we waited for the lock
        if let Some(token) = self.get(scopes).await {
            trace!("Token refreshed by concurrent caller");
            return Ok(token);
        }

        debug!(scopes = %scope_key(scopes), "Token cache miss, refreshing");
        let token = fetch().await?;
        self.insert(scopes, token.clone()).await;
        Ok(token)
    }
}
