// SPDX-License-Identifier: Apache-2.0

//! Bearer token provider for Azure Cognitive Services clients.
//!
//! This module defines the `TokenProvider` trait that downstream API clients
//! consume, and [`BearerTokenProvider`], which implements it on top of any
//! [`Credential`]. Providers are cheap to clone and safe to share across
//! tasks; concurrent callers share a single refresh.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use secrecy::SecretString;
use tracing::instrument;

use crate::Result;
use crate::credential::{Credential, TokenCredential};
use crate::token::AccessToken;

/// Audience scope for Azure Cognitive Services (Azure OpenAI and friends).
pub const COGNITIVE_SERVICES_SCOPE: &str = "https://cognitiveservices.azure.com/.default";

/// Provides bearer tokens for API calls.
///
/// Implementations should return a token that stays valid for at least a few
/// minutes, refreshing it when necessary.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Retrieves a bearer token.
    async fn bearer_token(&self) -> Result<SecretString>;
}

/// Token provider bound to one credential and one scope.
#[derive(Debug, Clone)]
pub struct BearerTokenProvider {
    credential: Arc<dyn TokenCredential>,
    scope: Arc<str>,
}

impl BearerTokenProvider {
    /// Create a provider for `scope`.
    #[must_use]
    pub fn new(credential: Arc<dyn TokenCredential>, scope: impl Into<Arc<str>>) -> Self {
        Self {
            credential,
            scope: scope.into(),
        }
    }

    /// Scope tokens are requested for.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Name of the underlying credential.
    #[must_use]
    pub fn credential_name(&self) -> &str {
        self.credential.name()
    }

    /// Get a token with its expiry.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenAcquisitionFailed`](crate::AuthError::TokenAcquisitionFailed)
    /// when no credential source produced a token, or the credential's own
    /// error otherwise.
    #[instrument(skip(self), fields(scope = %self.scope))]
    pub async fn access_token(&self) -> Result<AccessToken> {
        self.credential.get_token(&[&*self.scope]).await
    }

    /// Get a bearer token.
    ///
    /// # Errors
    ///
    /// See [`access_token`](Self::access_token).
    pub async fn token(&self) -> Result<SecretString> {
        Ok(self.access_token().await?.token)
    }

    /// Turn the provider into a zero-argument callable.
    ///
    /// Each call returns a future that yields a currently valid token.
    pub fn into_fn(self) -> impl Fn() -> BoxFuture<'static, Result<SecretString>> + Clone + Send + Sync {
        move || {
            let provider = self.clone();
            Box::pin(async move { provider.token().await })
        }
    }
}

#[async_trait]
impl TokenProvider for BearerTokenProvider {
    async fn bearer_token(&self) -> Result<SecretString> {
        self.token().await
    }
}

/// Token provider for Azure Cognitive Services.
#[must_use]
pub fn derive(credential: &Credential) -> BearerTokenProvider {
    derive_for(credential, COGNITIVE_SERVICES_SCOPE)
}

/// Token provider for an arbitrary scope.
#[must_use]
pub fn derive_for(credential: &Credential, scope: &str) -> BearerTokenProvider {
    BearerTokenProvider::new(credential.as_token_credential(), scope)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use secrecy::ExposeSecret;

    use super::*;
    use crate::cache::MemoryStore;
    use crate::credential::{InteractiveCredential, NonInteractiveCredential};
    use crate::testing::{MockFlow, MockSource, RefreshBehavior, SourceBehavior, links};

    #[tokio::test]
    async fn test_provider_returns_token() {
        let cli = MockSource::new("cli", SourceBehavior::Token("cli-token"));
        let credential =
            Credential::NonInteractive(Arc::new(NonInteractiveCredential::new(links(&[&cli]), None)));

        let provider = derive(&credential);
        assert_eq!(provider.scope(), COGNITIVE_SERVICES_SCOPE);
        let token = provider.bearer_token().await.expect("token");
        assert_eq!(token.expose_secret(), "cli-token");
    }

    #[tokio::test]
    async fn test_fifty_concurrent_callers_share_one_login() {
        let flow = MockFlow::new(RefreshBehavior::Succeed);
        let credential = Credential::Interactive(Arc::new(InteractiveCredential::new(
            flow.clone(),
            Arc::new(MemoryStore::default()),
            None,
            false,
        )));
        let get_token = derive(&credential).into_fn();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let get_token = get_token.clone();
                tokio::spawn(async move { get_token().await })
            })
            .collect();

        for handle in handles {
            let token = handle.await.expect("join").expect("token");
            assert_eq!(token.expose_secret(), "interactive-token");
        }
        assert_eq!(flow.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fifty_concurrent_callers_share_one_chain_fetch() {
        let env = MockSource::new("env", SourceBehavior::Unavailable);
        let cli = MockSource::new("cli", SourceBehavior::Token("cli-token"));
        let credential = Credential::NonInteractive(Arc::new(NonInteractiveCredential::new(
            links(&[&env, &cli]),
            None,
        )));
        let provider = derive(&credential);

        let results = futures::future::join_all((0..50).map(|_| provider.token())).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(env.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cli.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_deferred_until_called() {
        let env = MockSource::new("env", SourceBehavior::Unavailable);
        let credential = Credential::NonInteractive(Arc::new(NonInteractiveCredential::new(
            links(&[&env]),
            None,
        )));
        let get_token = derive(&credential).into_fn();
        assert_eq!(env.calls.load(Ordering::SeqCst), 0);

        let err = get_token().await.expect_err("no source");
        assert!(matches!(err, crate::AuthError::TokenAcquisitionFailed { .. }));
    }

    #[tokio::test]
    async fn test_derive_for_custom_scope() {
        let cli = MockSource::new("cli", SourceBehavior::Token("graph-token"));
        let credential =
            Credential::NonInteractive(Arc::new(NonInteractiveCredential::new(links(&[&cli]), None)));

        let provider = derive_for(&credential, "https://graph.microsoft.com/.default");
        assert_eq!(provider.scope(), "https://graph.microsoft.com/.default");
        assert_eq!(provider.credential_name(), "NonInteractiveCredential");
    }
}
