// SPDX-License-Identifier: Apache-2.0

//! Credentials: anything that can produce an access token for a set of scopes.

pub mod chain;
pub mod interactive;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::Result;
use crate::token::AccessToken;

pub use chain::NonInteractiveCredential;
pub use interactive::InteractiveCredential;

/// A source of access tokens.
#[async_trait]
pub trait TokenCredential: Send + Sync + fmt::Debug {
    /// Short name used in logs and error reports.
    fn name(&self) -> &str;

    /// Obtain a token for `scopes`.
    ///
    /// Safe to call repeatedly; implementations return a cached token while it
    /// is usable.
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken>;
}

/// Which credential variant the selector built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Chain of silent sources, optionally ending in a browser login.
    NonInteractive,
    /// Pure interactive login with persistent caching.
    Interactive,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialKind::NonInteractive => write!(f, "non-interactive chain"),
            CredentialKind::Interactive => write!(f, "interactive"),
        }
    }
}

/// The credential returned by [`select`](crate::select).
#[derive(Debug, Clone)]
pub enum Credential {
    /// Ordered chain of silent sources.
    NonInteractive(Arc<NonInteractiveCredential>),
    /// Interactive login with an optional authentication record.
    Interactive(Arc<InteractiveCredential>),
}

impl Credential {
    /// Which variant this is.
    #[must_use]
    pub fn kind(&self) -> CredentialKind {
        match self {
            Credential::NonInteractive(_) => CredentialKind::NonInteractive,
            Credential::Interactive(_) => CredentialKind::Interactive,
        }
    }

    /// The credential as a trait object.
    #[must_use]
    pub fn as_token_credential(&self) -> Arc<dyn TokenCredential> {
        match self {
            Credential::NonInteractive(c) => c.clone(),
            Credential::Interactive(c) => c.clone(),
        }
    }

    /// The interactive credential, if this is one.
    #[must_use]
    pub fn as_interactive(&self) -> Option<&InteractiveCredential> {
        match self {
            Credential::Interactive(c) => Some(c),
            Credential::NonInteractive(_) => None,
        }
    }

    /// Obtain a token for `scopes`.
    ///
    /// # Errors
    ///
    /// Returns the underlying credential's error.
    pub async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        match self {
            Credential::NonInteractive(c) => c.get_token(scopes).await,
            Credential::Interactive(c) => c.get_token(scopes).await,
        }
    }
}
