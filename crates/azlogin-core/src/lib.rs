// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! # azlogin Core
//!
//! Microsoft Entra ID sign-in for Azure Cognitive Services clients.
//!
//! This crate provides reusable components for:
//! - Configuration resolution (explicit options, `AZURE_SODA_*` variables, config file)
//! - Credential selection (silent chain or interactive login)
//! - Persisted authentication records and refresh-token caching
//! - A cloneable bearer token provider for downstream API clients
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use azlogin_core::{EntraBackend, ResolveOptions, derive, resolve, select};
//! use secrecy::ExposeSecret;
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Resolve configuration from the environment
//! let config = resolve(&ResolveOptions::default())?;
//!
//! // Pick a credential (may sign in interactively in advanced mode)
//! let backend = EntraBackend::new()?;
//! let credential = select(&config, &backend).await?;
//!
//! // Hand the provider to an API client
//! let get_token = derive(&credential).into_fn();
//! let token = get_token().await?;
//! println!("Bearer {}", token.expose_secret());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`auth`] - Token provider
//! - [`cache`] - Refresh-token storage
//! - [`config`] - Configuration resolution and paths
//! - [`credential`] - Credential variants
//! - [`error`] - Error types
//! - [`identity`] - Microsoft Entra ID strategies
//! - [`record`] - Authentication record file
//! - [`selector`] - Credential selection

// ============================================================================
// Token Provider
// ============================================================================

pub use auth::{
    BearerTokenProvider, COGNITIVE_SERVICES_SCOPE, TokenProvider, derive, derive_for,
};

// ============================================================================
// Error Handling
// ============================================================================

pub use error::AuthError;

/// Convenience Result type for azlogin operations.
///
/// This is equivalent to `std::result::Result<T, AuthError>`.
pub type Result<T> = std::result::Result<T, AuthError>;

// ============================================================================
// Configuration
// ============================================================================

pub use config::{
    EnvironmentSettings, LoginMode, ResolveOptions, ResolvedConfig, cache_dir, config_dir,
    config_file_path, resolve, resolve_from,
};

// ============================================================================
// Credentials
// ============================================================================

pub use credential::{
    Credential, CredentialKind, InteractiveCredential, NonInteractiveCredential, TokenCredential,
};
pub use selector::select;
pub use token::{AccessToken, TokenCache};

// ============================================================================
// Identity Backend
// ============================================================================

pub use identity::{EntraBackend, IdentityBackend, InteractiveFlow, InteractiveGrant};

// ============================================================================
// Persistence
// ============================================================================

pub use cache::{CachePersistence, RefreshTokenStore, StoreKind, open_store};
pub use record::{AuthenticationRecord, RecordError};

// ============================================================================
// Retry Logic
// ============================================================================

pub use retry::{is_retryable_auth, is_retryable_http, retry_backoff};

// ============================================================================
// Modules
// ============================================================================

pub mod auth;
pub mod cache;
pub mod config;
pub mod credential;
pub mod error;
pub mod identity;
pub mod record;
pub mod retry;
pub mod selector;
pub mod token;

#[cfg(test)]
mod testing;
