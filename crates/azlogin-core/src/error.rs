// SPDX-License-Identifier: Apache-2.0

//! Error types for azlogin.
//!
//! Uses `thiserror` for deriving `std::error::Error` implementations.
//! Application code should use `anyhow::Result` for top-level error handling.

use thiserror::Error;

use crate::record::RecordError;

/// Errors that can occur while selecting a credential or acquiring a token.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Invalid configuration, e.g. an unrecognized login mode.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// Authentication record file error.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// A credential source is not configured on this machine.
    ///
    /// Chained credentials skip sources that fail with this error.
    #[error("{source_name} unavailable: {message}")]
    CredentialUnavailable {
        /// Name of the source (e.g. `Azure CLI`).
        source_name: String,
        /// Why the source could not be used.
        message: String,
    },

    /// Silent token refresh was rejected and the user has to sign in again.
    #[error("Interaction required: {message}")]
    InteractionRequired {
        /// Error message from the identity backend.
        message: String,
    },

    /// The interactive browser login was cancelled, declined, or timed out.
    #[error("Interactive authentication failed: {message}")]
    InteractiveAuthFailed {
        /// Error message.
        message: String,
    },

    /// Every source in the credential chain failed.
    #[error("Failed to acquire a token from any credential source:\n{}", format_attempts(.attempts))]
    TokenAcquisitionFailed {
        /// One `(source, reason)` pair per attempted source, in chain order.
        attempts: Vec<(String, String)>,
    },

    /// OAuth error returned by the Microsoft Entra ID token endpoint.
    #[error("Identity service error ({code}): {message}")]
    Identity {
        /// HTTP status code.
        status: u16,
        /// OAuth error code (e.g. `invalid_client`).
        code: String,
        /// Error description from the identity service.
        message: String,
    },

    /// A developer tool (`az`, `azd`) ran but failed.
    #[error("{program} failed: {message}")]
    CommandFailed {
        /// Program name.
        program: String,
        /// Trimmed stderr or parse error.
        message: String,
    },

    /// Network/HTTP error from reqwest.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Keyring/credential storage error.
    #[cfg(feature = "keyring")]
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

impl From<config::ConfigError> for AuthError {
    fn from(err: config::ConfigError) -> Self {
        AuthError::Config {
            message: err.to_string(),
        }
    }
}

impl AuthError {
    /// Shorthand for [`AuthError::CredentialUnavailable`].
    pub(crate) fn unavailable(source_name: &str, message: impl Into<String>) -> Self {
        AuthError::CredentialUnavailable {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    /// Whether a chained credential should move on to its next source.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AuthError::CredentialUnavailable { .. })
    }
}

fn format_attempts(attempts: &[(String, String)]) -> String {
    attempts
        .iter()
        .map(|(source, reason)| format!("  {source}: {reason}"))
        .collect::<Vec<_>>()
        .join("\n")
}
