// SPDX-License-Identifier: Apache-2.0

//! CLI-specific error formatting with user-friendly hints.
//!
//! Downcasts `anyhow::Error` to `AuthError` and appends a tip for the
//! failure at hand. Structured error data stays in the library.

use anyhow::Error;
use azlogin_core::{AuthError, RecordError};

/// Formats an error for CLI display with helpful hints.
///
/// If the error is not an `AuthError`, returns the original error message.
pub fn format_error(error: &Error) -> String {
    let Some(auth_err) = error.downcast_ref::<AuthError>() else {
        return error.to_string();
    };

    match auth_err {
        AuthError::Config { .. } => {
            let location = azlogin_core::config_file_path()
                .map_or_else(|| "your config file".to_string(), |p| p.display().to_string());
            format!(
                "{auth_err}\n\nTip: AZURE_SODA_WEBLOGIN must be one of enabled, disabled or advanced. \
                 Also check {location}."
            )
        }
        AuthError::Record(RecordError::Io { .. }) => {
            format!("{auth_err}\n\nTip: Check that the directory of AZURE_SODA_CREDENTIAL_PATH is writable.")
        }
        AuthError::Record(_) => auth_err.to_string(),
        AuthError::CredentialUnavailable { .. } | AuthError::TokenAcquisitionFailed { .. } => {
            format!(
                "{auth_err}\n\nTip: Sign in with `az login`, set AZURE_CLIENT_ID/AZURE_TENANT_ID/AZURE_CLIENT_SECRET, \
                 or use AZURE_SODA_WEBLOGIN=enabled for a browser login."
            )
        }
        AuthError::InteractionRequired { .. } => {
            format!("{auth_err}\n\nTip: Run `azlogin logout` and sign in again.")
        }
        AuthError::InteractiveAuthFailed { .. } => {
            format!("{auth_err}\n\nTip: Complete the sign-in in your browser before the code expires.")
        }
        AuthError::Identity { .. } | AuthError::CommandFailed { .. } => auth_err.to_string(),
        AuthError::Network(_) => {
            format!("{auth_err}\n\nTip: Check your internet connection and try again.")
        }
        AuthError::Keyring(_) => {
            format!(
                "{auth_err}\n\nTip: Your system keyring may be locked. Unlock it, or set \
                 AZURE_SODA_ALLOW_UNENCRYPTED_STORAGE=true."
            )
        }
    }
}
