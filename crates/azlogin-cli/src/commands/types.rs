// SPDX-License-Identifier: Apache-2.0

//! Result types returned by command handlers.
//!
//! These types allow command handlers to return data instead of printing
//! directly, improving testability and separation of concerns.

use std::path::PathBuf;

use azlogin_core::{CredentialKind, LoginMode, StoreKind};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result from the token command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TokenResult {
    /// Credential variant that was selected.
    pub credential: CredentialKind,
    /// Source that produced the token, when known.
    pub source: Option<String>,
    /// Signed-in account (interactive credentials only).
    pub username: Option<String>,
    /// Scope the token is valid for.
    pub scope: String,
    /// Token expiry.
    pub expires_on: DateTime<Utc>,
    /// Token, masked unless `--show` was given.
    pub token: String,
}

/// State of the authentication record file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// The record loaded successfully.
    Present,
    /// A path is configured but no file exists yet.
    Missing,
    /// The file exists but cannot be used.
    Corrupt,
    /// No path configured; sign-ins are not persisted.
    NotConfigured,
}

/// Environment credential settings, without secrets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EnvironmentStatus {
    /// `AZURE_TENANT_ID`.
    pub tenant_id: Option<String>,
    /// `AZURE_CLIENT_ID`, or the developer client ID when defaulted.
    pub client_id: Option<String>,
    /// Whether `client_id` was defaulted for username/password sign-in.
    pub client_id_defaulted: bool,
    /// Whether `AZURE_CLIENT_SECRET` is set.
    pub client_secret_set: bool,
    /// `AZURE_USERNAME`.
    pub username: Option<String>,
}

/// Result from the status command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct StatusResult {
    /// Selected login workflow.
    pub login_mode: LoginMode,
    /// Whether an unencrypted token cache is allowed.
    pub allow_unencrypted_storage: bool,
    /// Configured record path.
    pub record_path: Option<PathBuf>,
    /// Record file state.
    pub record: RecordState,
    /// Account in the record, if present.
    pub username: Option<String>,
    /// Why the record was rejected, if corrupt.
    pub record_error: Option<String>,
    /// Authority host.
    pub authority_host: String,
    /// Environment credential settings.
    pub environment: EnvironmentStatus,
}

/// Result from the logout command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LogoutResult {
    /// Configured record path.
    pub record_path: Option<PathBuf>,
    /// Whether a record file was deleted.
    pub record_removed: bool,
    /// Store the cached refresh token was removed from, if any.
    pub refresh_token_store: Option<StoreKind>,
    /// Whether the user declined the confirmation.
    pub cancelled: bool,
}
