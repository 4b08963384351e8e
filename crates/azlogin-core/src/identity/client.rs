// SPDX-License-Identifier: Apache-2.0

//! HTTP client for the Microsoft Entra ID v2.0 OAuth endpoints.

use backon::Retryable;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::Result;
use crate::error::AuthError;
use crate::retry::{is_retryable_auth, retry_backoff};
use crate::token::AccessToken;

/// OAuth error codes meaning the cached sign-in can no longer be used silently.
const INTERACTION_REQUIRED_CODES: &[&str] = &[
    "invalid_grant",
    "interaction_required",
    "consent_required",
    "login_required",
];

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// Bearer token.
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
    /// Refresh token (only with the `offline_access` scope).
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// OpenID Connect ID token.
    #[serde(default)]
    pub id_token: Option<String>,
    /// Base64url JSON with the account's `uid` and `utid`.
    #[serde(default)]
    pub client_info: Option<String>,
}

impl TokenResponse {
    /// Convert into an [`AccessToken`] anchored at the current time.
    #[must_use]
    pub fn access_token(&self) -> AccessToken {
        AccessToken::expiring_in(self.access_token.clone(), self.expires_in)
    }
}

/// Device authorization response.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodeResponse {
    /// Code the client polls with.
    pub device_code: String,
    /// Code the user enters in the browser.
    pub user_code: String,
    /// Page where the user enters the code.
    pub verification_uri: String,
    /// Seconds until the device code expires.
    pub expires_in: u64,
    /// Minimum polling interval in seconds.
    #[serde(default)]
    pub interval: Option<u64>,
    /// Human-readable instructions.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Client for one Entra ID authority host.
#[derive(Debug, Clone)]
pub struct EntraClient {
    http: reqwest::Client,
    authority_host: String,
}

impl EntraClient {
    /// Create a client for `authority_host` (e.g. `https://login.microsoftonline.com`).
    #[must_use]
    pub fn new(http: reqwest::Client, authority_host: impl Into<String>) -> Self {
        Self {
            http,
            authority_host: authority_host.into().trim_end_matches('/').to_string(),
        }
    }

    /// Authority host URL.
    #[must_use]
    pub fn authority_host(&self) -> &str {
        &self.authority_host
    }

    /// Authority host without scheme, as stored in authentication records.
    #[must_use]
    pub fn authority_name(&self) -> String {
        self.authority_host
            .split_once("://")
            .map_or(self.authority_host.as_str(), |(_, host)| host)
            .to_string()
    }

    fn endpoint(&self, tenant: &str, path: &str) -> String {
        format!("{}/{tenant}/oauth2/v2.0/{path}", self.authority_host)
    }

    /// Redeem a grant at the token endpoint, retrying transient failures.
    #[instrument(skip(self, form))]
    pub async fn request_token(&self, tenant: &str, form: &[(&str, &str)]) -> Result<TokenResponse> {
        (|| async { self.request_token_once(tenant, form).await })
            .retry(retry_backoff())
            .when(is_retryable_auth)
            .notify(|err, dur| warn!(error = %err, delay = ?dur, "Retrying token request"))
            .await
    }

    /// Redeem a grant at the token endpoint once.
    pub async fn request_token_once(
        &self,
        tenant: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse> {
        let response = self
            .http
            .post(self.endpoint(tenant, "token"))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(oauth_error(status.as_u16(), &body));
        }

        let token: TokenResponse = response.json().await?;
        debug!(expires_in = token.expires_in, "Token endpoint returned a token");
        Ok(token)
    }

    /// Start a device authorization.
    #[instrument(skip(self))]
    pub async fn request_device_code(
        &self,
        tenant: &str,
        client_id: &str,
        scope: &str,
    ) -> Result<DeviceCodeResponse> {
        let response = self
            .http
            .post(self.endpoint(tenant, "devicecode"))
            .form(&[("client_id", client_id), ("scope", scope)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(oauth_error(status.as_u16(), &body));
        }

        Ok(response.json().await?)
    }
}

/// Map an OAuth error response to an [`AuthError`].
pub(crate) fn oauth_error(status: u16, body: &str) -> AuthError {
    let Ok(parsed) = serde_json::from_str::<OAuthErrorBody>(body) else {
        return AuthError::Identity {
            status,
            code: "unknown".to_string(),
            message: body.trim().to_string(),
        };
    };

    let message = parsed.error_description.unwrap_or_default();
    if INTERACTION_REQUIRED_CODES.contains(&parsed.error.as_str()) {
        return AuthError::InteractionRequired { message };
    }
    AuthError::Identity {
        status,
        code: parsed.error,
        message,
    }
}
