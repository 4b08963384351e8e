// SPDX-License-Identifier: Apache-2.0

//! Interactive sign-in through the OAuth device authorization grant.
//!
//! 1. Request a device code from Entra ID
//! 2. Open the verification page in the browser and print the user code
//! 3. Poll for tokens until the user finishes signing in
//! 4. Build an [`AuthenticationRecord`] from the returned account info

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::client::{DeviceCodeResponse, EntraClient, TokenResponse};
use super::{InteractiveFlow, InteractiveGrant};
use crate::Result;
use crate::error::AuthError;
use crate::record::{AuthenticationRecord, RECORD_VERSION};

/// Scopes added to every interactive request so that a refresh token and
/// account info come back.
const LOGIN_SCOPES: &[&str] = &["openid", "profile", "offline_access"];

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Polling interval when the device code response does not specify one.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Device-code sign-in that opens the verification page in the browser.
#[derive(Debug, Clone)]
pub struct DeviceCodeFlow {
    client: EntraClient,
    tenant_id: String,
    client_id: String,
    open_browser: bool,
}

impl DeviceCodeFlow {
    /// Create a flow for the given tenant and public client.
    #[must_use]
    pub fn new(client: EntraClient, tenant_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            client,
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            open_browser: true,
        }
    }

    /// Disable opening the browser; the user follows the printed link instead.
    #[must_use]
    pub fn without_browser(mut self) -> Self {
        self.open_browser = false;
        self
    }

    async fn poll(&self, codes: &DeviceCodeResponse) -> Result<TokenResponse> {
        let mut interval = codes.interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        let deadline = Instant::now() + Duration::from_secs(codes.expires_in);

        loop {
            tokio::time::sleep(Duration::from_secs(interval)).await;
            if Instant::now() > deadline {
                return Err(AuthError::InteractiveAuthFailed {
                    message: "device code expired before sign-in completed".to_string(),
                });
            }

            let result = self
                .client
                .request_token_once(
                    &self.tenant_id,
                    &[
                        ("grant_type", DEVICE_CODE_GRANT),
                        ("client_id", &self.client_id),
                        ("device_code", &codes.device_code),
                        ("client_info", "1"),
                    ],
                )
                .await;

            match result {
                Ok(response) => return Ok(response),
                Err(AuthError::Identity { code, .. }) if code == "authorization_pending" => {
                    debug!("Waiting for user to complete sign-in");
                }
                Err(AuthError::Identity { code, .. }) if code == "slow_down" => {
                    interval += DEFAULT_POLL_INTERVAL_SECS;
                    debug!(interval, "Identity service asked to slow down");
                }
                Err(AuthError::Identity { code, message, .. }) => {
                    return Err(AuthError::InteractiveAuthFailed {
                        message: format!("{code}: {message}"),
                    });
                }
                Err(e) => {
                    return Err(AuthError::InteractiveAuthFailed {
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    fn grant(
        &self,
        response: TokenResponse,
        previous: Option<&AuthenticationRecord>,
    ) -> Result<InteractiveGrant> {
        let token = response.access_token();
        let refresh_token = response.refresh_token.clone().map(SecretString::from);
        let record = match account_record(&response, &self.client.authority_name(), &self.client_id) {
            Some(record) => record,
            None => previous.cloned().ok_or_else(|| AuthError::InteractiveAuthFailed {
                message: "identity service did not return account information".to_string(),
            })?,
        };

        Ok(InteractiveGrant {
            token,
            record,
            refresh_token,
        })
    }
}

#[async_trait]
impl InteractiveFlow for DeviceCodeFlow {
    #[instrument(skip(self))]
    async fn login(&self, scopes: &[&str], login_hint: Option<&str>) -> Result<InteractiveGrant> {
        let scope = request_scope(scopes);
        let codes = self
            .client
            .request_device_code(&self.tenant_id, &self.client_id, &scope)
            .await
            .map_err(|e| AuthError::InteractiveAuthFailed {
                message: format!("failed to start sign-in: {e}"),
            })?;

        eprintln!();
        match login_hint {
            Some(hint) => eprintln!("Sign in to Microsoft Entra ID as {hint}. Visit:"),
            None => eprintln!("Sign in to Microsoft Entra ID. Visit:"),
        }
        eprintln!();
        eprintln!("    {}", codes.verification_uri);
        eprintln!();
        eprintln!("And enter the code:");
        eprintln!();
        eprintln!("    {}", codes.user_code);
        eprintln!();
        eprintln!("Waiting for authorization...");

        if self.open_browser
            && let Err(e) = webbrowser::open(&codes.verification_uri)
        {
            warn!(error = %e, "Failed to open browser; use the link above");
        }

        let response = self.poll(&codes).await?;
        let grant = self.grant(response, None)?;
        info!(username = %grant.record.username, "Interactive sign-in successful");
        Ok(grant)
    }

    #[instrument(skip(self, refresh_token), fields(username = %record.username))]
    async fn refresh(
        &self,
        record: &AuthenticationRecord,
        refresh_token: &SecretString,
        scopes: &[&str],
    ) -> Result<InteractiveGrant> {
        let scope = request_scope(scopes);
        let tenant = if record.tenant_id.is_empty() {
            self.tenant_id.as_str()
        } else {
            record.tenant_id.as_str()
        };
        let client_id = if record.client_id.is_empty() {
            self.client_id.as_str()
        } else {
            record.client_id.as_str()
        };

        let response = self
            .client
            .request_token(
                tenant,
                &[
                    ("grant_type", "refresh_token"),
                    ("client_id", client_id),
                    ("refresh_token", refresh_token.expose_secret()),
                    ("scope", scope.as_str()),
                    ("client_info", "1"),
                ],
            )
            .await?;

        debug!("Silent token refresh successful");
        self.grant(response, Some(record))
    }
}

fn request_scope(scopes: &[&str]) -> String {
    scopes
        .iter()
        .chain(LOGIN_SCOPES.iter().filter(|s| !scopes.contains(s)))
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Deserialize)]
struct ClientInfo {
    uid: String,
    utid: String,
}

#[derive(Debug, Default, Deserialize)]
struct IdTokenClaims {
    #[serde(default)]
    preferred_username: Option<String>,
    #[serde(default)]
    upn: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    oid: Option<String>,
    #[serde(default)]
    tid: Option<String>,
}

fn decode_json<T: for<'de> Deserialize<'de>>(segment: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Build the record for the account a token response belongs to.
fn account_record(
    response: &TokenResponse,
    authority: &str,
    client_id: &str,
) -> Option<AuthenticationRecord> {
    let claims: IdTokenClaims = response
        .id_token
        .as_deref()
        .and_then(|jwt| jwt.split('.').nth(1))
        .and_then(decode_json)
        .unwrap_or_default();

    let (object_id, tenant_id) = match response.client_info.as_deref().and_then(decode_json) {
        Some(ClientInfo { uid, utid }) => (uid, utid),
        None => (claims.oid.clone()?, claims.tid.clone()?),
    };

    let username = claims
        .preferred_username
        .or(claims.upn)
        .or(claims.email)
        .unwrap_or_default();

    Some(AuthenticationRecord {
        authority: authority.to_string(),
        home_account_id: format!("{object_id}.{tenant_id}"),
        tenant_id,
        client_id: client_id.to_string(),
        username,
        version: RECORD_VERSION.to_string(),
    })
}
