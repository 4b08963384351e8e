// SPDX-License-Identifier: Apache-2.0

//! Service principal and username/password sign-in from `AZURE_*` settings.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::{debug, instrument};

use super::client::EntraClient;
use crate::Result;
use crate::config::EnvironmentSettings;
use crate::credential::TokenCredential;
use crate::error::AuthError;
use crate::token::AccessToken;

const NAME: &str = "EnvironmentCredential";

/// Tenant used for username/password sign-in when none is configured.
const DEFAULT_USER_TENANT: &str = "organizations";

/// Signs in with a client secret or a username/password pair.
#[derive(Debug, Clone)]
pub struct EnvironmentCredential {
    settings: EnvironmentSettings,
    client: EntraClient,
}

impl EnvironmentCredential {
    /// Create a credential from resolved environment settings.
    #[must_use]
    pub fn new(settings: EnvironmentSettings, client: EntraClient) -> Self {
        Self { settings, client }
    }
}

#[async_trait]
impl TokenCredential for EnvironmentCredential {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(skip(self))]
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        let s = &self.settings;
        let scope = scopes.join(" ");

        let response = match (
            s.tenant_id.as_deref(),
            s.client_id.as_deref(),
            s.client_secret.as_ref(),
            s.username.as_deref(),
            s.password.as_ref(),
        ) {
            (Some(tenant), Some(client_id), Some(secret), _, _) => {
                debug!("Using client secret from environment");
                self.client
                    .request_token(
                        tenant,
                        &[
                            ("grant_type", "client_credentials"),
                            ("client_id", client_id),
                            ("client_secret", secret.expose_secret()),
                            ("scope", scope.as_str()),
                        ],
                    )
                    .await?
            }
            (tenant, Some(client_id), None, Some(username), Some(password)) => {
                debug!("Using username and password from environment");
                self.client
                    .request_token(
                        tenant.unwrap_or(DEFAULT_USER_TENANT),
                        &[
                            ("grant_type", "password"),
                            ("client_id", client_id),
                            ("username", username),
                            ("password", password.expose_secret()),
                            ("scope", scope.as_str()),
                        ],
                    )
                    .await?
            }
            _ => {
                return Err(AuthError::unavailable(
                    NAME,
                    "environment variables are not fully configured",
                ));
            }
        };

        Ok(response.access_token())
    }
}
