// SPDX-License-Identifier: Apache-2.0

//! Microsoft Entra ID strategies.
//!
//! The selector only sees the [`IdentityBackend`] trait: which silent sources
//! exist, how to sign in interactively, and where refresh tokens live.
//! [`EntraBackend`] is the real implementation; tests swap in mocks.

pub mod client;
pub mod developer_cli;
pub mod device_code;
pub mod environment;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;

use crate::Result;
use crate::cache::{self, CachePersistence, RefreshTokenStore};
use crate::config::{DEVELOPER_SIGN_ON_CLIENT_ID, ResolvedConfig};
use crate::credential::TokenCredential;
use crate::record::AuthenticationRecord;
use crate::token::AccessToken;

pub use client::EntraClient;
pub use developer_cli::{DeveloperCli, DeveloperCliCredential};
pub use device_code::DeviceCodeFlow;
pub use environment::EnvironmentCredential;

/// Tenant used for interactive sign-in when `AZURE_TENANT_ID` is unset.
pub const DEFAULT_INTERACTIVE_TENANT: &str = "organizations";

/// Timeout for a single HTTP request to the identity service.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of an interactive login or a silent refresh.
#[derive(Debug, Clone)]
pub struct InteractiveGrant {
    /// Access token for the requested scopes.
    pub token: AccessToken,
    /// Account the token was issued to.
    pub record: AuthenticationRecord,
    /// Refresh token for later silent refreshes, if one was issued.
    pub refresh_token: Option<SecretString>,
}

/// A user sign-in workflow.
#[async_trait]
pub trait InteractiveFlow: Send + Sync + fmt::Debug {
    /// Sign the user in. Blocks until the user completes or abandons the login.
    async fn login(&self, scopes: &[&str], login_hint: Option<&str>) -> Result<InteractiveGrant>;

    /// Redeem a refresh token for `record`'s account without user interaction.
    ///
    /// Fails with [`AuthError::InteractionRequired`](crate::AuthError::InteractionRequired)
    /// when the refresh token was rejected.
    async fn refresh(
        &self,
        record: &AuthenticationRecord,
        refresh_token: &SecretString,
        scopes: &[&str],
    ) -> Result<InteractiveGrant>;
}

/// Factory for the concrete strategies a credential is built from.
pub trait IdentityBackend: Send + Sync {
    /// Silent sources for the non-interactive chain, in order.
    fn silent_sources(&self, config: &ResolvedConfig) -> Vec<Arc<dyn TokenCredential>>;

    /// Interactive sign-in workflow.
    fn interactive_flow(&self, config: &ResolvedConfig) -> Arc<dyn InteractiveFlow>;

    /// Refresh-token store for the requested persistence.
    fn refresh_store(&self, persistence: CachePersistence) -> Arc<dyn RefreshTokenStore> {
        cache::open_store(persistence)
    }
}

/// Backend that talks to Microsoft Entra ID and local developer tools.
#[derive(Debug, Clone)]
pub struct EntraBackend {
    http: Client,
    open_browser: bool,
}

impl EntraBackend {
    /// Create a backend with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("azlogin/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(http))
    }

    /// Create a backend around an existing HTTP client.
    #[must_use]
    pub fn with_client(http: Client) -> Self {
        Self {
            http,
            open_browser: true,
        }
    }

    /// Print the sign-in link without opening a browser.
    #[must_use]
    pub fn without_browser(mut self) -> Self {
        self.open_browser = false;
        self
    }

    fn client(&self, config: &ResolvedConfig) -> EntraClient {
        EntraClient::new(self.http.clone(), config.authority_host.clone())
    }
}

impl IdentityBackend for EntraBackend {
    fn silent_sources(&self, config: &ResolvedConfig) -> Vec<Arc<dyn TokenCredential>> {
        let tenant = config.environment.tenant_id.clone();
        vec![
            Arc::new(EnvironmentCredential::new(
                config.environment.clone(),
                self.client(config),
            )),
            Arc::new(DeveloperCliCredential::new(
                DeveloperCli::AzureCli,
                tenant.clone(),
            )),
            Arc::new(DeveloperCliCredential::new(
                DeveloperCli::AzureDeveloperCli,
                tenant,
            )),
        ]
    }

    fn interactive_flow(&self, config: &ResolvedConfig) -> Arc<dyn InteractiveFlow> {
        let tenant = config
            .environment
            .tenant_id
            .as_deref()
            .unwrap_or(DEFAULT_INTERACTIVE_TENANT);
        let flow = DeviceCodeFlow::new(self.client(config), tenant, DEVELOPER_SIGN_ON_CLIENT_ID);
        if self.open_browser {
            Arc::new(flow)
        } else {
            Arc::new(flow.without_browser())
        }
    }
}
