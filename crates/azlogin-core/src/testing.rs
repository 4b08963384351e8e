// SPDX-License-Identifier: Apache-2.0

//! Test doubles for credentials, sign-in flows and backends.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::Result;
use crate::cache::{CachePersistence, MemoryStore, RefreshTokenStore};
use crate::config::ResolvedConfig;
use crate::credential::TokenCredential;
use crate::error::AuthError;
use crate::identity::{IdentityBackend, InteractiveFlow, InteractiveGrant};
use crate::record::{AuthenticationRecord, RECORD_VERSION};
use crate::token::AccessToken;

pub fn test_record() -> AuthenticationRecord {
    AuthenticationRecord {
        authority: "login.microsoftonline.com".to_string(),
        home_account_id: "00000000-0000-0000-0000-000000000001.tenant".to_string(),
        tenant_id: "tenant".to_string(),
        client_id: crate::config::DEVELOPER_SIGN_ON_CLIENT_ID.to_string(),
        username: "ada@example.com".to_string(),
        version: RECORD_VERSION.to_string(),
    }
}

/// How [`MockFlow::refresh`] answers.
#[derive(Debug, Clone, Copy)]
pub enum RefreshBehavior {
    Succeed,
    InteractionRequired,
    Fail,
}

/// Sign-in flow that counts logins and refreshes.
#[derive(Debug)]
pub struct MockFlow {
    pub logins: AtomicU32,
    pub refreshes: AtomicU32,
    refresh: RefreshBehavior,
    fail_login: bool,
    hints: Mutex<Vec<Option<String>>>,
}

impl MockFlow {
    pub fn new(refresh: RefreshBehavior) -> Arc<Self> {
        Arc::new(Self {
            logins: AtomicU32::new(0),
            refreshes: AtomicU32::new(0),
            refresh,
            fail_login: false,
            hints: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_login() -> Arc<Self> {
        Arc::new(Self {
            logins: AtomicU32::new(0),
            refreshes: AtomicU32::new(0),
            refresh: RefreshBehavior::Fail,
            fail_login: true,
            hints: Mutex::new(Vec::new()),
        })
    }

    pub fn last_hint(&self) -> Option<String> {
        self.hints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
            .flatten()
    }
}

#[async_trait]
impl InteractiveFlow for MockFlow {
    async fn login(&self, _scopes: &[&str], login_hint: Option<&str>) -> Result<InteractiveGrant> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        self.hints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(login_hint.map(str::to_string));
        // Widen the window for concurrent callers
        tokio::time::sleep(Duration::from_millis(10)).await;

        if self.fail_login {
            return Err(AuthError::InteractiveAuthFailed {
                message: "user cancelled".to_string(),
            });
        }
        Ok(InteractiveGrant {
            token: AccessToken::expiring_in("interactive-token", 3600),
            record: test_record(),
            refresh_token: Some(SecretString::from("refresh-token")),
        })
    }

    async fn refresh(
        &self,
        record: &AuthenticationRecord,
        _refresh_token: &SecretString,
        _scopes: &[&str],
    ) -> Result<InteractiveGrant> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        match self.refresh {
            RefreshBehavior::Succeed => Ok(InteractiveGrant {
                token: AccessToken::expiring_in("refreshed-token", 3600),
                record: record.clone(),
                refresh_token: Some(SecretString::from("rotated-refresh-token")),
            }),
            RefreshBehavior::InteractionRequired => Err(AuthError::InteractionRequired {
                message: "AADSTS70043: refresh token expired".to_string(),
            }),
            RefreshBehavior::Fail => Err(AuthError::Identity {
                status: 401,
                code: "invalid_client".to_string(),
                message: "bad client".to_string(),
            }),
        }
    }
}

/// How a [`MockSource`] answers.
#[derive(Debug, Clone, Copy)]
pub enum SourceBehavior {
    Unavailable,
    Fail,
    Token(&'static str),
    /// Token that expires inside the refresh margin, so it is never cached.
    ShortLived(&'static str),
}

/// Silent source that counts calls.
#[derive(Debug)]
pub struct MockSource {
    name: String,
    behavior: SourceBehavior,
    pub calls: AtomicU32,
}

impl MockSource {
    pub fn new(name: &str, behavior: SourceBehavior) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            behavior,
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl TokenCredential for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_token(&self, _scopes: &[&str]) -> Result<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        match self.behavior {
            SourceBehavior::Unavailable => Err(AuthError::unavailable(&self.name, "not configured")),
            SourceBehavior::Fail => Err(AuthError::Identity {
                status: 401,
                code: "invalid_client".to_string(),
                message: "bad secret".to_string(),
            }),
            SourceBehavior::Token(value) => Ok(AccessToken::expiring_in(value, 3600)),
            SourceBehavior::ShortLived(value) => Ok(AccessToken::expiring_in(value, 60)),
        }
    }
}

pub fn links(sources: &[&Arc<MockSource>]) -> Vec<Arc<dyn TokenCredential>> {
    sources
        .iter()
        .map(|s| (*s).clone() as Arc<dyn TokenCredential>)
        .collect()
}

/// Backend whose persistent store outlives the credentials built from it,
/// standing in for the keyring across simulated process runs.
#[derive(Debug)]
pub struct MockBackend {
    pub sources: Vec<Arc<MockSource>>,
    pub flow: Arc<MockFlow>,
    pub persistent_store: Arc<MemoryStore>,
    pub requested: Mutex<Vec<CachePersistence>>,
}

impl MockBackend {
    pub fn new(flow: Arc<MockFlow>) -> Self {
        Self {
            sources: vec![
                MockSource::new("env", SourceBehavior::Unavailable),
                MockSource::new("cli", SourceBehavior::Token("cli-token")),
            ],
            flow,
            persistent_store: Arc::new(MemoryStore::default()),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn requested(&self) -> Vec<CachePersistence> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl IdentityBackend for MockBackend {
    fn silent_sources(&self, _config: &ResolvedConfig) -> Vec<Arc<dyn TokenCredential>> {
        self.sources
            .iter()
            .map(|s| s.clone() as Arc<dyn TokenCredential>)
            .collect()
    }

    fn interactive_flow(&self, _config: &ResolvedConfig) -> Arc<dyn InteractiveFlow> {
        self.flow.clone()
    }

    fn refresh_store(&self, persistence: CachePersistence) -> Arc<dyn RefreshTokenStore> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(persistence);
        match persistence {
            CachePersistence::InMemory => Arc::new(MemoryStore::default()),
            CachePersistence::Persistent { .. } => self.persistent_store.clone(),
        }
    }
}
