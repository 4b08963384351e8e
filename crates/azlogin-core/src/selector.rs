// SPDX-License-Identifier: Apache-2.0

//! Credential selection.
//!
//! | login mode | record path | credential |
//! |------------|-------------|------------|
//! | `enabled`  | any         | silent chain ending in a browser login |
//! | `disabled` | any         | silent chain only |
//! | `advanced` | unset       | interactive, in-memory only, login on first token request |
//! | `advanced` | set         | interactive from the stored record, or login now and save one |

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::Result;
use crate::auth::COGNITIVE_SERVICES_SCOPE;
use crate::cache::CachePersistence;
use crate::config::{LoginMode, ResolvedConfig};
use crate::credential::{Credential, InteractiveCredential, NonInteractiveCredential};
use crate::identity::IdentityBackend;
use crate::record::{self, RecordError};

/// Build the credential described by `config`.
///
/// In `advanced` mode with a record path this may sign the user in before
/// returning, when no usable record exists yet.
///
/// # Errors
///
/// Returns [`AuthError::InteractiveAuthFailed`](crate::AuthError::InteractiveAuthFailed)
/// if a required login does not complete.
#[instrument(skip_all, fields(login_mode = %config.login_mode))]
pub async fn select(config: &ResolvedConfig, backend: &dyn IdentityBackend) -> Result<Credential> {
    match config.login_mode {
        LoginMode::Enabled => Ok(non_interactive(config, backend, true)),
        LoginMode::Disabled => Ok(non_interactive(config, backend, false)),
        LoginMode::Advanced => {
            let credential = match config.record_path.as_deref() {
                Some(path) => persistent(config, backend, path).await?,
                None => in_memory(config, backend),
            };
            Ok(Credential::Interactive(Arc::new(credential)))
        }
    }
}

fn non_interactive(
    config: &ResolvedConfig,
    backend: &dyn IdentityBackend,
    browser_fallback: bool,
) -> Credential {
    let fallback = browser_fallback.then(|| {
        Arc::new(InteractiveCredential::new(
            backend.interactive_flow(config),
            backend.refresh_store(CachePersistence::InMemory),
            None,
            false,
        ))
    });
    debug!(browser_fallback, "Selected non-interactive credential chain");
    Credential::NonInteractive(Arc::new(NonInteractiveCredential::new(
        backend.silent_sources(config),
        fallback,
    )))
}

fn in_memory(config: &ResolvedConfig, backend: &dyn IdentityBackend) -> InteractiveCredential {
    info!(
        "No credential path configured; the sign-in lasts for this process only. \
         Set AZURE_SODA_CREDENTIAL_PATH to reuse it across runs"
    );
    InteractiveCredential::new(
        backend.interactive_flow(config),
        backend.refresh_store(CachePersistence::InMemory),
        None,
        false,
    )
}

async fn persistent(
    config: &ResolvedConfig,
    backend: &dyn IdentityBackend,
    path: &Path,
) -> Result<InteractiveCredential> {
    let flow = backend.interactive_flow(config);
    let store = backend.refresh_store(CachePersistence::Persistent {
        allow_unencrypted_storage: config.allow_unencrypted_storage,
    });

    match record::load(path) {
        Ok(existing) => {
            debug!(username = %existing.username, "Loaded authentication record");
            return Ok(InteractiveCredential::new(
                flow,
                store,
                Some(existing),
                config.allow_unencrypted_storage,
            ));
        }
        Err(RecordError::NotFound { .. }) => {
            info!(path = %path.display(), "No authentication record yet, signing in");
        }
        Err(e) => {
            warn!(error = %e, "Discarding authentication record, signing in again");
        }
    }

    let credential =
        InteractiveCredential::new(flow, store, None, config.allow_unencrypted_storage);
    let created = credential.authenticate(&[COGNITIVE_SERVICES_SCOPE]).await?;
    if let Err(e) = record::save(Some(path), &created) {
        warn!(error = %e, "Failed to save authentication record; the next run will sign in again");
    }
    Ok(credential)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::Ordering;

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::*;
    use crate::credential::CredentialKind;
    use crate::testing::{MockBackend, MockFlow, RefreshBehavior, test_record};

    fn advanced(path: Option<PathBuf>) -> ResolvedConfig {
        ResolvedConfig {
            login_mode: LoginMode::Advanced,
            record_path: path,
            ..ResolvedConfig::default()
        }
    }

    #[tokio::test]
    async fn test_enabled_builds_chain_with_browser_fallback() {
        let backend = MockBackend::new(MockFlow::new(RefreshBehavior::Succeed));
        let credential = select(&ResolvedConfig::default(), &backend)
            .await
            .expect("select");

        let Credential::NonInteractive(chain) = &credential else {
            panic!("expected chain, got {:?}", credential.kind());
        };
        assert!(chain.has_browser_fallback());
        assert_eq!(
            chain.source_names(),
            ["env", "cli", "InteractiveCredential"]
        );
        assert_eq!(backend.requested(), [CachePersistence::InMemory]);
    }

    #[tokio::test]
    async fn test_disabled_builds_chain_without_fallback() {
        let backend = MockBackend::new(MockFlow::new(RefreshBehavior::Succeed));
        let config = ResolvedConfig {
            login_mode: LoginMode::Disabled,
            ..ResolvedConfig::default()
        };
        let credential = select(&config, &backend).await.expect("select");

        let Credential::NonInteractive(chain) = &credential else {
            panic!("expected chain");
        };
        assert!(!chain.has_browser_fallback());
        assert_eq!(chain.source_names(), ["env", "cli"]);
    }

    #[tokio::test]
    async fn test_enabled_defers_token_errors_to_first_use() {
        let mut backend = MockBackend::new(MockFlow::failing_login());
        backend.sources = vec![];
        let credential = select(&ResolvedConfig::default(), &backend)
            .await
            .expect("selection succeeds");

        let err = credential
            .get_token(&[COGNITIVE_SERVICES_SCOPE])
            .await
            .expect_err("first use fails");
        assert!(matches!(err, crate::AuthError::TokenAcquisitionFailed { .. }));
    }

    #[tokio::test]
    async fn test_advanced_without_path_is_lazy_and_independent() {
        let flow = MockFlow::new(RefreshBehavior::Succeed);
        let backend = MockBackend::new(flow.clone());
        let config = ResolvedConfig {
            allow_unencrypted_storage: true,
            ..advanced(None)
        };

        let first = select(&config, &backend).await.expect("first");
        let second = select(&config, &backend).await.expect("second");
        assert_eq!(flow.logins.load(Ordering::SeqCst), 0);
        assert_eq!(first.kind(), CredentialKind::Interactive);
        assert!(
            !first
                .as_interactive()
                .expect("interactive")
                .allow_unencrypted_storage()
        );

        first.get_token(&[COGNITIVE_SERVICES_SCOPE]).await.expect("token");
        second.get_token(&[COGNITIVE_SERVICES_SCOPE]).await.expect("token");
        assert_eq!(flow.logins.load(Ordering::SeqCst), 2);
        assert_eq!(
            backend.requested(),
            [CachePersistence::InMemory, CachePersistence::InMemory]
        );
    }

    #[tokio::test]
    async fn test_advanced_with_path_persists_then_reuses_record() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("record.json");
        let flow = MockFlow::new(RefreshBehavior::Succeed);
        let backend = MockBackend::new(flow.clone());
        let config = advanced(Some(path.clone()));

        // First run signs in and writes the record
        let first = select(&config, &backend).await.expect("first run");
        assert_eq!(flow.logins.load(Ordering::SeqCst), 1);
        let saved = record::load(&path).expect("record saved");
        assert_eq!(saved, test_record());
        first
            .get_token(&[COGNITIVE_SERVICES_SCOPE])
            .await
            .expect("token from login");
        assert_eq!(flow.logins.load(Ordering::SeqCst), 1);

        // Second run loads the record and refreshes silently
        let second = select(&config, &backend).await.expect("second run");
        assert_eq!(flow.logins.load(Ordering::SeqCst), 1);
        assert_eq!(
            second.as_interactive().expect("interactive").record(),
            Some(saved)
        );
        let token = second
            .get_token(&[COGNITIVE_SERVICES_SCOPE])
            .await
            .expect("token");
        assert_eq!(token.token.expose_secret(), "refreshed-token");
        assert_eq!(flow.logins.load(Ordering::SeqCst), 1);
        assert_eq!(flow.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_advanced_recovers_from_corrupt_record() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("record.json");
        std::fs::write(&path, "{\"authority\": \"login.micro").expect("write");
        let flow = MockFlow::new(RefreshBehavior::Succeed);
        let backend = MockBackend::new(flow.clone());

        select(&advanced(Some(path.clone())), &backend)
            .await
            .expect("recovered");

        assert_eq!(flow.logins.load(Ordering::SeqCst), 1);
        assert_eq!(record::load(&path).expect("rewritten"), test_record());
    }

    #[tokio::test]
    async fn test_advanced_passes_unencrypted_flag_to_store() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("record.json");
        record::save(Some(path.as_path()), &test_record()).expect("seed");
        let flow = MockFlow::new(RefreshBehavior::Succeed);
        let backend = MockBackend::new(flow.clone());
        let config = ResolvedConfig {
            allow_unencrypted_storage: true,
            ..advanced(Some(path.clone()))
        };

        let credential = select(&config, &backend).await.expect("select");

        assert_eq!(flow.logins.load(Ordering::SeqCst), 0);
        assert_eq!(
            backend.requested(),
            [CachePersistence::Persistent {
                allow_unencrypted_storage: true
            }]
        );
        assert!(
            credential
                .as_interactive()
                .expect("interactive")
                .allow_unencrypted_storage()
        );
    }

    #[tokio::test]
    async fn test_failed_login_fails_selection() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("record.json");
        let backend = MockBackend::new(MockFlow::failing_login());

        let err = select(&advanced(Some(path.clone())), &backend)
            .await
            .expect_err("login failed");

        assert!(matches!(err, crate::AuthError::InteractiveAuthFailed { .. }));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_unwritable_record_path_still_returns_credential() {
        let dir = TempDir::new().expect("tempdir");
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").expect("write");
        let path = blocker.join("record.json");
        let flow = MockFlow::new(RefreshBehavior::Succeed);
        let backend = MockBackend::new(flow.clone());

        let credential = select(&advanced(Some(path.clone())), &backend)
            .await
            .expect("select");

        credential
            .get_token(&[COGNITIVE_SERVICES_SCOPE])
            .await
            .expect("token");
        assert_eq!(flow.logins.load(Ordering::SeqCst), 1);
    }
}
