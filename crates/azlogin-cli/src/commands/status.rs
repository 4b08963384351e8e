// SPDX-License-Identifier: Apache-2.0

//! Show resolved configuration without signing in.

use std::path::Path;

use anyhow::Result;
use azlogin_core::record::{self, RecordError};
use azlogin_core::{ResolveOptions, ResolvedConfig, resolve};

use super::types::{EnvironmentStatus, RecordState, StatusResult};

/// Resolve configuration and inspect the authentication record.
pub fn run(options: &ResolveOptions) -> Result<StatusResult> {
    let config = resolve(options)?;
    Ok(status(&config))
}

fn status(config: &ResolvedConfig) -> StatusResult {
    let (record, username, record_error) = match config.record_path.as_deref() {
        None => (RecordState::NotConfigured, None, None),
        Some(path) => inspect(path),
    };

    let env = &config.environment;
    StatusResult {
        login_mode: config.login_mode,
        allow_unencrypted_storage: config.allow_unencrypted_storage,
        record_path: config.record_path.clone(),
        record,
        username,
        record_error,
        authority_host: config.authority_host.clone(),
        environment: EnvironmentStatus {
            tenant_id: env.tenant_id.clone(),
            client_id: env.client_id.clone(),
            client_id_defaulted: env.client_id_defaulted,
            client_secret_set: env.client_secret.is_some(),
            username: env.username.clone(),
        },
    }
}

fn inspect(path: &Path) -> (RecordState, Option<String>, Option<String>) {
    match record::load(path) {
        Ok(rec) => (RecordState::Present, Some(rec.username), None),
        Err(RecordError::NotFound { .. }) => (RecordState::Missing, None, None),
        Err(e) => (RecordState::Corrupt, None, Some(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use azlogin_core::{AuthenticationRecord, LoginMode};
    use tempfile::TempDir;

    use super::*;

    fn advanced(path: &Path) -> ResolvedConfig {
        ResolvedConfig {
            login_mode: LoginMode::Advanced,
            record_path: Some(path.to_path_buf()),
            ..ResolvedConfig::default()
        }
    }

    #[test]
    fn test_status_not_configured() {
        let result = status(&ResolvedConfig::default());
        assert_eq!(result.record, RecordState::NotConfigured);
        assert_eq!(result.login_mode, LoginMode::Enabled);
    }

    #[test]
    fn test_status_record_states() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("record.json");
        assert_eq!(status(&advanced(&path)).record, RecordState::Missing);

        std::fs::write(&path, "not json").expect("write");
        let corrupt = status(&advanced(&path));
        assert_eq!(corrupt.record, RecordState::Corrupt);
        assert!(corrupt.record_error.is_some());

        let rec = AuthenticationRecord {
            authority: "login.microsoftonline.com".to_string(),
            home_account_id: "oid.tid".to_string(),
            tenant_id: "tid".to_string(),
            client_id: "cid".to_string(),
            username: "ada@example.com".to_string(),
            version: "1.0".to_string(),
        };
        record::save(Some(path.as_path()), &rec).expect("save");
        let present = status(&advanced(&path));
        assert_eq!(present.record, RecordState::Present);
        assert_eq!(present.username.as_deref(), Some("ada@example.com"));
    }
}
