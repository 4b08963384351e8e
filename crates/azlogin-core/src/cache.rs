// SPDX-License-Identifier: Apache-2.0

//! Persistent refresh-token cache for the interactive credential.
//!
//! Refresh tokens are keyed by the account's `homeAccountId`. Storage is
//! picked once per credential:
//!
//! 1. System keyring (platform-protected, `keyring` feature)
//! 2. Unencrypted JSON file in the cache directory, only when allowed
//! 3. Process memory

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tempfile::NamedTempFile;
#[cfg(feature = "keyring")]
use tracing::debug;
use tracing::{instrument, warn};

/// Keyring service name for cached refresh tokens.
pub const KEYRING_SERVICE: &str = "azlogin";

/// File name of the unencrypted refresh-token cache.
pub const UNENCRYPTED_CACHE_FILE: &str = "token_cache.json";

/// Where refresh tokens end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Process memory only.
    Memory,
    /// System keyring.
    Keyring,
    /// Plain file on disk.
    UnencryptedFile,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Memory => write!(f, "memory"),
            StoreKind::Keyring => write!(f, "system keyring"),
            StoreKind::UnencryptedFile => write!(f, "unencrypted file"),
        }
    }
}

/// Requested persistence for the interactive token cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePersistence {
    /// Keep everything in this process.
    InMemory,
    /// Persist across processes.
    Persistent {
        /// Fall back to an unencrypted file when the keyring is unavailable.
        allow_unencrypted_storage: bool,
    },
}

/// Storage for refresh tokens, keyed by account.
pub trait RefreshTokenStore: Send + Sync + fmt::Debug {
    /// Which storage backs this store.
    fn kind(&self) -> StoreKind;

    /// Retrieve the refresh token for `account`, if one is stored.
    fn load(&self, account: &str) -> Option<SecretString>;

    /// Store (or replace) the refresh token for `account`.
    fn store(&self, account: &str, token: &SecretString) -> Result<()>;

    /// Forget the refresh token for `account`. Missing entries are not an error.
    fn remove(&self, account: &str) -> Result<()>;
}

/// In-process refresh-token store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tokens: Mutex<HashMap<String, SecretString>>,
}

impl RefreshTokenStore for MemoryStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    fn load(&self, account: &str) -> Option<SecretString> {
        let tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        tokens.get(account).cloned()
    }

    fn store(&self, account: &str, token: &SecretString) -> Result<()> {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        tokens.insert(account.to_string(), token.clone());
        Ok(())
    }

    fn remove(&self, account: &str) -> Result<()> {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        tokens.remove(account);
        Ok(())
    }
}

/// Refresh-token store backed by the system keyring.
#[cfg(feature = "keyring")]
#[derive(Debug)]
pub struct KeyringStore {
    service: String,
}

#[cfg(feature = "keyring")]
impl KeyringStore {
    /// Open the keyring if the platform provides one.
    ///
    /// Returns `None` when no keyring backend is reachable (e.g. a headless
    /// Linux session without a Secret Service).
    #[instrument]
    pub fn probe(service: &str) -> Option<Self> {
        let entry = keyring::Entry::new(service, "azlogin-probe").ok()?;
        match entry.get_password() {
            Ok(_) | Err(keyring::Error::NoEntry) => {
                debug!("System keyring available");
                Some(Self {
                    service: service.to_string(),
                })
            }
            Err(e) => {
                debug!(error = %e, "System keyring unavailable");
                None
            }
        }
    }

    fn entry(&self, account: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, account).context("Failed to create keyring entry")
    }
}

#[cfg(feature = "keyring")]
impl RefreshTokenStore for KeyringStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Keyring
    }

    fn load(&self, account: &str) -> Option<SecretString> {
        let entry = self.entry(account).ok()?;
        let password = entry.get_password().ok()?;
        debug!("Retrieved refresh token from keyring");
        Some(SecretString::from(password))
    }

    fn store(&self, account: &str, token: &SecretString) -> Result<()> {
        self.entry(account)?
            .set_password(token.expose_secret())
            .context("Failed to store refresh token in keyring")?;
        debug!("Refresh token stored in system keyring");
        Ok(())
    }

    fn remove(&self, account: &str) -> Result<()> {
        match self.entry(account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete refresh token from keyring"),
        }
    }
}

/// Refresh-token store backed by a plain JSON file.
///
/// Only used when the caller explicitly allows unencrypted storage. The file
/// is created with owner-only permissions on Unix.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Create a store writing to `path`.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> HashMap<String, String> {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return HashMap::new();
        };
        serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Ignoring unreadable token cache file");
            HashMap::new()
        })
    }

    fn write_all(&self, tokens: &HashMap<String, String>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;

        let contents = serde_json::to_string(tokens).context("Failed to serialize token cache")?;

        // Temp file is created owner-only (0600 on Unix) before any secret is written
        let mut temp = NamedTempFile::new_in(dir).with_context(|| {
            format!("Failed to create token cache temp file in {}", dir.display())
        })?;
        temp.write_all(contents.as_bytes())
            .context("Failed to write token cache temp file")?;
        temp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace token cache: {}", self.path.display()))?;
        Ok(())
    }
}

impl RefreshTokenStore for FileStore {
    fn kind(&self) -> StoreKind {
        StoreKind::UnencryptedFile
    }

    fn load(&self, account: &str) -> Option<SecretString> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read_all().remove(account).map(SecretString::from)
    }

    fn store(&self, account: &str, token: &SecretString) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut tokens = self.read_all();
        tokens.insert(account.to_string(), token.expose_secret().to_string());
        self.write_all(&tokens)
    }

    fn remove(&self, account: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut tokens = self.read_all();
        if tokens.remove(account).is_some() {
            self.write_all(&tokens)?;
        }
        Ok(())
    }
}

/// Open the refresh-token store for the requested persistence.
///
/// Never fails: when persistent storage is unavailable or not allowed the
/// cache stays in memory and a warning is logged.
#[instrument]
pub fn open_store(persistence: CachePersistence) -> Arc<dyn RefreshTokenStore> {
    let CachePersistence::Persistent {
        allow_unencrypted_storage,
    } = persistence
    else {
        return Arc::new(MemoryStore::default());
    };

    #[cfg(feature = "keyring")]
    if let Some(store) = KeyringStore::probe(KEYRING_SERVICE) {
        tracing::info!(kind = %StoreKind::Keyring, "Using persistent token cache");
        return Arc::new(store);
    }

    if allow_unencrypted_storage {
        if let Some(dir) = crate::config::cache_dir() {
            let path = dir.join(UNENCRYPTED_CACHE_FILE);
            warn!(
                path = %path.display(),
                "Platform-protected storage unavailable; caching refresh tokens unencrypted"
            );
            return Arc::new(FileStore::new(path));
        }
        warn!("Could not determine cache directory; token cache kept in memory");
    } else {
        warn!(
            "Platform-protected storage unavailable; token cache kept in memory. \
             Set AZURE_SODA_ALLOW_UNENCRYPTED_STORAGE=true to persist it in a plain file"
        );
    }
    Arc::new(MemoryStore::default())
}
