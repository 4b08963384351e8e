// SPDX-License-Identifier: Apache-2.0

//! Persisted authentication records.
//!
//! An [`AuthenticationRecord`] identifies an account that already completed
//! interactive consent. It holds no secrets, so it is stored as a plain JSON
//! file regardless of the token cache's storage policy.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Current serialization version.
pub const RECORD_VERSION: &str = "1.0";

/// Non-secret handle for a previously signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationRecord {
    /// Authority host the account signed in through, e.g. `login.microsoftonline.com`.
    pub authority: String,
    /// Account identifier, `<object id>.<tenant id>`.
    pub home_account_id: String,
    /// Tenant the account signed in to.
    pub tenant_id: String,
    /// Client application the record was issued for.
    pub client_id: String,
    /// User principal name.
    pub username: String,
    /// Serialization version.
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    RECORD_VERSION.to_string()
}

/// Errors from loading or saving an authentication record.
#[derive(Error, Debug)]
pub enum RecordError {
    /// No record file at the configured path.
    #[error("No authentication record at {}", .path.display())]
    NotFound {
        /// Configured record path.
        path: PathBuf,
    },

    /// The record file exists but cannot be read or parsed.
    #[error("Authentication record at {} is corrupt: {reason}", .path.display())]
    Corrupt {
        /// Configured record path.
        path: PathBuf,
        /// Why the file was rejected.
        reason: String,
    },

    /// The record file could not be written or removed.
    #[error("Failed to write authentication record {}: {source}", .path.display())]
    Io {
        /// Configured record path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Read an authentication record from disk.
///
/// Accepts either a JSON object or a JSON string holding the serialized
/// object (the double-encoded layout some tools write).
///
/// # Errors
///
/// - `RecordError::NotFound` if the file does not exist
/// - `RecordError::Corrupt` if it exists but is unreadable or invalid
#[instrument]
pub fn load(path: &Path) -> Result<AuthenticationRecord, RecordError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(RecordError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(corrupt(path, e.to_string())),
    };

    let value: serde_json::Value =
        serde_json::from_str(&contents).map_err(|e| corrupt(path, e.to_string()))?;

    let record: AuthenticationRecord = match value {
        serde_json::Value::String(inner) => serde_json::from_str(&inner),
        other => serde_json::from_value(other),
    }
    .map_err(|e| corrupt(path, e.to_string()))?;

    if record.home_account_id.is_empty() {
        return Err(corrupt(path, "missing homeAccountId".to_string()));
    }

    debug!(username = %record.username, "Loaded authentication record");
    Ok(record)
}

/// Write an authentication record to disk.
///
/// With no path this is a no-op that only logs a hint. Otherwise parent
/// directories are created and the file is replaced atomically.
///
/// # Errors
///
/// Returns `RecordError::Io` if the file cannot be written.
#[instrument(skip(record))]
pub fn save(path: Option<&Path>, record: &AuthenticationRecord) -> Result<(), RecordError> {
    let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
        info!(
            "Authentication record not persisted. Set AZURE_SODA_CREDENTIAL_PATH to reduce the number of logins required"
        );
        return Ok(());
    };

    let io_err = |source| RecordError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(io_err)?;

    let contents = serde_json::to_string_pretty(record)
        .map_err(|e| io_err(std::io::Error::new(ErrorKind::InvalidData, e)))?;

    // Unique temp file per writer, renamed over the target; last writer wins
    let mut temp = NamedTempFile::new_in(parent).map_err(io_err)?;
    temp.write_all(contents.as_bytes()).map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;

    info!(path = %path.display(), "Authentication record saved");
    Ok(())
}

/// Delete the record file. A missing file is not an error.
///
/// Returns `true` if a file was removed.
#[instrument]
pub fn remove(path: &Path) -> Result<bool, RecordError> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "Authentication record removed");
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(RecordError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn corrupt(path: &Path, reason: String) -> RecordError {
    RecordError::Corrupt {
        path: path.to_path_buf(),
        reason,
    }
}
