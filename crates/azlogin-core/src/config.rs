// SPDX-License-Identifier: Apache-2.0

//! Configuration resolution for credential selection.
//!
//! This is the only module that reads environment variables. Everything
//! downstream receives an immutable [`ResolvedConfig`].
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Explicit arguments ([`ResolveOptions`])
//! 2. Environment variables (prefix: `AZURE_SODA_`)
//! 3. Config file: `~/.config/azlogin/config.toml`
//! 4. Built-in defaults
//!
//! # Examples
//!
//! ```bash
//! # Interactive login with a persisted authentication record
//! AZURE_SODA_WEBLOGIN=advanced \
//! AZURE_SODA_CREDENTIAL_PATH=~/.azure/soda_record.json \
//! azlogin token
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use bon::Builder;
use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::AuthError;

/// Prefix of the environment variables controlling the login workflow.
pub const ENV_PREFIX: &str = "AZURE_SODA";

/// Default Microsoft Entra ID authority.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Public client ID of the cross-platform Azure developer tooling.
///
/// Used for interactive sign-in, and as the fallback client ID for
/// username/password sign-in when `AZURE_CLIENT_ID` is unset.
pub const DEVELOPER_SIGN_ON_CLIENT_ID: &str = "04b07795-8ddb-461a-bbee-02f9e1bf7b46";

/// Which login workflow to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginMode {
    /// Silent credential chain with an interactive browser fallback.
    #[default]
    Enabled,
    /// Silent credential chain only.
    Disabled,
    /// Interactive browser login with a persistent token cache.
    Advanced,
}

impl FromStr for LoginMode {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enabled" => Ok(LoginMode::Enabled),
            "disabled" => Ok(LoginMode::Disabled),
            "advanced" => Ok(LoginMode::Advanced),
            other => Err(AuthError::Config {
                message: format!(
                    "unrecognized login mode '{other}' (expected 'enabled', 'disabled' or 'advanced')"
                ),
            }),
        }
    }
}

impl fmt::Display for LoginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginMode::Enabled => write!(f, "enabled"),
            LoginMode::Disabled => write!(f, "disabled"),
            LoginMode::Advanced => write!(f, "advanced"),
        }
    }
}

/// Explicit arguments. `None` falls through to the environment.
#[derive(Debug, Clone, Default, Builder)]
pub struct ResolveOptions {
    /// Login mode: `enabled`, `disabled` or `advanced`.
    #[builder(into)]
    pub login_mode: Option<String>,
    /// Path of the persisted authentication record. Empty disables persistence.
    #[builder(into)]
    pub record_path: Option<String>,
    /// Allow the token cache to fall back to unencrypted storage.
    pub allow_unencrypted_storage: Option<bool>,
    /// Config file to read instead of the default location.
    pub config_file: Option<PathBuf>,
}

/// Settings for the environment credential (service principal or user).
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSettings {
    /// `AZURE_TENANT_ID`.
    pub tenant_id: Option<String>,
    /// `AZURE_CLIENT_ID`, or the developer client ID when defaulted.
    pub client_id: Option<String>,
    /// `AZURE_CLIENT_SECRET`.
    pub client_secret: Option<SecretString>,
    /// `AZURE_USERNAME`.
    pub username: Option<String>,
    /// `AZURE_PASSWORD`.
    pub password: Option<SecretString>,
    /// Whether `client_id` was filled in with [`DEVELOPER_SIGN_ON_CLIENT_ID`].
    pub client_id_defaulted: bool,
}

/// Fully resolved configuration. Immutable once built.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Selected login workflow.
    pub login_mode: LoginMode,
    /// Allow unencrypted token cache storage (advanced mode only).
    pub allow_unencrypted_storage: bool,
    /// Authentication record path (advanced mode only). `None` keeps the
    /// session in memory.
    pub record_path: Option<PathBuf>,
    /// Authority host, e.g. `https://login.microsoftonline.com`.
    pub authority_host: String,
    /// Environment credential settings.
    pub environment: EnvironmentSettings,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            login_mode: LoginMode::default(),
            allow_unencrypted_storage: false,
            record_path: None,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            environment: EnvironmentSettings::default(),
        }
    }
}

/// Layered settings as seen by the `config` crate.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LayeredSettings {
    weblogin: Option<String>,
    allow_unencrypted_storage: Option<bool>,
    credential_path: Option<String>,
    authority_host: Option<String>,
}

/// Returns the azlogin configuration directory.
///
/// Respects the `XDG_CONFIG_HOME` environment variable if set,
/// otherwise defaults to `~/.config/azlogin`.
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    let env: HashMap<String, String> = std::env::vars().collect();
    config_dir_in(&env)
        .or_else(|| dirs::home_dir().map(|home| home.join(".config").join("azlogin")))
}

/// Configuration directory derived from `XDG_CONFIG_HOME` / `HOME` in `env`.
fn config_dir_in(env: &HashMap<String, String>) -> Option<PathBuf> {
    if let Some(xdg_config) = env_value(env, "XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config).join("azlogin"));
    }
    env_value(env, "HOME").map(|home| PathBuf::from(home).join(".config").join("azlogin"))
}

/// Returns the path to the configuration file.
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Returns the cache directory.
///
/// - Linux: `~/.cache/azlogin`
/// - macOS: `~/Library/Caches/azlogin`
/// - Windows: `C:\Users\<User>\AppData\Local\azlogin`
#[must_use]
pub fn cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("azlogin"))
}

/// Resolve configuration from explicit options and the process environment.
///
/// # Errors
///
/// Returns `AuthError::Config` if the login mode is unrecognized or the
/// config file is invalid.
pub fn resolve(options: &ResolveOptions) -> Result<ResolvedConfig, AuthError> {
    let env: HashMap<String, String> = std::env::vars().collect();
    if options.config_file.is_none() && config_dir_in(&env).is_none() {
        // No HOME in the environment (e.g. Windows); ask the platform instead
        let options = ResolveOptions {
            config_file: config_file_path(),
            ..options.clone()
        };
        return resolve_from(&options, &env);
    }
    resolve_from(options, &env)
}

/// Resolve configuration from explicit options and a given environment map.
///
/// Reads nothing from the process environment. The default config file
/// location is derived from `XDG_CONFIG_HOME` / `HOME` in `env`.
#[instrument(skip(env))]
pub fn resolve_from(
    options: &ResolveOptions,
    env: &HashMap<String, String>,
) -> Result<ResolvedConfig, AuthError> {
    // An explicit login mode is validated before touching the config file
    if let Some(ref mode) = options.login_mode {
        mode.parse::<LoginMode>()?;
    }

    let mut builder = Config::builder();

    // Load from config file (optional - may not exist)
    let config_file = options
        .config_file
        .clone()
        .or_else(|| config_dir_in(env).map(|dir| dir.join("config.toml")));
    if let Some(path) = config_file {
        builder =
            builder.add_source(File::with_name(path.to_string_lossy().as_ref()).required(false));
    }

    let settings: LayeredSettings = builder
        // Override with environment variables
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .ignore_empty(true)
                .source(Some(env.clone().into_iter().collect())),
        )
        // Explicit arguments win
        .set_override_option("weblogin", options.login_mode.clone())?
        .set_override_option("credential_path", options.record_path.clone())?
        .set_override_option("allow_unencrypted_storage", options.allow_unencrypted_storage)?
        .build()?
        .try_deserialize()?;

    let login_mode = match settings.weblogin.as_deref() {
        Some(value) => value.parse()?,
        None => LoginMode::default(),
    };

    let record_path = settings
        .credential_path
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);

    let authority_host = env_value(env, "AZURE_AUTHORITY_HOST")
        .or(settings.authority_host)
        .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string())
        .trim_end_matches('/')
        .to_string();

    let config = ResolvedConfig {
        login_mode,
        allow_unencrypted_storage: settings.allow_unencrypted_storage.unwrap_or(false),
        record_path,
        authority_host,
        environment: environment_settings(env),
    };

    debug!(
        login_mode = %config.login_mode,
        allow_unencrypted_storage = config.allow_unencrypted_storage,
        record_path = ?config.record_path,
        "Resolved configuration"
    );
    Ok(config)
}

fn env_value(env: &HashMap<String, String>, key: &str) -> Option<String> {
    env.get(key).filter(|v| !v.is_empty()).cloned()
}

fn environment_settings(env: &HashMap<String, String>) -> EnvironmentSettings {
    let username = env_value(env, "AZURE_USERNAME");
    let password = env_value(env, "AZURE_PASSWORD").map(SecretString::from);
    let mut client_id = env_value(env, "AZURE_CLIENT_ID");
    let mut client_id_defaulted = false;

    // Username/password sign-in needs a client ID. Fall back to the public
    // developer client rather than failing.
    // TODO: revisit once tenants can be expected to register their own public client.
    if client_id.is_none() && username.is_some() && password.is_some() {
        warn!(
            client_id = DEVELOPER_SIGN_ON_CLIENT_ID,
            "AZURE_CLIENT_ID is unset; using the Azure developer client ID for username/password sign-in"
        );
        client_id = Some(DEVELOPER_SIGN_ON_CLIENT_ID.to_string());
        client_id_defaulted = true;
    }

    EnvironmentSettings {
        tenant_id: env_value(env, "AZURE_TENANT_ID"),
        client_id,
        client_secret: env_value(env, "AZURE_CLIENT_SECRET").map(SecretString::from),
        username,
        password,
        client_id_defaulted,
    }
}
