//! Keybase configuration.
//!
//! Values come from defaults, then environment variables, then CLI flags.

use std::env;
use std::path::PathBuf;

use crate::crypto::ppk::{is_valid_scrypt_log_n, DEFAULT_SCRYPT_LOG_N, MAX_SCRYPT_LOG_N};
use crate::error::{KeybaseError, Result};
use crate::storage::file::STORE_FILENAME;

/// Environment variable overriding the store file path.
pub const ENV_STORE_PATH: &str = "KEYBASE_STORE_PATH";

/// Environment variable overriding the PPK scrypt cost.
pub const ENV_PPK_SCRYPT_LOG_N: &str = "KEYBASE_PPK_SCRYPT_LOG_N";

/// Environment variable holding the log filter.
pub const ENV_LOG_FILTER: &str = "RUST_LOG";

/// Default log filter.
pub const DEFAULT_LOG_FILTER: &str = "keybase=info";

/// Settings for opening a file-backed keybase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeybaseConfig {
    /// Path of the JSON store file.
    pub store_path: PathBuf,

    /// scrypt cost (log2 N) used when exporting PPKs.
    pub ppk_scrypt_log_n: u8,

    /// `tracing-subscriber` filter directive.
    pub log_filter: String,
}

impl Default for KeybaseConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(STORE_FILENAME),
            ppk_scrypt_log_n: DEFAULT_SCRYPT_LOG_N,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl KeybaseConfig {
    /// Defaults overridden by any environment variables that are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_STORE_PATH) {
            config.store_path = PathBuf::from(path);
        }

        if let Some(raw) = lookup(ENV_PPK_SCRYPT_LOG_N) {
            config.ppk_scrypt_log_n = parse_scrypt_log_n(&raw)?;
        }

        if let Some(filter) = lookup(ENV_LOG_FILTER) {
            config.log_filter = filter;
        }

        Ok(config)
    }
}

fn parse_scrypt_log_n(raw: &str) -> Result<u8> {
    match raw.trim().parse::<u8>() {
        Ok(log_n) if is_valid_scrypt_log_n(log_n) => Ok(log_n),
        _ => Err(KeybaseError::ConfigError(format!(
            "{} must be an integer in 1..={}, got '{}'",
            ENV_PPK_SCRYPT_LOG_N, MAX_SCRYPT_LOG_N, raw
        ))),
    }
}
