#![forbid(unsafe_code)]

use super::StoreError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const STORAGE_DIR_ENV: &str = "STORYBRANCH_STORAGE_DIR";
pub const DB_FILE_ENV: &str = "STORYBRANCH_DB_FILE";
pub const BUSY_TIMEOUT_ENV: &str = "STORYBRANCH_BUSY_TIMEOUT_MS";

const DEFAULT_DB_FILE_NAME: &str = "storybranch.db";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    pub storage_dir: PathBuf,
    #[serde(default = "default_db_file_name")]
    pub db_file_name: String,
    /// How long a write waits on a locked database before failing as transient.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            db_file_name: default_db_file_name(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    pub fn from_env() -> Result<Self, StoreError> {
        let storage_dir = std::env::var_os(STORAGE_DIR_ENV)
            .filter(|value| !value.is_empty())
            .ok_or(StoreError::InvalidInput("STORYBRANCH_STORAGE_DIR is not set"))?;
        let mut config = Self::new(storage_dir);

        if let Ok(raw) = std::env::var(DB_FILE_ENV)
            && !raw.trim().is_empty()
        {
            config.db_file_name = raw.trim().to_string();
        }
        if let Ok(raw) = std::env::var(BUSY_TIMEOUT_ENV)
            && !raw.trim().is_empty()
        {
            config.busy_timeout_ms = raw.trim().parse().map_err(|_| {
                StoreError::InvalidInput("STORYBRANCH_BUSY_TIMEOUT_MS must be an integer")
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.storage_dir.as_os_str().is_empty() {
            return Err(StoreError::InvalidInput("storage_dir must not be empty"));
        }
        let name = self.db_file_name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidInput("db_file_name must not be empty"));
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(StoreError::InvalidInput(
                "db_file_name must be a plain file name",
            ));
        }
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join(self.db_file_name.trim())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

fn default_db_file_name() -> String {
    DEFAULT_DB_FILE_NAME.to_string()
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}
