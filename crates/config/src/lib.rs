#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for xfck
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (`./xfck.toml`, or a legacy flat `.json` file)
//! - Environment variables
//! - CLI flags (applied by the binary)

pub mod constants;
mod legacy;

use constants::{
    DEFAULT_BUSY_TIMEOUT_SECS, DEFAULT_CONFIG_FILE, DEFAULT_HASH_WORKERS,
    DEFAULT_INSERT_BATCH_SIZE, DEFAULT_MAX_CONNECTIONS, DEFAULT_MIN_IDLE_CONNECTIONS,
    DEFAULT_TABLE_NAME, DEFAULT_WALK_WORKERS, MAX_INSERT_BATCH_SIZE,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use xfck_errors::{ConfigError, Error, StorageError};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub workers: WorkerConfig,
}

/// Tree roots
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Destination tree; enumeration walks this one
    pub new_path: Option<PathBuf>,
    /// Source tree the destination was copied from
    pub old_path: Option<PathBuf>,
}

/// Ledger store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub database: Option<PathBuf>,
    #[serde(default = "default_table_name")]
    pub table_name: String,
    /// Raw SQL predicate narrowing the pending-row queries
    #[serde(default)]
    pub where_clause: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_idle_connections")]
    pub min_idle_connections: u32,
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

/// Concurrency configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Hash pool size, also the work queue capacity
    #[serde(default = "default_hash_workers")]
    pub hash_workers: usize,
    #[serde(default = "default_walk_workers")]
    pub walk_workers: usize,
    #[serde(default = "default_insert_batch_size")]
    pub insert_batch_size: usize,
}

// Default implementations

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database: None,
            table_name: default_table_name(),
            where_clause: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_idle_connections: DEFAULT_MIN_IDLE_CONNECTIONS,
            busy_timeout_secs: DEFAULT_BUSY_TIMEOUT_SECS,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            hash_workers: DEFAULT_HASH_WORKERS,
            walk_workers: DEFAULT_WALK_WORKERS,
            insert_batch_size: DEFAULT_INSERT_BATCH_SIZE,
        }
    }
}

// Default value functions for serde
fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_min_idle_connections() -> u32 {
    DEFAULT_MIN_IDLE_CONNECTIONS
}

fn default_busy_timeout_secs() -> u64 {
    DEFAULT_BUSY_TIMEOUT_SECS
}

fn default_hash_workers() -> usize {
    DEFAULT_HASH_WORKERS
}

fn default_walk_workers() -> usize {
    DEFAULT_WALK_WORKERS
}

fn default_insert_batch_size() -> usize {
    DEFAULT_INSERT_BATCH_SIZE
}

impl LedgerConfig {
    /// Check the store settings on their own
    ///
    /// Commands that only read the ledger need nothing else.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), Error> {
        required(self.database.as_deref(), "ledger.database")?;

        if self.table_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ledger.table_name".to_string(),
                value: self.table_name.clone(),
            }
            .into());
        }

        // A pending page read and worker updates need connections at the same time
        if self.max_connections < 2 {
            return Err(ConfigError::InvalidValue {
                field: "ledger.max_connections".to_string(),
                value: self.max_connections.to_string(),
            }
            .into());
        }

        if self.min_idle_connections > self.max_connections {
            return Err(ConfigError::Invalid {
                message: format!(
                    "ledger.min_idle_connections ({}) exceeds ledger.max_connections ({})",
                    self.min_idle_connections, self.max_connections
                ),
            }
            .into());
        }

        Ok(())
    }

    /// The filter fragment, if one is set and not blank
    #[must_use]
    pub fn filter(&self) -> Option<&str> {
        self.where_clause
            .as_deref()
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
    }
}

impl Config {
    /// Default config file path, relative to the working directory
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Parse configuration text
    ///
    /// `json` selects the legacy flat layout; otherwise the text is TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be parsed, or if a legacy
    /// `db_connstr` names something other than a SQLite database.
    pub fn parse(contents: &str, json: bool) -> Result<Self, Error> {
        if json {
            let legacy: legacy::LegacyConfig = serde_json::from_str(contents)?;
            legacy.try_into()
        } else {
            Ok(toml::from_str(contents)?)
        }
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its contents cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path).await.map_err(|e| -> Error {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.display().to_string(),
                }
                .into()
            } else {
                StorageError::from_io_with_path(&e, path).into()
            }
        })?;

        let json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        tracing::debug!(path = %path.display(), json, "loading configuration");
        Self::parse(&contents, json)
    }

    /// Load configuration from an optional path or use default
    ///
    /// An explicit path must exist. Without one, `./xfck.toml` is used when
    /// present and built-in defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => {
                let default_path = Self::default_path();
                if fs::try_exists(&default_path).await.unwrap_or(false) {
                    Self::load_from_file(&default_path).await
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric environment variable cannot be parsed.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Ok(path) = std::env::var(constants::ENV_NEW_PATH) {
            self.paths.new_path = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var(constants::ENV_OLD_PATH) {
            self.paths.old_path = Some(PathBuf::from(path));
        }

        if let Ok(db) = std::env::var(constants::ENV_DATABASE) {
            self.ledger.database = Some(PathBuf::from(db));
        }

        if let Ok(table) = std::env::var(constants::ENV_TABLE) {
            self.ledger.table_name = table;
        }

        if let Ok(clause) = std::env::var(constants::ENV_WHERE) {
            self.ledger.where_clause = Some(clause);
        }

        if let Ok(workers) = std::env::var(constants::ENV_HASH_WORKERS) {
            self.workers.hash_workers =
                workers.parse().map_err(|_| ConfigError::InvalidValue {
                    field: constants::ENV_HASH_WORKERS.to_string(),
                    value: workers,
                })?;
        }

        if let Ok(workers) = std::env::var(constants::ENV_WALK_WORKERS) {
            self.workers.walk_workers =
                workers.parse().map_err(|_| ConfigError::InvalidValue {
                    field: constants::ENV_WALK_WORKERS.to_string(),
                    value: workers,
                })?;
        }

        Ok(())
    }

    /// Check that the configuration is complete and internally consistent
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), Error> {
        self.new_path()?;
        self.old_path()?;
        self.ledger.validate()?;

        for (field, value) in [
            ("workers.hash_workers", self.workers.hash_workers),
            ("workers.walk_workers", self.workers.walk_workers),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                }
                .into());
            }
        }

        if self.workers.insert_batch_size == 0
            || self.workers.insert_batch_size > MAX_INSERT_BATCH_SIZE
        {
            return Err(ConfigError::InvalidValue {
                field: "workers.insert_batch_size".to_string(),
                value: self.workers.insert_batch_size.to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Destination tree root
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not configured.
    pub fn new_path(&self) -> Result<&Path, Error> {
        required(self.paths.new_path.as_deref(), "paths.new_path")
    }

    /// Source tree root
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not configured.
    pub fn old_path(&self) -> Result<&Path, Error> {
        required(self.paths.old_path.as_deref(), "paths.old_path")
    }

    /// Ledger database file
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not configured.
    pub fn database(&self) -> Result<&Path, Error> {
        required(self.ledger.database.as_deref(), "ledger.database")
    }
}

fn required<'a>(value: Option<&'a Path>, field: &str) -> Result<&'a Path, Error> {
    value.ok_or_else(|| {
        ConfigError::MissingField {
            field: field.to_string(),
        }
        .into()
    })
}
