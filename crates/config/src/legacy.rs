//! Flat JSON layout used by older deployments
//!
//! ```json
//! { "new_path": "...", "old_path": "...", "db_connstr": "...",
//!   "table_name": "...", "where_clause": "...",
//!   "db_maxconnections": 16, "db_idleconnections": 2 }
//! ```

use crate::{Config, LedgerConfig, PathConfig, WorkerConfig};
use serde::Deserialize;
use std::path::PathBuf;
use xfck_errors::{ConfigError, Error};

#[derive(Debug, Deserialize)]
pub(crate) struct LegacyConfig {
    new_path: Option<PathBuf>,
    old_path: Option<PathBuf>,
    db_connstr: Option<String>,
    table_name: Option<String>,
    where_clause: Option<String>,
    db_maxconnections: Option<u32>,
    db_idleconnections: Option<u32>,
}

impl TryFrom<LegacyConfig> for Config {
    type Error = Error;

    fn try_from(legacy: LegacyConfig) -> Result<Self, Error> {
        let database = match legacy.db_connstr.as_deref().map(str::trim) {
            Some(connstr) if !connstr.is_empty() => Some(sqlite_path(connstr)?),
            _ => None,
        };
        let mut ledger = LedgerConfig {
            database,
            where_clause: legacy.where_clause,
            ..LedgerConfig::default()
        };
        if let Some(table) = legacy.table_name {
            ledger.table_name = table;
        }
        if let Some(max) = legacy.db_maxconnections {
            ledger.max_connections = max;
        }
        if let Some(idle) = legacy.db_idleconnections {
            ledger.min_idle_connections = idle;
        }

        Ok(Self {
            paths: PathConfig {
                new_path: legacy.new_path,
                old_path: legacy.old_path,
            },
            ledger,
            workers: WorkerConfig::default(),
        })
    }
}

/// Database file named by a `sqlite:` URL or a plain path
///
/// Connection strings for other servers (`postgres://...`,
/// `host=... dbname=...`) are rejected rather than taken as a file name.
fn sqlite_path(connstr: &str) -> Result<PathBuf, Error> {
    if let Some(path) = connstr
        .strip_prefix("sqlite://")
        .or_else(|| connstr.strip_prefix("sqlite:"))
    {
        return Ok(PathBuf::from(path));
    }

    if connstr.contains("://") || connstr.contains('=') {
        return Err(ConfigError::InvalidValue {
            field: "db_connstr".to_string(),
            value: connstr.to_string(),
        }
        .into());
    }
    Ok(PathBuf::from(connstr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_is_stripped() {
        assert_eq!(
            sqlite_path("sqlite:///var/lib/x.db").unwrap(),
            PathBuf::from("/var/lib/x.db")
        );
        assert_eq!(sqlite_path("sqlite:x.db").unwrap(), PathBuf::from("x.db"));
        assert_eq!(sqlite_path("/plain.db").unwrap(), PathBuf::from("/plain.db"));
    }

    #[test]
    fn test_server_connstr_rejected() {
        for connstr in [
            "postgres://user@host/db",
            "postgresql://host:5432/files?sslmode=disable",
            "host=db.internal dbname=files user=check",
        ] {
            match sqlite_path(connstr) {
                Err(Error::Config(ConfigError::InvalidValue { field, value })) => {
                    assert_eq!(field, "db_connstr");
                    assert_eq!(value, connstr);
                }
                other => panic!("{connstr}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_missing_numbers_keep_defaults() {
        let legacy: LegacyConfig =
            serde_json::from_str(r#"{"new_path": "/n", "old_path": "/o"}"#).unwrap();
        let config = Config::try_from(legacy).unwrap();
        assert_eq!(
            config.ledger.max_connections,
            crate::constants::DEFAULT_MAX_CONNECTIONS
        );
        assert_eq!(config.ledger.table_name, "files");
        assert!(config.ledger.database.is_none());
    }
}
