#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(
    clippy::needless_raw_string_hashes,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_panics_doc
)]
#![allow(clippy::module_name_repetitions)]

//! Durable ledger of files and their content hashes
//!
//! One table, one row per relative filename. The enumerator fills it once;
//! the two hash phases each fill one nullable hash column. Everything the
//! pipeline knows about progress lives here, so a rerun resumes by asking
//! which rows are still null.

pub mod bulk;
pub mod ledger;
pub mod models;
pub mod queries;

pub use bulk::BulkInsert;
pub use ledger::{Ledger, PendingQuery, PENDING_PAGE_SIZE};
pub use models::{Entry, LedgerStatus, NewEntry, Side};
pub use queries::quote_identifier;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Connection, Pool, Sqlite};
use std::time::Duration;
use xfck_config::LedgerConfig;
use xfck_errors::{ConfigError, Error, StateError};

/// WAL file size the store truncates back to after a checkpoint
const JOURNAL_SIZE_LIMIT_BYTES: u64 = 64 * 1024 * 1024;

/// Create the `SQLite` connection pool backing the ledger
///
/// The database file is created when missing and one connection is pinged
/// before the pool is handed out.
///
/// # Errors
///
/// Returns an error if no database path is configured or the connection fails.
pub async fn create_pool(config: &LedgerConfig) -> Result<Pool<Sqlite>, Error> {
    let db_path = config
        .database
        .as_deref()
        .ok_or_else(|| ConfigError::MissingField {
            field: "ledger.database".to_string(),
        })?;

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
        .pragma("journal_size_limit", JOURNAL_SIZE_LIMIT_BYTES.to_string());

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_idle_connections)
        .connect_with(options)
        .await
        .map_err(|e| StateError::ConnectionFailed {
            message: format!("{}: {e}", db_path.display()),
        })?;

    let mut conn = pool
        .acquire()
        .await
        .map_err(|e| StateError::ConnectionFailed {
            message: e.to_string(),
        })?;
    conn.ping()
        .await
        .map_err(|e| StateError::ConnectionFailed {
            message: format!("ping failed: {e}"),
        })?;

    tracing::debug!(
        database = %db_path.display(),
        max_connections = config.max_connections,
        "ledger pool ready"
    );
    Ok(pool)
}
