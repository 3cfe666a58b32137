//! Ledger handle

use crate::bulk::BulkInsert;
use crate::models::{Entry, LedgerStatus, NewEntry, Side};
use crate::queries;
use futures::stream::BoxStream;
use futures::{stream, StreamExt, TryStreamExt};
use sqlx::{query, query_as, query_scalar, Pool, Sqlite};
use xfck_errors::{Error, StateError};
use xfck_hash::Hash;

/// Shared handle to the ledger table
///
/// Cloning is cheap; every clone uses the same connection pool.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: Pool<Sqlite>,
    table_name: String,
    table: String,
}

impl Ledger {
    #[must_use]
    pub fn new(pool: Pool<Sqlite>, table_name: &str) -> Self {
        Self {
            pool,
            table_name: table_name.to_string(),
            table: queries::quote_identifier(table_name),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections to return
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Unquoted table name as configured
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Create the table and its filename index if they do not exist
    ///
    /// # Errors
    ///
    /// Returns an error if either statement fails.
    pub async fn ensure_schema(&self) -> Result<(), Error> {
        query(&queries::create_table(&self.table))
            .execute(&self.pool)
            .await
            .map_err(|e| StateError::SchemaFailed {
                message: format!("failed to create table {}: {e}", self.table),
            })?;

        query(&queries::create_filename_index(&self.table_name))
            .execute(&self.pool)
            .await
            .map_err(|e| StateError::SchemaFailed {
                message: format!("failed to create filename index: {e}"),
            })?;

        Ok(())
    }

    /// Number of rows in the ledger
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count(&self) -> Result<u64, Error> {
        let rows: i64 = query_scalar(&queries::count(&self.table))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StateError::DatabaseError {
                message: format!("failed to count rows: {e}"),
            })?;
        Ok(rows as u64)
    }

    /// Open a transactional bulk writer
    ///
    /// Nothing becomes visible until [`BulkInsert::commit`]; dropping the
    /// writer rolls everything back.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started.
    pub async fn begin_bulk_insert(&self, batch_size: usize) -> Result<BulkInsert, Error> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StateError::TransactionFailed {
                message: format!("failed to begin transaction: {e}"),
            })?;
        Ok(BulkInsert::new(tx, self.table.clone(), batch_size))
    }

    /// Insert rows in one all-or-nothing transaction
    ///
    /// # Errors
    ///
    /// Returns an error if any insert or the commit fails; no rows are kept.
    pub async fn bulk_insert<I>(&self, rows: I, batch_size: usize) -> Result<u64, Error>
    where
        I: IntoIterator<Item = NewEntry>,
    {
        let mut writer = self.begin_bulk_insert(batch_size).await?;
        for row in rows {
            writer.push(row).await?;
        }
        writer.commit().await
    }

    /// Reject a filter fragment the database cannot compile
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidFilter`] if the fragment does not compile
    /// against the ledger table.
    pub async fn check_filter(&self, filter: Option<&str>) -> Result<(), Error> {
        let Some(filter) = filter else {
            return Ok(());
        };
        query(&queries::filter_check(&self.table, filter))
            .execute(&self.pool)
            .await
            .map_err(|e| StateError::InvalidFilter {
                message: format!("`{filter}`: {e}"),
            })?;
        Ok(())
    }

    /// Filenames still missing `side`'s digest, optionally narrowed by `filter`
    #[must_use]
    pub fn select_pending(&self, side: Side, filter: Option<&str>) -> PendingQuery<'_> {
        PendingQuery {
            pool: &self.pool,
            sql: queries::select_pending(&self.table, side, filter),
            page_size: PENDING_PAGE_SIZE,
        }
    }

    /// Record a digest for one file
    ///
    /// Returns `false` when no row changed: the filename is unknown or the
    /// column was already set.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn set_hash(&self, filename: &str, side: Side, hash: &Hash) -> Result<bool, Error> {
        let result = query(&queries::set_hash(&self.table, side))
            .bind(hash.to_hex())
            .bind(filename)
            .execute(&self.pool)
            .await
            .map_err(|e| StateError::DatabaseError {
                message: format!("failed to set {} for {filename}: {e}", side.column()),
            })?;
        Ok(result.rows_affected() > 0)
    }

    /// Look up one row
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn entry(&self, filename: &str) -> Result<Option<Entry>, Error> {
        query_as::<_, Entry>(&queries::select_entry(&self.table))
            .bind(filename)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                StateError::DatabaseError {
                    message: format!("failed to load {filename}: {e}"),
                }
                .into()
            })
    }

    /// Every row, ordered by filename
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn entries(&self) -> Result<Vec<Entry>, Error> {
        query_as::<_, Entry>(&queries::select_entries(&self.table))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                StateError::DatabaseError {
                    message: format!("failed to load entries: {e}"),
                }
                .into()
            })
    }

    /// Progress counters, optionally restricted by `filter`
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn status(&self, filter: Option<&str>) -> Result<LedgerStatus, Error> {
        let (total, pending_new, pending_old, hashed_both): (i64, i64, i64, i64) =
            query_as(&queries::status(&self.table, filter))
                .fetch_one(&self.pool)
                .await
                .map_err(|e| StateError::DatabaseError {
                    message: format!("failed to compute status: {e}"),
                })?;

        Ok(LedgerStatus {
            total: total as u64,
            pending_new: pending_new as u64,
            pending_old: pending_old as u64,
            hashed_both: hashed_both as u64,
        })
    }
}

/// Rows fetched per pending-query page
pub const PENDING_PAGE_SIZE: usize = 1000;

/// A prepared pending-row query
///
/// Rows are read in keyset pages ordered by rowid. Each page is a separate
/// short read, so no snapshot stays open while workers commit updates and
/// WAL checkpoints can keep up.
pub struct PendingQuery<'a> {
    pool: &'a Pool<Sqlite>,
    sql: String,
    page_size: usize,
}

struct PageCursor<'a> {
    query: PendingQuery<'a>,
    after: i64,
    done: bool,
}

impl PageCursor<'_> {
    async fn advance(mut self) -> Result<Option<(Vec<(i64, String)>, Self)>, Error> {
        if self.done {
            return Ok(None);
        }
        let page = self.query.page(self.after).await?;
        self.done = page.len() < self.query.page_size;
        if let Some((rowid, _)) = page.last() {
            self.after = *rowid;
        }
        Ok(Some((page, self)))
    }
}

impl<'a> PendingQuery<'a> {
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Override [`PENDING_PAGE_SIZE`]
    #[must_use]
    pub fn page_size(mut self, rows: usize) -> Self {
        self.page_size = rows.max(1);
        self
    }

    async fn page(&self, after: i64) -> Result<Vec<(i64, String)>, Error> {
        let limit = i64::try_from(self.page_size).unwrap_or(i64::MAX);
        query_as::<_, (i64, String)>(&self.sql)
            .bind(after)
            .bind(limit)
            .fetch_all(self.pool)
            .await
            .map_err(|e| {
                StateError::DatabaseError {
                    message: format!("pending query failed: {e}"),
                }
                .into()
            })
    }

    /// Stream matching filenames, one page at a time
    ///
    /// A connection is only held while a page is being read. Rows that get
    /// hashed while the stream runs are not returned again.
    pub fn fetch(self) -> BoxStream<'a, Result<String, Error>> {
        let cursor = PageCursor {
            query: self,
            after: i64::MIN,
            done: false,
        };

        stream::try_unfold(cursor, PageCursor::advance)
            .map_ok(|page| {
                stream::iter(
                    page.into_iter()
                        .map(|(_, filename)| Ok::<_, Error>(filename)),
                )
            })
            .try_flatten()
            .boxed()
    }
}
