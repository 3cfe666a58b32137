//! Transactional batched inserts for the enumeration pass

use crate::models::NewEntry;
use crate::queries;
use sqlx::{QueryBuilder, Sqlite, Transaction};
use xfck_errors::{Error, StateError};

/// Buffers discovered files and writes them in multi-row inserts
///
/// All batches share one transaction. Dropping the writer without calling
/// [`BulkInsert::commit`] discards every row written so far.
pub struct BulkInsert {
    tx: Transaction<'static, Sqlite>,
    table: String,
    batch: Vec<NewEntry>,
    batch_size: usize,
    inserted: u64,
}

impl BulkInsert {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>, table: String, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            tx,
            table,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            inserted: 0,
        }
    }

    /// Stage one row, writing the batch once it is full
    ///
    /// # Errors
    ///
    /// Returns an error if writing a full batch fails.
    pub async fn push(&mut self, entry: NewEntry) -> Result<(), Error> {
        self.batch.push(entry);
        if self.batch.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), Error> {
        if self.batch.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(queries::insert_head(&self.table));
        builder.push_values(self.batch.drain(..), |mut row, entry| {
            row.push_bind(entry.filename)
                .push_bind(entry.size)
                .push_bind(entry.changed);
        });

        let result = builder
            .build()
            .execute(&mut *self.tx)
            .await
            .map_err(|e| StateError::TransactionFailed {
                message: format!("bulk insert failed: {e}"),
            })?;
        self.inserted += result.rows_affected();
        Ok(())
    }

    /// Write any remaining rows and commit
    ///
    /// Returns the number of rows inserted.
    ///
    /// # Errors
    ///
    /// Returns an error if the final batch or the commit fails.
    pub async fn commit(mut self) -> Result<u64, Error> {
        self.flush().await?;
        let inserted = self.inserted;
        self.tx
            .commit()
            .await
            .map_err(|e| StateError::TransactionFailed {
                message: format!("commit failed: {e}"),
            })?;
        Ok(inserted)
    }

    /// Discard everything written so far
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback itself fails.
    pub async fn rollback(self) -> Result<(), Error> {
        self.tx
            .rollback()
            .await
            .map_err(|e| {
                StateError::TransactionFailed {
                    message: format!("rollback failed: {e}"),
                }
                .into()
            })
    }
}
