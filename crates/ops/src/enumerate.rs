//! Population pass over the destination tree
//!
//! A fixed set of walker tasks drain a shared directory queue. Each walker
//! reads one directory at a time, queues its subdirectories and streams
//! regular files to a single writer task that owns the ledger transaction.
//! The transaction commits only if every directory was read; any traversal
//! error aborts the walk and rolls back, leaving the ledger empty.

use crate::context::VerifyContext;
use crate::dir_queue::DirQueue;
use crate::types::EnumerationReport;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};
use xfck_errors::{Error, OpsError, StorageError};
use xfck_ledger::{BulkInsert, NewEntry};

#[derive(Debug, Default)]
struct WalkCounters {
    directories: AtomicU64,
    skipped: AtomicU64,
}

/// Walk the destination root and insert one row per regular file
///
/// Callers are expected to run this only against an empty ledger; nothing
/// here prevents duplicate rows.
///
/// # Errors
///
/// Returns an error if the root or any directory below it cannot be read,
/// if a filename is not valid UTF-8, or if the ledger write fails. In every
/// error case the transaction is rolled back.
pub async fn enumerate(ctx: &VerifyContext) -> Result<EnumerationReport, Error> {
    let started = Instant::now();
    let root = ctx.new_root.clone();

    let root_meta = fs::metadata(&root)
        .await
        .map_err(|e| StorageError::from_io_with_path(&e, &root))?;
    if !root_meta.is_dir() {
        return Err(StorageError::DirectoryNotFound { path: root }.into());
    }

    let batch_size = ctx.workers.insert_batch_size.max(1);
    let writer = ctx.ledger.begin_bulk_insert(batch_size).await?;
    let (row_tx, row_rx) = mpsc::channel::<NewEntry>(batch_size * 2);
    let writer_handle = tokio::spawn(write_rows(writer, row_rx));

    let queue = Arc::new(DirQueue::new(root.clone()));
    let counters = Arc::new(WalkCounters::default());
    let root = Arc::new(root);

    let walkers = ctx.workers.walk_workers.max(1);
    info!(root = %root.display(), walkers, "starting file walk");

    let mut tasks = JoinSet::new();
    for _ in 0..walkers {
        tasks.spawn(walker(
            Arc::clone(&root),
            Arc::clone(&queue),
            row_tx.clone(),
            Arc::clone(&counters),
        ));
    }
    drop(row_tx);

    let mut walk_error: Option<Error> = None;
    while let Some(joined) = tasks.join_next().await {
        let result = joined.map_err(|e| {
            Error::from(OpsError::WorkerFailed {
                message: format!("walker task failed: {e}"),
            })
        });
        if let Err(e) | Ok(Err(e)) = result {
            queue.abort();
            walk_error.get_or_insert(e);
        }
    }

    let writer = writer_handle
        .await
        .map_err(|e| OpsError::WorkerFailed {
            message: format!("ledger writer task failed: {e}"),
        })??;

    if let Some(e) = walk_error {
        warn!(error = %e, "file walk aborted, rolling back enumeration");
        writer.rollback().await?;
        return Err(e);
    }

    let inserted = writer.commit().await?;
    let report = EnumerationReport {
        directories: counters.directories.load(Ordering::Relaxed),
        files: inserted,
        skipped: counters.skipped.load(Ordering::Relaxed),
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };
    info!(
        directories = report.directories,
        files = report.files,
        skipped = report.skipped,
        "walk done"
    );
    Ok(report)
}

/// Drain the row channel into the transaction
async fn write_rows(
    mut writer: BulkInsert,
    mut rows: mpsc::Receiver<NewEntry>,
) -> Result<BulkInsert, Error> {
    while let Some(row) = rows.recv().await {
        writer.push(row).await?;
    }
    Ok(writer)
}

async fn walker(
    root: Arc<PathBuf>,
    queue: Arc<DirQueue>,
    rows: mpsc::Sender<NewEntry>,
    counters: Arc<WalkCounters>,
) -> Result<(), Error> {
    while let Some(dir) = queue.next().await {
        let result = walk_dir(&root, &dir, &queue, &rows, &counters).await;
        queue.finish();
        if let Err(e) = result {
            queue.abort();
            return Err(e);
        }
    }
    Ok(())
}

/// Read one directory: queue subdirectories, stage regular files
async fn walk_dir(
    root: &Path,
    dir: &Path,
    queue: &DirQueue,
    rows: &mpsc::Sender<NewEntry>,
    counters: &WalkCounters,
) -> Result<(), Error> {
    let io_err =
        |e: std::io::Error, path: &Path| Error::from(StorageError::from_io_with_path(&e, path));

    let mut entries = fs::read_dir(dir).await.map_err(|e| io_err(e, dir))?;
    counters.directories.fetch_add(1, Ordering::Relaxed);
    trace!(dir = %dir.display(), "reading directory");

    while let Some(entry) = entries.next_entry().await.map_err(|e| io_err(e, dir))? {
        let path = entry.path();
        // Does not follow symlinks
        let file_type = entry.file_type().await.map_err(|e| io_err(e, &path))?;

        if file_type.is_dir() {
            queue.push(path);
        } else if file_type.is_file() {
            let metadata = entry.metadata().await.map_err(|e| io_err(e, &path))?;
            let changed: DateTime<Utc> = metadata
                .modified()
                .map_err(|e| io_err(e, &path))?
                .into();
            let size = i64::try_from(metadata.len()).map_err(|_| StorageError::CorruptedData {
                message: format!("{}: size {} out of range", path.display(), metadata.len()),
            })?;

            let row = NewEntry {
                filename: relative_name(root, &path)?,
                size,
                changed,
            };
            rows.send(row).await.map_err(|_| OpsError::ChannelClosed {
                channel: "ledger writer".to_string(),
            })?;
        } else {
            debug!(path = %path.display(), "skipping non-regular entry");
            counters.skipped.fetch_add(1, Ordering::Relaxed);
        }
    }

    Ok(())
}

/// `path` relative to `root`, `/`-separated
fn relative_name(root: &Path, path: &Path) -> Result<String, Error> {
    let invalid = || {
        Error::from(StorageError::InvalidPath {
            path: path.display().to_string(),
        })
    };

    let relative = path.strip_prefix(root).map_err(|_| invalid())?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str().ok_or_else(invalid)?),
            _ => return Err(invalid()),
        }
    }
    if parts.is_empty() {
        return Err(invalid());
    }
    Ok(parts.join("/"))
}
