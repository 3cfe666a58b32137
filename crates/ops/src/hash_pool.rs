//! Hash worker pool for one side of the ledger
//!
//! The producer streams pending filenames from the ledger into a bounded
//! channel; `hash_workers` tasks pull from it, hash the file under the
//! side's root and record the digest. A file that cannot be read is logged
//! and left pending so the next run retries it.

use crate::context::VerifyContext;
use crate::types::HashPhaseReport;
use futures::TryStreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use xfck_errors::{Error, OpsError};
use xfck_hash::Hash;
use xfck_ledger::{Ledger, Side};

#[derive(Debug, Default)]
struct PhaseCounters {
    queued: AtomicU64,
    hashed: AtomicU64,
    failed: AtomicU64,
    unchanged: AtomicU64,
}

/// Hash every pending file on `side`
///
/// Returns once the pending query is exhausted and every queued file has
/// been processed. Per-file failures are counted in the report, not
/// returned.
///
/// # Errors
///
/// Returns an error if the pending query fails or a worker task panics.
pub async fn hash_side(ctx: &VerifyContext, side: Side) -> Result<HashPhaseReport, Error> {
    let started = Instant::now();
    let workers = ctx.workers.hash_workers.max(1);
    let root = Arc::new(ctx.root(side).to_path_buf());
    let counters = Arc::new(PhaseCounters::default());

    let (tx, rx) = mpsc::channel::<String>(workers);
    let rx = Arc::new(Mutex::new(rx));

    let mut tasks = JoinSet::new();
    for worker_id in 0..workers {
        tasks.spawn(hash_worker(
            worker_id,
            side,
            ctx.ledger.clone(),
            Arc::clone(&root),
            Arc::clone(&rx),
            Arc::clone(&counters),
        ));
    }
    drop(rx);

    info!(side = %side, root = %root.display(), workers, "starting {} hash phase", side.describe());

    let produced = produce(&ctx.ledger, side, ctx.filter(), tx, &counters).await;

    let mut worker_error: Option<Error> = None;
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            worker_error.get_or_insert_with(|| {
                OpsError::WorkerFailed {
                    message: format!("{side} hash worker failed: {e}"),
                }
                .into()
            });
        }
    }

    produced?;
    if let Some(e) = worker_error {
        return Err(e);
    }

    let report = HashPhaseReport {
        side,
        queued: counters.queued.load(Ordering::Relaxed),
        hashed: counters.hashed.load(Ordering::Relaxed),
        failed: counters.failed.load(Ordering::Relaxed),
        unchanged: counters.unchanged.load(Ordering::Relaxed),
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };
    info!(
        side = %side,
        hashed = report.hashed,
        failed = report.failed,
        unchanged = report.unchanged,
        "{} hash phase done",
        side.describe()
    );
    Ok(report)
}

/// Feed pending filenames to the workers until the query is exhausted
///
/// Dropping `tx` on return is what lets idle workers shut down.
async fn produce(
    ledger: &Ledger,
    side: Side,
    filter: Option<&str>,
    tx: mpsc::Sender<String>,
    counters: &PhaseCounters,
) -> Result<(), Error> {
    let pending = ledger.select_pending(side, filter);
    info!(side = %side, sql = pending.sql(), "querying pending files");

    let mut rows = pending.fetch();
    while let Some(filename) = rows.try_next().await? {
        if tx.send(filename).await.is_err() {
            return Err(OpsError::ChannelClosed {
                channel: format!("{side} hash queue"),
            }
            .into());
        }
        counters.queued.fetch_add(1, Ordering::Relaxed);
    }
    Ok(())
}

async fn hash_worker(
    worker_id: usize,
    side: Side,
    ledger: Ledger,
    root: Arc<PathBuf>,
    rx: Arc<Mutex<mpsc::Receiver<String>>>,
    counters: Arc<PhaseCounters>,
) {
    loop {
        // Lock only for the receive so other workers can pick up work
        let next = rx.lock().await.recv().await;
        let Some(filename) = next else {
            break;
        };

        match hash_one(&ledger, side, &root, &filename).await {
            Ok(true) => {
                counters.hashed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => {
                debug!(worker_id, side = %side, filename, "hash already recorded");
                counters.unchanged.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(worker_id, side = %side, filename, error = %e, "failed to hash file");
                counters.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
    debug!(worker_id, side = %side, "hash worker exiting");
}

async fn hash_one(ledger: &Ledger, side: Side, root: &Path, filename: &str) -> Result<bool, Error> {
    let path = source_path(root, filename);
    let hash = Hash::hash_file(&path).await?;
    ledger.set_hash(filename, side, &hash).await
}

/// Ledger filenames are `/`-separated and resolved under `root`
fn source_path(root: &Path, filename: &str) -> PathBuf {
    root.join(filename.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_path_joins_under_root() {
        let root = Path::new("/data/old");
        assert_eq!(
            source_path(root, "sub/b.txt"),
            PathBuf::from("/data/old/sub/b.txt")
        );
        assert_eq!(
            source_path(root, "/a.txt"),
            PathBuf::from("/data/old/a.txt")
        );
    }
}
