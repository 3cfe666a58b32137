//! Phase orchestration

use crate::context::VerifyContext;
use crate::enumerate::enumerate;
use crate::hash_pool::hash_side;
use crate::types::{PipelineOptions, PipelineReport};
use tracing::{info, warn};
use xfck_errors::Error;
use xfck_ledger::{Ledger, LedgerStatus, Side};

/// Run enumerate, then the destination hash phase, then the source hash phase
///
/// Enumeration only happens when the ledger is empty. Each hash phase only
/// touches rows whose column is still null, so running this again after an
/// interruption picks up where the last run stopped.
///
/// # Errors
///
/// Returns an error for a filter the ledger rejects, or the first fatal
/// phase error. Phases after it do not run.
pub async fn run_pipeline(
    ctx: &VerifyContext,
    options: &PipelineOptions,
) -> Result<PipelineReport, Error> {
    ctx.ledger.ensure_schema().await?;
    ctx.ledger.check_filter(ctx.filter()).await?;

    let existing = ctx.ledger.count().await?;
    let enumeration = if existing == 0 {
        info!("empty ledger, starting file walk");
        Some(enumerate(ctx).await?)
    } else {
        info!(rows = existing, "ledger already populated, skipping file walk");
        None
    };

    let mut phases = Vec::with_capacity(Side::ALL.len());
    for side in Side::ALL {
        if !options.runs(side) {
            info!(side = %side, "skipping {} hash phase", side.describe());
            continue;
        }
        let report = hash_side(ctx, side).await?;
        if !report.is_clean() {
            warn!(
                side = %side,
                failed = report.failed,
                "some files could not be hashed and remain pending"
            );
        }
        phases.push(report);
    }

    let status = ctx.ledger.status(ctx.filter()).await?;
    info!(
        total = status.total,
        pending_new = status.pending_new,
        pending_old = status.pending_old,
        "run complete"
    );

    Ok(PipelineReport {
        enumeration,
        phases,
        status,
    })
}

/// Progress counters, optionally restricted by `filter`
///
/// Reads only the ledger; neither tree needs to be reachable.
///
/// # Errors
///
/// Returns an error if the schema cannot be created, the filter is rejected
/// or the query fails.
pub async fn ledger_status(ledger: &Ledger, filter: Option<&str>) -> Result<LedgerStatus, Error> {
    ledger.ensure_schema().await?;
    ledger.check_filter(filter).await?;
    ledger.status(filter).await
}
