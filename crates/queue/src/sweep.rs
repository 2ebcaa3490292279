//! Generic background-sweep driver.
//!
//! Every sweep — Abandoned, ScheduleNodes, UnblockedBySchedule,
//! RegenerateScheduleRecurring, StalledExecutions, MissedSchedulesCatchall —
//! shares the same shape: cheap preflight, transaction-scoped advisory
//! lock, a `SweepRun` audit row, batches of work with per-item error
//! isolation. `SweepRunner` is that shared shape; each concrete sweep in
//! `engine::sweeps` supplies the preflight check and the batch body.

use async_trait::async_trait;
use db::{models::SweepRunRow, DbPool};
use tracing::{info, warn};

use crate::error::QueueError;

/// One batch's worth of work for a sweep: returns how many items (usually
/// executions) it touched. Errors from individual items must be rescued by
/// the implementation itself — a sweep run only fails outright on store
/// errors bubbling out of `run_batch` itself.
#[async_trait]
pub trait SweepBody: Send + Sync {
    async fn run_batch(&self, pool: &DbPool, batch_size: i64) -> Result<i64, QueueError>;
}

/// Drives one full run of a sweep: preflight, advisory lock, `SweepRun`
/// bookkeeping, then delegates to `body` in batches of `batch_size` until a
/// batch reports zero items processed.
pub struct SweepRunner {
    pub sweep_type: String,
    pub lock_key: String,
    pub batch_size: i64,
    /// Recency invariant to re-check once the advisory lock is held, for
    /// sweeps whose caller already passed the same check as a lock-free
    /// preflight. `None` for sweeps with no recency gating at all.
    pub min_seconds_between_runs: Option<i64>,
}

impl SweepRunner {
    pub fn new(sweep_type: impl Into<String>, batch_size: i64, min_seconds_between_runs: Option<i64>) -> Self {
        let sweep_type = sweep_type.into();
        let lock_key = format!("sweep:{sweep_type}");
        Self { sweep_type, lock_key, batch_size, min_seconds_between_runs }
    }

    /// Returns `Ok(None)` if another process held the advisory lock (sweep
    /// skipped this tick) or lost the race on the recency check after
    /// acquiring it, `Ok(Some(executions_processed))` otherwise.
    pub async fn run<B: SweepBody>(&self, pool: &DbPool, now: i64, body: &B) -> Result<Option<i64>, QueueError> {
        let mut tx = db::pool::begin(pool).await?;

        if !db::advisory::try_xact_lock(&mut tx, &self.lock_key).await? {
            info!(sweep_type = %self.sweep_type, "advisory lock held elsewhere, skipping this tick");
            tx.rollback().await?;
            return Ok(None);
        }

        if let Some(min_seconds_between_runs) = self.min_seconds_between_runs {
            let last = db::repository::sweep_runs::last_completed(&mut *tx, &self.sweep_type).await?;
            if let Some(last) = last {
                if now - last.started_at < min_seconds_between_runs {
                    info!(sweep_type = %self.sweep_type, "another process completed a run since the preflight check, skipping this tick");
                    tx.rollback().await?;
                    return Ok(None);
                }
            }
        }

        let run: SweepRunRow = db::repository::sweep_runs::start(&mut *tx, &self.sweep_type, now).await?;
        tx.commit().await?;

        let mut total = 0i64;
        loop {
            let processed = match body.run_batch(pool, self.batch_size).await {
                Ok(n) => n,
                Err(e) => {
                    warn!(sweep_type = %self.sweep_type, error = %e, "sweep batch failed, stopping this run");
                    break;
                }
            };
            total += processed;
            if processed < self.batch_size {
                break;
            }
        }

        db::repository::sweep_runs::complete(pool, run.id, now, total as i32).await?;
        info!(sweep_type = %self.sweep_type, executions_processed = total, "sweep run complete");
        Ok(Some(total))
    }
}
