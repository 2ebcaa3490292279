//! UnblockedBySchedule sweep: finds schedule-kind values that
//! just came due and re-advances their executions. Belt-and-braces for the
//! normal in-memory kick path — a schedule value becoming due doesn't itself
//! wake anyone up, so this sweep is what actually notices.

use std::collections::HashSet;

use async_trait::async_trait;
use db::DbPool;
use queue::{QueueError, SweepBody, SweepRunner};
use tracing::{instrument, warn};

use crate::catalog::GraphCatalog;
use crate::scheduler::advance;
use crate::EngineError;

const SWEEP_TYPE: &str = "unblocked_by_schedule";

/// `window_seconds` bounds how far back a schedule value's `set_time` may be
/// and still count as "just" come due — callers should pass something close
/// to their own sweep-loop period so every due value is seen at least once.
#[instrument(skip_all, fields(sweep_type = SWEEP_TYPE))]
pub async fn run(pool: &DbPool, catalog: &GraphCatalog, hub: &queue::KickHub, window_seconds: i64, now: i64) -> Result<(), EngineError> {
    let body = Body { catalog: catalog.clone(), hub: hub.clone(), now, set_since: now - window_seconds };
    SweepRunner::new(SWEEP_TYPE, 100, None).run(pool, now, &body).await?;
    Ok(())
}

struct Body {
    catalog: GraphCatalog,
    hub: queue::KickHub,
    now: i64,
    set_since: i64,
}

#[async_trait]
impl SweepBody for Body {
    async fn run_batch(&self, pool: &DbPool, batch_size: i64) -> Result<i64, QueueError> {
        let rows = db::repository::values::find_due_schedule_values(pool, self.now, self.set_since, batch_size).await?;

        let touched: HashSet<String> = rows.iter().map(|r| r.execution_id.clone()).collect();
        for execution_id in &touched {
            if let Err(e) = advance(pool, &self.catalog, &self.hub, execution_id, self.now).await {
                warn!(execution_id, error = %e, "advance during UnblockedBySchedule sweep failed, continuing");
            }
        }

        Ok(rows.len() as i64)
    }
}
