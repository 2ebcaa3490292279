//! MissedSchedulesCatchall sweep: a slow, wide nightly scan for
//! schedule values that came due long enough ago that the faster sweeps
//! should already have caught them, but haven't. The safety net under the
//! safety nets.

use std::collections::HashSet;

use async_trait::async_trait;
use db::DbPool;
use queue::{QueueError, SweepBody, SweepRunner};
use tracing::{instrument, warn};

use crate::catalog::GraphCatalog;
use crate::config::MissedSchedulesCatchallConfig;
use crate::scheduler::advance;
use crate::sweeps::due;
use crate::EngineError;

const SWEEP_TYPE: &str = "missed_schedules_catchall";
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[instrument(skip_all, fields(sweep_type = SWEEP_TYPE))]
pub async fn run(pool: &DbPool, catalog: &GraphCatalog, hub: &queue::KickHub, config: &MissedSchedulesCatchallConfig, now: i64) -> Result<(), EngineError> {
    if !due(pool, SWEEP_TYPE, config.enabled, config.preferred_hour, config.min_seconds_between_runs, now).await? {
        return Ok(());
    }

    let lookback_floor = now - config.lookback_days * SECONDS_PER_DAY;
    let recency_boundary = now - config.recency_boundary_seconds;
    let body = Body { catalog: catalog.clone(), hub: hub.clone(), now, lookback_floor, recency_boundary };
    SweepRunner::new(SWEEP_TYPE, 100, Some(config.min_seconds_between_runs)).run(pool, now, &body).await?;
    Ok(())
}

struct Body {
    catalog: GraphCatalog,
    hub: queue::KickHub,
    now: i64,
    lookback_floor: i64,
    recency_boundary: i64,
}

#[async_trait]
impl SweepBody for Body {
    async fn run_batch(&self, pool: &DbPool, batch_size: i64) -> Result<i64, QueueError> {
        let rows = db::repository::values::find_stale_due_schedule_values(pool, self.lookback_floor, self.recency_boundary, batch_size).await?;

        let touched: HashSet<String> = rows.iter().map(|r| r.execution_id.clone()).collect();
        for execution_id in &touched {
            if let Err(e) = advance(pool, &self.catalog, &self.hub, execution_id, self.now).await {
                warn!(execution_id, error = %e, "advance during MissedSchedulesCatchall sweep failed, continuing");
            }
        }

        Ok(rows.len() as i64)
    }
}
