//! ScheduleNodes sweep: picks up executions with a schedule-kind
//! computation still `not_set`, whose execution was touched recently.

use std::collections::HashSet;

use async_trait::async_trait;
use db::DbPool;
use queue::{QueueError, SweepBody, SweepRunner};
use tracing::{instrument, warn};

use crate::catalog::GraphCatalog;
use crate::config::ScheduleNodesConfig;
use crate::scheduler::advance;
use crate::sweeps::due;
use crate::EngineError;

const SWEEP_TYPE: &str = "schedule_nodes";

#[instrument(skip_all, fields(sweep_type = SWEEP_TYPE))]
pub async fn run(pool: &DbPool, catalog: &GraphCatalog, hub: &queue::KickHub, config: &ScheduleNodesConfig, now: i64) -> Result<(), EngineError> {
    if !due(pool, SWEEP_TYPE, true, None, config.min_seconds_between_runs, now).await? {
        return Ok(());
    }

    let since = now - config.min_seconds_between_runs - config.overlap_seconds;
    let body = Body { catalog: catalog.clone(), hub: hub.clone(), now, since };
    SweepRunner::new(SWEEP_TYPE, 100, Some(config.min_seconds_between_runs)).run(pool, now, &body).await?;
    Ok(())
}

struct Body {
    catalog: GraphCatalog,
    hub: queue::KickHub,
    now: i64,
    since: i64,
}

#[async_trait]
impl SweepBody for Body {
    async fn run_batch(&self, pool: &DbPool, batch_size: i64) -> Result<i64, QueueError> {
        let rows = db::repository::computations::find_pending_schedule_kind(pool, self.since, batch_size).await?;

        let touched: HashSet<String> = rows.iter().map(|r| r.execution_id.clone()).collect();
        for execution_id in &touched {
            if let Err(e) = advance(pool, &self.catalog, &self.hub, execution_id, self.now).await {
                warn!(execution_id, error = %e, "advance during ScheduleNodes sweep failed, continuing");
            }
        }

        Ok(rows.len() as i64)
    }
}
