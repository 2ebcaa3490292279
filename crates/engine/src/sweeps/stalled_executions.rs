//! StalledExecutions sweep: re-advances executions that haven't
//! been touched recently, as a last-resort recovery for signals the normal
//! kick path and other sweeps missed. Excludes executions too new to be
//! considered stalled yet.

use std::collections::HashSet;

use async_trait::async_trait;
use db::DbPool;
use queue::{QueueError, SweepBody, SweepRunner};
use tracing::{instrument, warn};

use crate::catalog::GraphCatalog;
use crate::config::StalledExecutionsConfig;
use crate::scheduler::advance;
use crate::sweeps::due;
use crate::EngineError;

const SWEEP_TYPE: &str = "stalled_executions";

#[instrument(skip_all, fields(sweep_type = SWEEP_TYPE))]
pub async fn run(pool: &DbPool, catalog: &GraphCatalog, hub: &queue::KickHub, config: &StalledExecutionsConfig, now: i64) -> Result<(), EngineError> {
    if !due(pool, SWEEP_TYPE, config.enabled, config.preferred_hour, config.min_seconds_between_runs, now).await? {
        return Ok(());
    }

    let since = now - config.min_seconds_between_runs - config.overlap_seconds;
    let until = now - config.too_new_cutoff_seconds;
    let body = Body { catalog: catalog.clone(), hub: hub.clone(), now, since, until };
    SweepRunner::new(SWEEP_TYPE, 100, Some(config.min_seconds_between_runs)).run(pool, now, &body).await?;
    Ok(())
}

struct Body {
    catalog: GraphCatalog,
    hub: queue::KickHub,
    now: i64,
    since: i64,
    until: i64,
}

#[async_trait]
impl SweepBody for Body {
    async fn run_batch(&self, pool: &DbPool, batch_size: i64) -> Result<i64, QueueError> {
        let rows = db::repository::executions::find_updated_between(pool, self.since, self.until, batch_size).await?;

        let touched: HashSet<String> = rows.iter().map(|r| r.id.clone()).collect();
        for execution_id in &touched {
            if let Err(e) = advance(pool, &self.catalog, &self.hub, execution_id, self.now).await {
                warn!(execution_id, error = %e, "advance during StalledExecutions sweep failed, continuing");
            }
        }

        Ok(rows.len() as i64)
    }
}
