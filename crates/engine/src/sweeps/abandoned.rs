//! Abandoned-computation sweep.
//!
//! Finds `computing` rows past their deadline or heartbeat, transitions
//! them to `abandoned`, schedules a retry successor if one is due, and
//! re-advances the affected executions (deduplicated).

use std::collections::HashSet;

use async_trait::async_trait;
use db::DbPool;
use queue::{QueueError, SweepBody, SweepRunner};
use tracing::{instrument, warn};

use crate::catalog::GraphCatalog;
use crate::retry::{decide, RetryDecision};
use crate::scheduler::advance;
use crate::EngineError;

const SWEEP_TYPE: &str = "abandoned";

#[instrument(skip_all, fields(sweep_type = SWEEP_TYPE))]
pub async fn run(pool: &DbPool, catalog: &GraphCatalog, hub: &queue::KickHub, now: i64) -> Result<(), EngineError> {
    let body = Body { catalog: catalog.clone(), hub: hub.clone(), now };
    SweepRunner::new(SWEEP_TYPE, 100, None).run(pool, now, &body).await?;
    Ok(())
}

struct Body {
    catalog: GraphCatalog,
    hub: queue::KickHub,
    now: i64,
}

#[async_trait]
impl SweepBody for Body {
    async fn run_batch(&self, pool: &DbPool, batch_size: i64) -> Result<i64, QueueError> {
        let mut tx = db::pool::begin(pool).await?;
        let rows = db::repository::computations::find_abandonable(&mut *tx, self.now, batch_size).await?;

        let mut touched: HashSet<String> = HashSet::new();
        for row in &rows {
            let Some(graph) = self.catalog.get_execution_graph(pool, &row.execution_id).await else {
                warn!(execution_id = %row.execution_id, "graph no longer registered, skipping abandon");
                continue;
            };
            let Some(node) = graph.node(&row.node_name) else { continue };

            let prior_attempts = db::repository::computations::terminal_since_last_success(&mut *tx, &row.execution_id, &row.node_name)
                .await?
                .len();
            db::repository::computations::mark_abandoned(&mut *tx, row.id, self.now).await?;

            if let RetryDecision::Retry { scheduled_time } = decide(&node.retry, prior_attempts, self.now) {
                let kind = node.kind.as_db_type().to_string();
                db::repository::computations::insert_not_set(&mut *tx, &row.execution_id, &row.node_name, &kind, Some(scheduled_time), self.now).await?;
            }

            touched.insert(row.execution_id.clone());
        }
        tx.commit().await?;

        for execution_id in &touched {
            if let Err(e) = advance(pool, &self.catalog, &self.hub, execution_id, self.now).await {
                warn!(execution_id, error = %e, "advance after abandon failed, continuing sweep");
            }
        }

        Ok(rows.len() as i64)
    }
}
