//! RegenerateScheduleRecurring sweep: a `schedule_recurring` or
//! `tick_recurring` node's successful value is only good until it elapses —
//! unlike every other derived node it has to be recomputed even though
//! nothing upstream changed. This sweep notices an elapsed recurring value
//! with no pending successor and inserts one.

use std::collections::HashSet;

use async_trait::async_trait;
use db::DbPool;
use queue::{QueueError, SweepBody, SweepRunner};
use tracing::{instrument, warn};

use crate::catalog::GraphCatalog;
use crate::scheduler::advance;
use crate::EngineError;

const SWEEP_TYPE: &str = "regenerate_schedule_recurring";

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
        let rows = db::repository::computations::find_recurring_needing_regeneration(&mut *tx, self.now, batch_size).await?;

        let mut touched: HashSet<String> = HashSet::new();
        for row in &rows {
            let Some(graph) = self.catalog.get_execution_graph(pool, &row.execution_id).await else {
                warn!(execution_id = %row.execution_id, "graph no longer registered, skipping regeneration");
                continue;
            };
            let Some(node) = graph.node(&row.node_name) else { continue };

            let kind = node.kind.as_db_type().to_string();
            db::repository::computations::insert_not_set(&mut *tx, &row.execution_id, &row.node_name, &kind, None, self.now).await?;
            touched.insert(row.execution_id.clone());
        }

        if !touched.is_empty() {
            let ids: Vec<String> = touched.iter().cloned().collect();
            db::repository::executions::touch_updated_at(&mut *tx, &ids, self.now).await?;
        }
        tx.commit().await?;

        for execution_id in &touched {
            if let Err(e) = advance(pool, &self.catalog, &self.hub, execution_id, self.now).await {
                warn!(execution_id, error = %e, "advance after regenerating recurring schedule failed, continuing");
            }
        }

        Ok(rows.len() as i64)
    }
}
