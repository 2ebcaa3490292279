//! Computation Worker.
//!
//! Invokes a dispatched node's function, enforces its deadline
//! cooperatively, and persists the outcome transactionally: success bumps
//! the execution revision and upserts the target value row; failure
//! consults the Retry Policy inside the same transaction. Either way, the
//! worker signals the scheduler to `advance` again.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::{interval, sleep_until, Instant};
use tracing::{error, instrument, warn};

use db::DbPool;
use nodes::ExecutionContext;

use crate::catalog::GraphCatalog;
use crate::graph::NodeDef;
use crate::retry::{decide, RetryDecision};
use crate::scheduler::advance;
use crate::EngineError;

/// Run one dispatched computation to completion (or deadline) and persist
/// its outcome. Spawned by the scheduler, one task per unblocked
/// computation.
#[allow(clippy::too_many_arguments)]
#[instrument(skip(pool, catalog, hub, node, inputs), fields(node_name = %node.name))]
pub async fn run_computation(
    pool: &DbPool,
    catalog: &GraphCatalog,
    hub: &queue::KickHub,
    execution_id: &str,
    graph_name: &str,
    graph_version: &str,
    computation_id: uuid::Uuid,
    node: Arc<NodeDef>,
    inputs: HashMap<String, Value>,
    now: i64,
    deadline: i64,
) -> Result<(), EngineError> {
    let ctx = ExecutionContext {
        execution_id: execution_id.to_string(),
        graph_name: graph_name.to_string(),
        graph_version: graph_version.to_string(),
        inputs,
        now,
    };

    let executable = node
        .executable
        .clone()
        .expect("scheduler only dispatches derived nodes, which always have an executable");

    let outcome = race_with_heartbeat(&*executable, &ctx, &node, pool, computation_id, deadline).await;

    match outcome {
        Some(Ok(value)) => persist_success(pool, execution_id, computation_id, &node, value).await?,
        Some(Err(reason)) => persist_failure(pool, execution_id, computation_id, &node, reason).await?,
        None => {
            // Deadline elapsed before the node reported. Leave the row
            // `computing`; the Abandoned sweep is the authoritative transition.
            warn!(execution_id, node = %node.name, "computation exceeded its deadline, leaving to Abandoned sweep");
            return Ok(());
        }
    }

    hub.kick(execution_id);
    advance(pool, catalog, hub, execution_id, now).await
}

async fn race_with_heartbeat(
    executable: &dyn nodes::ExecutableNode,
    ctx: &ExecutionContext,
    node: &NodeDef,
    pool: &DbPool,
    computation_id: uuid::Uuid,
    deadline: i64,
) -> Option<Result<Value, String>> {
    // Deadline is an absolute epoch second; translate to a runtime instant
    // relative to now for `sleep_until`.
    let secs_remaining = (deadline - ctx.now).max(0) as u64;
    let deadline_instant = Instant::now() + Duration::from_secs(secs_remaining);

    let execute_fut = executable.execute(ctx);
    tokio::pin!(execute_fut);

    let heartbeat_every = node.retry.heartbeat_interval_seconds.map(|s| Duration::from_secs(s.max(1) as u64));

    match heartbeat_every {
        None => tokio::select! {
            res = &mut execute_fut => Some(res.map_err(|e| e.to_string())),
            _ = sleep_until(deadline_instant) => None,
        },
        Some(period) => {
            let mut ticker = interval(period);
            loop {
                tokio::select! {
                    res = &mut execute_fut => return Some(res.map_err(|e| e.to_string())),
                    _ = sleep_until(deadline_instant) => return None,
                    _ = ticker.tick() => {
                        let hb_deadline = node.retry.heartbeat_timeout_seconds.map(|t| ctx.now + t);
                        if let Err(e) = db::repository::computations::heartbeat(pool, computation_id, ctx.now, hb_deadline.unwrap_or(deadline)).await {
                            error!(error = %e, "failed to record heartbeat");
                        }
                    }
                }
            }
        }
    }
}

async fn persist_success(
    pool: &DbPool,
    execution_id: &str,
    computation_id: uuid::Uuid,
    node: &NodeDef,
    value: Value,
) -> Result<(), EngineError> {
    let now = current_epoch_seconds();
    let mut tx = db::pool::begin(pool).await?;
    let execution = db::repository::executions::lock_execution_row(&mut *tx, execution_id).await?;
    let new_revision = db::repository::executions::bump_revision(&mut *tx, execution_id, now).await?;

    db::repository::values::set_value(&mut *tx, execution_id, node.target_node(), &value, None, new_revision, now).await?;
    db::repository::computations::complete_success(&mut *tx, computation_id, now, new_revision).await?;
    tx.commit().await?;
    let _ = execution;

    if let Some(on_save) = &node.on_save {
        on_save(&value);
    }

    Ok(())
}

async fn persist_failure(
    pool: &DbPool,
    execution_id: &str,
    computation_id: uuid::Uuid,
    node: &NodeDef,
    reason: String,
) -> Result<(), EngineError> {
    let now = current_epoch_seconds();
    let mut tx = db::pool::begin(pool).await?;

    let prior_attempts = db::repository::computations::terminal_since_last_success(&mut *tx, execution_id, &node.name)
        .await?
        .len();
    db::repository::computations::complete_failed(&mut *tx, computation_id, now, &reason).await?;

    if let RetryDecision::Retry { scheduled_time } = decide(&node.retry, prior_attempts, now) {
        let kind = node.kind.as_db_type().to_string();
        db::repository::computations::insert_not_set(&mut *tx, execution_id, &node.name, &kind, Some(scheduled_time), now).await?;
    }

    tx.commit().await?;
    Ok(())
}

fn current_epoch_seconds() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_secs() as i64
}
