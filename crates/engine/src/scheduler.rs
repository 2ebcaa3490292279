//! Scheduler / Advancer.
//!
//! `advance` is the idempotent, re-entrant operation that brings one
//! execution to the latest state its current data allows: for every
//! derived node whose gate is now satisfied and which has no pending
//! computation, it transitions a `not_set` row to `computing` and dispatches
//! a worker. Calling it again with no intervening mutation is a no-op.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};

use db::models::{ComputationRow, ComputationState, ValueRow};
use db::DbPool;

use crate::catalog::GraphCatalog;
use crate::condition::evaluate;
use crate::graph::NodeDef;
use crate::worker;
use crate::EngineError;

/// Bring `execution_id` as far forward as its current value state allows.
/// Safe to call repeatedly, concurrently, and from multiple processes —
/// the execution row lock serializes the decision step, and the
/// at-most-one-pending invariant serializes dispatch.
#[instrument(skip(pool, catalog, hub))]
pub async fn advance(
    pool: &DbPool,
    catalog: &GraphCatalog,
    hub: &queue::KickHub,
    execution_id: &str,
    now: i64,
) -> Result<(), EngineError> {
    let mut tx = db::pool::begin(pool).await?;

    let execution = db::repository::executions::lock_execution_row(&mut *tx, execution_id).await?;
    if execution.archived_at.is_some() {
        tx.rollback().await?;
        return Ok(());
    }

    let Some(graph) = catalog.get(&execution.graph_name, &execution.graph_version) else {
        tx.rollback().await?;
        return Err(EngineError::GraphNotRegistered(execution.graph_name, execution.graph_version));
    };

    let value_rows = db::repository::values::list_values(&mut *tx, execution_id).await?;
    let values: HashMap<String, ValueRow> = value_rows.into_iter().map(|v| (v.node_name.clone(), v)).collect();

    let pending_rows = db::repository::computations::list_pending(&mut *tx, execution_id).await?;
    let mut pending: HashMap<String, ComputationRow> = HashMap::new();
    for row in pending_rows {
        let replace = pending.get(&row.node_name).map(|existing| row.inserted_at > existing.inserted_at).unwrap_or(true);
        if replace {
            pending.insert(row.node_name.clone(), row);
        }
    }

    let mut dispatch: Vec<(ComputationRow, Arc<NodeDef>, HashMap<String, Value>, i64)> = Vec::new();

    for node in graph.nodes.iter().filter(|n| n.kind.is_derived()) {
        if let Some(row) = pending.get(&node.name) {
            if row.state() == ComputationState::Computing {
                continue;
            }
        }

        let computation = match pending.get(&node.name) {
            Some(row) => row.clone(),
            None => {
                let kind = node.kind.as_db_type().to_string();
                db::repository::computations::insert_not_set(&mut *tx, execution_id, &node.name, &kind, None, now).await?
            }
        };

        if let Some(scheduled) = computation.scheduled_time {
            if scheduled > now {
                continue;
            }
        }

        let gate_met = match &node.condition {
            Some(cond) => evaluate(cond, &values).met,
            None => true,
        };
        if !gate_met {
            continue;
        }

        let deadline = now + node.retry.abandon_after_seconds;
        let heartbeat_deadline = node.retry.heartbeat_timeout_seconds.map(|t| now + t);
        let computed_with: HashMap<String, Option<i64>> =
            values.iter().map(|(k, v)| (k.clone(), v.ex_revision)).collect();
        let computed_with = serde_json::to_value(&computed_with).expect("revision map serializes");

        let started = db::repository::computations::start_computing(
            &mut *tx,
            computation.id,
            now,
            Some(deadline),
            execution.revision,
            &computed_with,
            heartbeat_deadline,
        )
        .await?;

        let inputs: HashMap<String, Value> = values.iter().map(|(k, v)| (k.clone(), v.node_value.clone())).collect();
        dispatch.push((started, Arc::new(node.clone()), inputs, deadline));
    }

    tx.commit().await?;

    if !dispatch.is_empty() {
        info!(execution_id, dispatched = dispatch.len(), "advance dispatching computations");
    }

    for (computation, node, inputs, deadline) in dispatch {
        let pool = pool.clone();
        let catalog = catalog.clone();
        let hub = hub.clone();
        let execution_id = execution_id.to_string();
        let graph_name = execution.graph_name.clone();
        let graph_version = execution.graph_version.clone();
        tokio::spawn(async move {
            if let Err(e) = worker::run_computation(
                &pool,
                &catalog,
                &hub,
                &execution_id,
                &graph_name,
                &graph_version,
                computation.id,
                node,
                inputs,
                now,
                deadline,
            )
            .await
            {
                tracing::error!(execution_id, error = %e, "computation worker failed");
            }
        });
    }

    Ok(())
}
