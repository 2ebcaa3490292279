//! Execution lifecycle: create an execution bound to a registered graph
//! definition, and archive one when it's done.

use uuid::Uuid;

use db::models::ExecutionRow;
use db::DbPool;

use crate::catalog::GraphCatalog;
use crate::scheduler::advance;
use crate::EngineError;

/// Create a new execution bound to `(graph_name, graph_version)`: inserts the
/// execution row, a `not_set` value row for every declared node, and a
/// `not_set` computation row for every derived node. Returns the minted,
/// opaque execution id. Runs one `advance` afterwards in case any derived
/// node's gate is trivially satisfied with no inputs at all.
pub async fn create(pool: &DbPool, catalog: &GraphCatalog, hub: &queue::KickHub, graph_name: &str, graph_version: &str, now: i64) -> Result<ExecutionRow, EngineError> {
    let graph = catalog
        .get(graph_name, graph_version)
        .ok_or_else(|| EngineError::GraphNotRegistered(graph_name.to_string(), graph_version.to_string()))?;

    let id = format!("ex_{}", Uuid::new_v4());
    let mut tx = db::pool::begin(pool).await?;

    let execution = db::repository::executions::create_execution(&mut *tx, &id, graph_name, graph_version, &graph.graph_hash(), now).await?;

    for node in &graph.nodes {
        let db_type = node.kind.as_db_type().to_string();
        db::repository::values::insert_not_set(&mut *tx, &id, &node.name, &db_type, Some(0), now).await?;
        if node.kind.is_derived() {
            db::repository::computations::insert_not_set(&mut *tx, &id, &node.name, &db_type, None, now).await?;
        }
    }

    tx.commit().await?;
    advance(pool, catalog, hub, &id, now).await?;
    Ok(execution)
}

/// Archive an execution: the scheduler and every sweep skip archived
/// executions from then on.
pub async fn archive(pool: &DbPool, execution_id: &str, now: i64) -> Result<(), EngineError> {
    db::repository::executions::archive(pool, execution_id, now).await?;
    Ok(())
}

/// Force a retry of a node's computation regardless of prior attempt count —
/// inserts a fresh `not_set` computation row unconditionally. Lets an
/// operator push a permanently failed node past its retry budget.
pub async fn force_retry(pool: &DbPool, catalog: &GraphCatalog, hub: &queue::KickHub, execution_id: &str, node_name: &str, now: i64) -> Result<(), EngineError> {
    let execution = db::repository::executions::get_execution(pool, execution_id).await?;
    let graph = catalog
        .get(&execution.graph_name, &execution.graph_version)
        .ok_or_else(|| EngineError::GraphNotRegistered(execution.graph_name.clone(), execution.graph_version.clone()))?;
    let node = graph
        .node(node_name)
        .ok_or_else(|| EngineError::NodeNotFound(node_name.to_string(), execution.graph_name.clone(), execution.graph_version.clone()))?;
    if node.kind.is_input() {
        return Err(EngineError::CannotRetryInputNode(node_name.to_string()));
    }

    let kind = node.kind.as_db_type().to_string();
    db::repository::computations::insert_not_set(pool, execution_id, node_name, &kind, None, now).await?;
    hub.kick(execution_id);
    advance(pool, catalog, hub, execution_id, now).await
}
