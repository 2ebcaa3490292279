//! Migration: reconcile an execution with a newer graph definition
//! registered under the same `(name, version)`.

use db::DbPool;

use crate::catalog::GraphCatalog;
use crate::EngineError;

/// If the execution's stored `graph_hash` differs from the catalog's
/// current definition, insert value (and, for derived nodes, `not_set`
/// computation) rows for every node the execution doesn't yet have, then
/// update the stored hash. A transaction-scoped advisory lock keyed by
/// execution id prevents two processes from migrating the same execution
/// concurrently.
pub async fn migrate_execution(pool: &DbPool, catalog: &GraphCatalog, execution_id: &str, now: i64) -> Result<bool, EngineError> {
    let mut tx = db::pool::begin(pool).await?;

    if !db::advisory::try_xact_lock(&mut tx, &format!("migrate:{execution_id}")).await? {
        tx.rollback().await?;
        return Ok(false);
    }

    let execution = db::repository::executions::get_execution(&mut *tx, execution_id).await?;

    let graph = catalog
        .get(&execution.graph_name, &execution.graph_version)
        .ok_or_else(|| EngineError::GraphNotRegistered(execution.graph_name.clone(), execution.graph_version.clone()))?;

    let new_hash = graph.graph_hash();
    if new_hash == execution.graph_hash {
        tx.rollback().await?;
        return Ok(false);
    }

    let existing = db::repository::values::list_values(&mut *tx, execution_id).await?;
    let existing_names: std::collections::HashSet<String> = existing.into_iter().map(|v| v.node_name).collect();

    for node in &graph.nodes {
        if existing_names.contains(&node.name) {
            continue;
        }
        let db_type = node.kind.as_db_type().to_string();
        db::repository::values::insert_not_set(&mut *tx, execution_id, &node.name, &db_type, Some(0), now).await?;
        if node.kind.is_derived() {
            db::repository::computations::insert_not_set(&mut *tx, execution_id, &node.name, &db_type, None, now).await?;
        }
    }

    db::repository::executions::set_graph_hash(&mut *tx, execution_id, &new_hash, now).await?;
    tx.commit().await?;

    Ok(true)
}
