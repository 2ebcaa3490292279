//! Value Mutation API: set/unset input node values.

use std::collections::HashMap;

use serde_json::Value;

use db::DbPool;

use crate::catalog::GraphCatalog;
use crate::graph::NodeKind;
use crate::scheduler::advance;
use crate::value::{all_keys_are_strings, canonical_eq};
use crate::EngineError;

/// Set a single input node's value. No-ops (no revision bump, no advance)
/// if the new value and metadata are unchanged.
pub async fn set(
    pool: &DbPool,
    catalog: &GraphCatalog,
    hub: &queue::KickHub,
    execution_id: &str,
    node_name: &str,
    value: Value,
    metadata: Option<Value>,
    now: i64,
) -> Result<(), EngineError> {
    set_many(pool, catalog, hub, execution_id, HashMap::from([(node_name.to_string(), value)]), metadata, now).await
}

/// Atomically set several input nodes' values under one new revision.
pub async fn set_many(
    pool: &DbPool,
    catalog: &GraphCatalog,
    hub: &queue::KickHub,
    execution_id: &str,
    updates: HashMap<String, Value>,
    metadata: Option<Value>,
    now: i64,
) -> Result<(), EngineError> {
    for (name, value) in &updates {
        if !all_keys_are_strings(value) {
            return Err(EngineError::NonStringMapKey(name.clone()));
        }
    }
    if let Some(meta) = &metadata {
        if !all_keys_are_strings(meta) {
            return Err(EngineError::NonStringMapKey("<metadata>".into()));
        }
    }

    let mut tx = db::pool::begin(pool).await?;
    let execution = db::repository::executions::lock_execution_row(&mut *tx, execution_id).await?;

    let graph = catalog
        .get(&execution.graph_name, &execution.graph_version)
        .ok_or_else(|| EngineError::GraphNotRegistered(execution.graph_name.clone(), execution.graph_version.clone()))?;

    let mut changed = false;
    for (name, value) in &updates {
        let node = graph
            .node(name)
            .ok_or_else(|| EngineError::NodeNotFound(name.clone(), execution.graph_name.clone(), execution.graph_version.clone()))?;
        if node.kind != NodeKind::Input {
            return Err(EngineError::NotAnInputNode(name.clone()));
        }

        let current = db::repository::values::get_value(&mut *tx, execution_id, name).await?;
        let value_unchanged = current.set_time.is_some() && canonical_eq(&current.node_value, value);
        let metadata_unchanged = current.metadata == metadata;
        if value_unchanged && metadata_unchanged {
            continue;
        }
        changed = true;
    }

    if !changed {
        tx.rollback().await?;
        return Ok(());
    }

    let new_revision = db::repository::executions::bump_revision(&mut *tx, execution_id, now).await?;
    for (name, value) in &updates {
        db::repository::values::set_value(&mut *tx, execution_id, name, value, metadata.as_ref(), new_revision, now).await?;
    }

    tx.commit().await?;

    hub.kick(execution_id);
    advance(pool, catalog, hub, execution_id, now).await
}

/// Clear an input node back to "not set".
pub async fn unset(
    pool: &DbPool,
    catalog: &GraphCatalog,
    hub: &queue::KickHub,
    execution_id: &str,
    node_name: &str,
    now: i64,
) -> Result<(), EngineError> {
    unset_many(pool, catalog, hub, execution_id, std::slice::from_ref(&node_name.to_string()), now).await
}

/// Clear several input nodes back to "not set" under one new revision.
pub async fn unset_many(
    pool: &DbPool,
    catalog: &GraphCatalog,
    hub: &queue::KickHub,
    execution_id: &str,
    node_names: &[String],
    now: i64,
) -> Result<(), EngineError> {
    let mut tx = db::pool::begin(pool).await?;
    let execution = db::repository::executions::lock_execution_row(&mut *tx, execution_id).await?;

    let graph = catalog
        .get(&execution.graph_name, &execution.graph_version)
        .ok_or_else(|| EngineError::GraphNotRegistered(execution.graph_name.clone(), execution.graph_version.clone()))?;

    let mut changed = false;
    for name in node_names {
        let node = graph
            .node(name)
            .ok_or_else(|| EngineError::NodeNotFound(name.clone(), execution.graph_name.clone(), execution.graph_version.clone()))?;
        if node.kind != NodeKind::Input {
            return Err(EngineError::NotAnInputNode(name.clone()));
        }
        let current = db::repository::values::get_value(&mut *tx, execution_id, name).await?;
        if current.set_time.is_some() {
            changed = true;
        }
    }

    if !changed {
        tx.rollback().await?;
        return Ok(());
    }

    let new_revision = db::repository::executions::bump_revision(&mut *tx, execution_id, now).await?;
    for name in node_names {
        db::repository::values::unset_value(&mut *tx, execution_id, name, new_revision, now).await?;
    }

    tx.commit().await?;

    hub.kick(execution_id);
    advance(pool, catalog, hub, execution_id, now).await
}
