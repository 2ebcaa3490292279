//! Value repository functions.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{models::ValueRow, DbError};

/// Insert a value row in its initial "not set" state — used when an
/// execution is created and when a migration adds a node declared by a
/// newer graph definition, after a migration.
pub async fn insert_not_set<'e, E>(
    executor: E,
    execution_id: &str,
    node_name: &str,
    node_type: &str,
    ex_revision: Option<i64>,
    now: i64,
) -> Result<ValueRow, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        ValueRow,
        r#"
        INSERT INTO values (id, execution_id, node_name, node_type, node_value, set_time, ex_revision, metadata, inserted_at, updated_at)
        VALUES ($1, $2, $3, $4, 'null'::jsonb, NULL, $5, NULL, $6, $6)
        RETURNING id, execution_id, node_name, node_type, node_value, set_time, ex_revision, metadata, inserted_at, updated_at
        "#,
        Uuid::new_v4(),
        execution_id,
        node_name,
        node_type,
        ex_revision,
        now,
    )
    .fetch_one(executor)
    .await?;

    Ok(row)
}

/// Write a value (`set`/`set_many`). `ex_revision` is the new
/// execution revision the caller already bumped in the same transaction.
pub async fn set_value<'e, E>(
    executor: E,
    execution_id: &str,
    node_name: &str,
    node_value: &serde_json::Value,
    metadata: Option<&serde_json::Value>,
    ex_revision: i64,
    now: i64,
) -> Result<ValueRow, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        ValueRow,
        r#"
        UPDATE values
        SET node_value = $3, set_time = $5, ex_revision = $4, metadata = $6, updated_at = $5
        WHERE execution_id = $1 AND node_name = $2
        RETURNING id, execution_id, node_name, node_type, node_value, set_time, ex_revision, metadata, inserted_at, updated_at
        "#,
        execution_id,
        node_name,
        node_value,
        ex_revision,
        now,
        metadata,
    )
    .fetch_optional(executor)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Clear a value back to "not set" (`unset`/`unset_many`).
pub async fn unset_value<'e, E>(
    executor: E,
    execution_id: &str,
    node_name: &str,
    ex_revision: i64,
    now: i64,
) -> Result<ValueRow, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        ValueRow,
        r#"
        UPDATE values
        SET node_value = 'null'::jsonb, set_time = NULL, ex_revision = $3, updated_at = $4
        WHERE execution_id = $1 AND node_name = $2
        RETURNING id, execution_id, node_name, node_type, node_value, set_time, ex_revision, metadata, inserted_at, updated_at
        "#,
        execution_id,
        node_name,
        ex_revision,
        now,
    )
    .fetch_optional(executor)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Fetch a single value row.
pub async fn get_value<'e, E>(
    executor: E,
    execution_id: &str,
    node_name: &str,
) -> Result<ValueRow, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        ValueRow,
        r#"SELECT id, execution_id, node_name, node_type, node_value, set_time, ex_revision, metadata, inserted_at, updated_at
           FROM values WHERE execution_id = $1 AND node_name = $2"#,
        execution_id,
        node_name,
    )
    .fetch_optional(executor)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Fetch every value row belonging to an execution.
pub async fn list_values<'e, E>(executor: E, execution_id: &str) -> Result<Vec<ValueRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as!(
        ValueRow,
        r#"SELECT id, execution_id, node_name, node_type, node_value, set_time, ex_revision, metadata, inserted_at, updated_at
           FROM values WHERE execution_id = $1"#,
        execution_id,
    )
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

/// Fetch every value row for a schedule-kind node across all executions
/// whose value is now due (`node_value <= now`) and was set recently —
/// basis of the UnblockedBySchedule sweep.
pub async fn find_due_schedule_values<'e, E>(
    executor: E,
    now: i64,
    set_since: i64,
    limit: i64,
) -> Result<Vec<ValueRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as!(
        ValueRow,
        r#"
        SELECT id, execution_id, node_name, node_type, node_value, set_time, ex_revision, metadata, inserted_at, updated_at
        FROM values
        WHERE node_type IN ('schedule_once', 'schedule_recurring', 'tick_once', 'tick_recurring')
          AND set_time IS NOT NULL
          AND set_time >= $2
          AND (node_value #>> '{}')::bigint <= $1
        ORDER BY set_time ASC
        LIMIT $3
        "#,
        now,
        set_since,
        limit,
    )
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

/// Schedule values in the past within `lookback` seconds but older than
/// `recency_boundary` — basis of the MissedSchedulesCatchall sweep.
pub async fn find_stale_due_schedule_values<'e, E>(
    executor: E,
    lookback_floor: i64,
    recency_boundary: i64,
    limit: i64,
) -> Result<Vec<ValueRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as!(
        ValueRow,
        r#"
        SELECT id, execution_id, node_name, node_type, node_value, set_time, ex_revision, metadata, inserted_at, updated_at
        FROM values
        WHERE node_type IN ('schedule_once', 'schedule_recurring', 'tick_once', 'tick_recurring')
          AND set_time IS NOT NULL
          AND set_time >= $1
          AND set_time < $2
        ORDER BY set_time ASC
        LIMIT $3
        "#,
        lookback_floor,
        recency_boundary,
        limit,
    )
    .fetch_all(executor)
    .await?;

    Ok(rows)
}
