//! Execution repository functions.

use sqlx::PgExecutor;

use crate::{models::ExecutionRow, DbError};

/// Insert a new execution row. `id` is the caller-minted opaque, prefixed id.
pub async fn create_execution<'e, E>(
    executor: E,
    id: &str,
    graph_name: &str,
    graph_version: &str,
    graph_hash: &str,
    now: i64,
) -> Result<ExecutionRow, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        ExecutionRow,
        r#"
        INSERT INTO executions (id, graph_name, graph_version, graph_hash, revision, archived_at, inserted_at, updated_at)
        VALUES ($1, $2, $3, $4, 0, NULL, $5, $5)
        RETURNING id, graph_name, graph_version, graph_hash, revision, archived_at, inserted_at, updated_at
        "#,
        id,
        graph_name,
        graph_version,
        graph_hash,
        now,
    )
    .fetch_one(executor)
    .await?;

    Ok(row)
}

/// Fetch an execution row without locking.
pub async fn get_execution<'e, E>(executor: E, id: &str) -> Result<ExecutionRow, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        ExecutionRow,
        r#"SELECT id, graph_name, graph_version, graph_hash, revision, archived_at, inserted_at, updated_at
           FROM executions WHERE id = $1"#,
        id,
    )
    .fetch_optional(executor)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Lock the execution row `FOR UPDATE` within the caller's transaction.
/// Used by the scheduler (§4.D) and mutation API (§4.H) to serialize
/// concurrent writers to the same execution.
pub async fn lock_execution_row<'e, E>(executor: E, id: &str) -> Result<ExecutionRow, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        ExecutionRow,
        r#"SELECT id, graph_name, graph_version, graph_hash, revision, archived_at, inserted_at, updated_at
           FROM executions WHERE id = $1 FOR UPDATE"#,
        id,
    )
    .fetch_optional(executor)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Bump the execution's revision by one and touch `updated_at`. Must be
/// called with the execution row already locked `FOR UPDATE` in the same
/// transaction (invariant 4). Returns the new revision.
pub async fn bump_revision<'e, E>(executor: E, id: &str, now: i64) -> Result<i64, DbError>
where
    E: PgExecutor<'e>,
{
    let row: (i64,) = sqlx::query_as(
        r#"UPDATE executions SET revision = revision + 1, updated_at = $2 WHERE id = $1 RETURNING revision"#,
    )
    .bind(id)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(row.0)
}

/// Update the `graph_hash` of an execution after a migration.
pub async fn set_graph_hash<'e, E>(
    executor: E,
    id: &str,
    graph_hash: &str,
    now: i64,
) -> Result<(), DbError>
where
    E: PgExecutor<'e>,
{
    sqlx::query!(
        r#"UPDATE executions SET graph_hash = $2, updated_at = $3 WHERE id = $1"#,
        id,
        graph_hash,
        now,
    )
    .execute(executor)
    .await?;

    Ok(())
}

/// Mark an execution archived; scheduler and sweeps skip archived executions.
pub async fn archive<'e, E>(executor: E, id: &str, now: i64) -> Result<(), DbError>
where
    E: PgExecutor<'e>,
{
    sqlx::query!(
        r#"UPDATE executions SET archived_at = $2, updated_at = $2 WHERE id = $1"#,
        id,
        now,
    )
    .execute(executor)
    .await?;

    Ok(())
}

/// Bulk-touch `updated_at` for a batch of execution ids (used by the
/// RegenerateScheduleRecurring sweep to make ScheduleNodes pick them up).
pub async fn touch_updated_at<'e, E>(executor: E, ids: &[String], now: i64) -> Result<(), DbError>
where
    E: PgExecutor<'e>,
{
    sqlx::query!(
        r#"UPDATE executions SET updated_at = $2 WHERE id = ANY($1)"#,
        ids,
        now,
    )
    .execute(executor)
    .await?;

    Ok(())
}

/// Executions with `updated_at` in `(since, until]` and not archived —
/// the basis for the StalledExecutions and MissedSchedulesCatchall sweeps.
pub async fn find_updated_between<'e, E>(
    executor: E,
    since: i64,
    until: i64,
    limit: i64,
) -> Result<Vec<ExecutionRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as!(
        ExecutionRow,
        r#"
        SELECT id, graph_name, graph_version, graph_hash, revision, archived_at, inserted_at, updated_at
        FROM executions
        WHERE archived_at IS NULL AND updated_at > $1 AND updated_at <= $2
        ORDER BY updated_at ASC
        LIMIT $3
        "#,
        since,
        until,
        limit,
    )
    .fetch_all(executor)
    .await?;

    Ok(rows)
}
