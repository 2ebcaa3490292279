//! Sweep-run audit repository functions.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{models::SweepRunRow, DbError};

/// Record the start of a sweep run. `sweep_type` is the `Display` form of
/// `db::models::SweepKind`.
pub async fn start<'e, E>(executor: E, sweep_type: &str, started_at: i64) -> Result<SweepRunRow, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        SweepRunRow,
        r#"
        INSERT INTO sweep_runs (id, sweep_type, started_at, completed_at, executions_processed, inserted_at, updated_at)
        VALUES ($1, $2, $3, NULL, NULL, $3, $3)
        RETURNING id, sweep_type, started_at, completed_at, executions_processed, inserted_at, updated_at
        "#,
        Uuid::new_v4(),
        sweep_type,
        started_at,
    )
    .fetch_one(executor)
    .await?;

    Ok(row)
}

/// Record completion of a sweep run with the number of executions touched.
pub async fn complete<'e, E>(
    executor: E,
    id: Uuid,
    completed_at: i64,
    executions_processed: i32,
) -> Result<(), DbError>
where
    E: PgExecutor<'e>,
{
    sqlx::query!(
        r#"UPDATE sweep_runs SET completed_at = $2, executions_processed = $3, updated_at = $2 WHERE id = $1"#,
        id,
        completed_at,
        executions_processed,
    )
    .execute(executor)
    .await?;

    Ok(())
}

/// The most recent completed run of a given sweep kind — sweeps use this
/// to pick up where they left off (e.g. StalledExecutions' `since` bound).
pub async fn last_completed<'e, E>(
    executor: E,
    sweep_type: &str,
) -> Result<Option<SweepRunRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        SweepRunRow,
        r#"
        SELECT id, sweep_type, started_at, completed_at, executions_processed, inserted_at, updated_at
        FROM sweep_runs
        WHERE sweep_type = $1 AND completed_at IS NOT NULL
        ORDER BY started_at DESC
        LIMIT 1
        "#,
        sweep_type,
    )
    .fetch_optional(executor)
    .await?;

    Ok(row)
}
