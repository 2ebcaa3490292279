//! Computation repository functions.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{models::ComputationRow, DbError};

/// Insert a fresh `not_set` computation row for a node — at execution
/// creation, after a migration, as a retry successor, or via an
/// operator-forced retry.
#[allow(clippy::too_many_arguments)]
pub async fn insert_not_set<'e, E>(
    executor: E,
    execution_id: &str,
    node_name: &str,
    computation_type: &str,
    scheduled_time: Option<i64>,
    now: i64,
) -> Result<ComputationRow, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        ComputationRow,
        r#"
        INSERT INTO computations (
            id, execution_id, node_name, computation_type, state,
            ex_revision_at_start, ex_revision_at_completion, scheduled_time,
            start_time, completion_time, deadline, error_details, computed_with,
            last_heartbeat_at, heartbeat_deadline, inserted_at, updated_at
        )
        VALUES ($1, $2, $3, $4, 'not_set', NULL, NULL, $5, NULL, NULL, NULL, NULL, NULL, NULL, NULL, $6, $6)
        RETURNING id, execution_id, node_name, computation_type, state,
                  ex_revision_at_start, ex_revision_at_completion, scheduled_time,
                  start_time, completion_time, deadline, error_details, computed_with,
                  last_heartbeat_at, heartbeat_deadline, inserted_at, updated_at
        "#,
        Uuid::new_v4(),
        execution_id,
        node_name,
        computation_type,
        scheduled_time,
        now,
    )
    .fetch_one(executor)
    .await?;

    Ok(row)
}

/// All computations for an execution currently in `{not_set, computing}`
/// (the set the scheduler must reconsider on every `advance`).
pub async fn list_pending<'e, E>(
    executor: E,
    execution_id: &str,
) -> Result<Vec<ComputationRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as!(
        ComputationRow,
        r#"
        SELECT id, execution_id, node_name, computation_type, state,
               ex_revision_at_start, ex_revision_at_completion, scheduled_time,
               start_time, completion_time, deadline, error_details, computed_with,
               last_heartbeat_at, heartbeat_deadline, inserted_at, updated_at
        FROM computations
        WHERE execution_id = $1 AND state IN ('not_set', 'computing')
        "#,
        execution_id,
    )
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

/// All terminal computations for a node since (and excluding) its most
/// recent `success`, most recent first — used by the Retry Policy to count
/// `attempts`.
pub async fn terminal_since_last_success<'e, E>(
    executor: E,
    execution_id: &str,
    node_name: &str,
) -> Result<Vec<ComputationRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as!(
        ComputationRow,
        r#"
        SELECT id, execution_id, node_name, computation_type, state,
               ex_revision_at_start, ex_revision_at_completion, scheduled_time,
               start_time, completion_time, deadline, error_details, computed_with,
               last_heartbeat_at, heartbeat_deadline, inserted_at, updated_at
        FROM computations
        WHERE execution_id = $1 AND node_name = $2
          AND state IN ('failed', 'abandoned')
          AND inserted_at > COALESCE(
            (SELECT MAX(inserted_at) FROM computations
             WHERE execution_id = $1 AND node_name = $2 AND state = 'success'),
            0
          )
        ORDER BY inserted_at DESC
        "#,
        execution_id,
        node_name,
    )
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

/// Transition a `not_set` row to `computing`.
pub async fn start_computing<'e, E>(
    executor: E,
    id: Uuid,
    start_time: i64,
    deadline: Option<i64>,
    ex_revision_at_start: i64,
    computed_with: &serde_json::Value,
    heartbeat_deadline: Option<i64>,
) -> Result<ComputationRow, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        ComputationRow,
        r#"
        UPDATE computations
        SET state = 'computing', start_time = $2, deadline = $3, ex_revision_at_start = $4,
            computed_with = $5, last_heartbeat_at = $2, heartbeat_deadline = $6, updated_at = $2
        WHERE id = $1 AND state = 'not_set'
        RETURNING id, execution_id, node_name, computation_type, state,
                  ex_revision_at_start, ex_revision_at_completion, scheduled_time,
                  start_time, completion_time, deadline, error_details, computed_with,
                  last_heartbeat_at, heartbeat_deadline, inserted_at, updated_at
        "#,
        id,
        start_time,
        deadline,
        ex_revision_at_start,
        computed_with,
        heartbeat_deadline,
    )
    .fetch_optional(executor)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Transition a `computing` row to `success`.
pub async fn complete_success<'e, E>(
    executor: E,
    id: Uuid,
    completion_time: i64,
    ex_revision_at_completion: i64,
) -> Result<ComputationRow, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        ComputationRow,
        r#"
        UPDATE computations
        SET state = 'success', completion_time = $2, ex_revision_at_completion = $3, updated_at = $2
        WHERE id = $1
        RETURNING id, execution_id, node_name, computation_type, state,
                  ex_revision_at_start, ex_revision_at_completion, scheduled_time,
                  start_time, completion_time, deadline, error_details, computed_with,
                  last_heartbeat_at, heartbeat_deadline, inserted_at, updated_at
        "#,
        id,
        completion_time,
        ex_revision_at_completion,
    )
    .fetch_optional(executor)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Transition a `computing` row to `failed`.
pub async fn complete_failed<'e, E>(
    executor: E,
    id: Uuid,
    completion_time: i64,
    error_details: &str,
) -> Result<ComputationRow, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        ComputationRow,
        r#"
        UPDATE computations
        SET state = 'failed', completion_time = $2, error_details = $3, updated_at = $2
        WHERE id = $1
        RETURNING id, execution_id, node_name, computation_type, state,
                  ex_revision_at_start, ex_revision_at_completion, scheduled_time,
                  start_time, completion_time, deadline, error_details, computed_with,
                  last_heartbeat_at, heartbeat_deadline, inserted_at, updated_at
        "#,
        id,
        completion_time,
        error_details,
    )
    .fetch_optional(executor)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Transition a `computing` row to `abandoned` (Abandoned sweep).
pub async fn mark_abandoned<'e, E>(
    executor: E,
    id: Uuid,
    completion_time: i64,
) -> Result<ComputationRow, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        ComputationRow,
        r#"
        UPDATE computations
        SET state = 'abandoned', completion_time = $2, updated_at = $2
        WHERE id = $1 AND state = 'computing'
        RETURNING id, execution_id, node_name, computation_type, state,
                  ex_revision_at_start, ex_revision_at_completion, scheduled_time,
                  start_time, completion_time, deadline, error_details, computed_with,
                  last_heartbeat_at, heartbeat_deadline, inserted_at, updated_at
        "#,
        id,
        completion_time,
    )
    .fetch_optional(executor)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Heartbeat update for a long-running computation.
pub async fn heartbeat<'e, E>(
    executor: E,
    id: Uuid,
    now: i64,
    heartbeat_deadline: i64,
) -> Result<(), DbError>
where
    E: PgExecutor<'e>,
{
    sqlx::query!(
        r#"UPDATE computations SET last_heartbeat_at = $2, heartbeat_deadline = $3, updated_at = $2
           WHERE id = $1 AND state = 'computing'"#,
        id,
        now,
        heartbeat_deadline,
    )
    .execute(executor)
    .await?;

    Ok(())
}

/// `computing` rows whose deadline or heartbeat has lapsed, across
/// non-archived executions — basis of the Abandoned sweep. Locks the rows
/// `FOR UPDATE` so concurrent sweep batches don't double-process.
pub async fn find_abandonable<'e, E>(
    executor: E,
    now: i64,
    limit: i64,
) -> Result<Vec<ComputationRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as!(
        ComputationRow,
        r#"
        SELECT c.id, c.execution_id, c.node_name, c.computation_type, c.state,
               c.ex_revision_at_start, c.ex_revision_at_completion, c.scheduled_time,
               c.start_time, c.completion_time, c.deadline, c.error_details, c.computed_with,
               c.last_heartbeat_at, c.heartbeat_deadline, c.inserted_at, c.updated_at
        FROM computations c
        JOIN executions e ON e.id = c.execution_id
        WHERE c.state = 'computing'
          AND e.archived_at IS NULL
          AND (
            (c.deadline IS NOT NULL AND c.deadline < $1)
            OR (c.heartbeat_deadline IS NOT NULL AND c.heartbeat_deadline < $1)
          )
        ORDER BY c.deadline ASC NULLS LAST
        LIMIT $2
        FOR UPDATE OF c SKIP LOCKED
        "#,
        now,
        limit,
    )
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

/// `not_set` computations of a schedule kind whose execution was touched
/// more recently than `since` — basis of the ScheduleNodes sweep.
pub async fn find_pending_schedule_kind<'e, E>(
    executor: E,
    since: i64,
    limit: i64,
) -> Result<Vec<ComputationRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as!(
        ComputationRow,
        r#"
        SELECT c.id, c.execution_id, c.node_name, c.computation_type, c.state,
               c.ex_revision_at_start, c.ex_revision_at_completion, c.scheduled_time,
               c.start_time, c.completion_time, c.deadline, c.error_details, c.computed_with,
               c.last_heartbeat_at, c.heartbeat_deadline, c.inserted_at, c.updated_at
        FROM computations c
        JOIN executions e ON e.id = c.execution_id
        WHERE c.state = 'not_set'
          AND c.computation_type IN ('schedule_once', 'schedule_recurring', 'tick_once', 'tick_recurring')
          AND e.archived_at IS NULL
          AND e.updated_at > $1
        ORDER BY e.updated_at ASC
        LIMIT $2
        "#,
        since,
        limit,
    )
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

/// The most recent `success` computation for a recurring-schedule node
/// whose value is in the past and which has no pending `not_set`
/// successor — basis of the RegenerateScheduleRecurring sweep.
pub async fn find_recurring_needing_regeneration<'e, E>(
    executor: E,
    now: i64,
    limit: i64,
) -> Result<Vec<ComputationRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as!(
        ComputationRow,
        r#"
        SELECT c.id, c.execution_id, c.node_name, c.computation_type, c.state,
               c.ex_revision_at_start, c.ex_revision_at_completion, c.scheduled_time,
               c.start_time, c.completion_time, c.deadline, c.error_details, c.computed_with,
               c.last_heartbeat_at, c.heartbeat_deadline, c.inserted_at, c.updated_at
        FROM computations c
        JOIN values v ON v.execution_id = c.execution_id AND v.node_name = c.node_name
        WHERE c.state = 'success'
          AND c.computation_type IN ('schedule_recurring', 'tick_recurring')
          AND v.set_time IS NOT NULL
          AND (v.node_value #>> '{}')::bigint <= $1
          AND NOT EXISTS (
            SELECT 1 FROM computations nxt
            WHERE nxt.execution_id = c.execution_id AND nxt.node_name = c.node_name
              AND nxt.state IN ('not_set', 'computing')
          )
        ORDER BY c.completion_time ASC NULLS LAST
        LIMIT $2
        "#,
        now,
        limit,
    )
    .fetch_all(executor)
    .await?;

    Ok(rows)
}
