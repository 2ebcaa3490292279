//! Background Sweeps: database-driven recovery tasks that
//! re-issue kicks for executions the in-memory signal path may have missed.
//!
//! Each submodule is one concrete sweep; all share the preflight check in
//! [`due`] and the batch-processing shape provided by `queue::SweepRunner`.

pub mod abandoned;
pub mod missed_schedules_catchall;
pub mod regenerate_schedule_recurring;
pub mod schedule_nodes;
pub mod stalled_executions;
pub mod unblocked_by_schedule;

use chrono::{DateTime, Timelike, Utc};
use db::DbPool;

use crate::EngineError;

/// Cheap preflight: is the sweep enabled, is the preferred-hour restriction
/// (if any) satisfied, and has enough wall time passed since the last run?
pub(crate) async fn due(
    pool: &DbPool,
    sweep_type: &str,
    enabled: bool,
    preferred_hour: Option<u8>,
    min_seconds_between_runs: i64,
    now: i64,
) -> Result<bool, EngineError> {
    if !enabled {
        return Ok(false);
    }

    if !hour_matches(now, preferred_hour) {
        return Ok(false);
    }

    let last = db::repository::sweep_runs::last_completed(pool, sweep_type).await?;
    match last {
        Some(run) => Ok(now - run.started_at >= min_seconds_between_runs),
        None => Ok(true),
    }
}

/// Whether `now` (epoch seconds) falls in the UTC hour `preferred_hour`
/// names, or trivially true when there's no restriction.
fn hour_matches(now: i64, preferred_hour: Option<u8>) -> bool {
    match preferred_hour {
        None => true,
        Some(hour) => DateTime::<Utc>::from_timestamp(now, 0).map(|dt| dt.hour() as u8) == Some(hour),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_restriction_always_matches() {
        assert!(hour_matches(0, None));
        assert!(hour_matches(1_700_000_000, None));
    }

    #[test]
    fn restriction_matches_only_that_utc_hour() {
        // 2023-11-14T22:13:20Z
        let ts = 1_700_000_000i64;
        let actual_hour = DateTime::<Utc>::from_timestamp(ts, 0).unwrap().hour() as u8;
        assert!(hour_matches(ts, Some(actual_hour)));
        assert!(!hour_matches(ts, Some((actual_hour + 1) % 24)));
    }
}
