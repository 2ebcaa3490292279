//! Repository functions — one function per database operation.
//!
//! Every function is generic over `sqlx::PgExecutor` so callers can pass
//! either `&DbPool` (autocommit) or `&mut *tx` (inside a transaction the
//! caller controls, e.g. the scheduler's execution-row lock). No scheduling
//! logic lives here — pure SQL plus row <-> struct mapping.

pub mod computations;
pub mod executions;
pub mod sweep_runs;
pub mod values;
