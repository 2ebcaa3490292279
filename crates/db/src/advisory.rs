//! Postgres transaction-scoped advisory locks.
//!
//! Used to serialize background sweeps (one lock per sweep type) and
//! per-execution migrations. Locks are acquired
//! non-blocking (`pg_try_advisory_xact_lock`) and auto-release at
//! commit/rollback of the transaction that took them.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::{DbError, Tx};

/// Hash an arbitrary string key down to the `i64` keyspace
/// `pg_try_advisory_xact_lock` expects. `DefaultHasher` is deterministic
/// across processes (unlike `HashMap`'s randomized `RandomState`), so the
/// same key always maps to the same lock id.
fn lock_key(key: &str) -> i64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish() as i64
}

/// Attempt to take a transaction-scoped advisory lock keyed by `key`.
///
/// Returns `true` if the lock was acquired, `false` if another session
/// already holds it. Never blocks.
pub async fn try_xact_lock(tx: &mut Tx<'_>, key: &str) -> Result<bool, DbError> {
    let id = lock_key(key);
    let row: (bool,) = sqlx::query_as("SELECT pg_try_advisory_xact_lock($1)")
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;
    Ok(row.0)
}
