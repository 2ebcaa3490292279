//! Read API with waiting: block a caller until a node's value is set or
//! advances past a baseline revision, instead of making them poll.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::timeout as tokio_timeout;

use db::models::ComputationState;
use db::DbPool;

use crate::EngineError;

/// How long `get` is willing to wait for a value.
#[derive(Debug, Clone, Copy)]
pub enum Timeout {
    Millis(u64),
    Infinity,
}

impl Timeout {
    fn validate(self) -> Result<Self, EngineError> {
        if let Timeout::Millis(0) = self {
            return Err(EngineError::InvalidTimeout);
        }
        Ok(self)
    }
}

/// What `get` should wait for before returning.
#[derive(Debug, Clone, Copy)]
pub enum WaitMode {
    /// Single snapshot read; the default.
    Immediate,
    /// Return as soon as the value is set.
    Any,
    /// Wait until the value's revision exceeds `baseline`.
    Newer { baseline: i64 },
}

/// The result of a successful `get`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadOutcome {
    pub value: Value,
    pub revision: i64,
}

/// Read a node's value, optionally waiting for it to be set or to advance
/// past a baseline revision.
pub async fn get(
    pool: &DbPool,
    hub: &queue::KickHub,
    execution_id: &str,
    node_name: &str,
    wait: WaitMode,
    timeout: Timeout,
) -> Result<ReadOutcome, EngineError> {
    let timeout = timeout.validate()?;

    let deadline = match timeout {
        Timeout::Millis(ms) => Some(tokio::time::Instant::now() + Duration::from_millis(ms)),
        Timeout::Infinity => None,
    };

    loop {
        if let Some(outcome) = try_read(pool, execution_id, node_name, wait).await? {
            return Ok(outcome);
        }

        if matches!(wait, WaitMode::Immediate) {
            return Err(EngineError::NotSet(node_name.to_string()));
        }

        let mut rx = hub.subscribe(execution_id);
        let wait_fut = rx.changed();

        match deadline {
            None => {
                if wait_fut.await.is_err() {
                    return Err(EngineError::NotSet(node_name.to_string()));
                }
            }
            Some(d) => {
                let remaining = d.saturating_duration_since(tokio::time::Instant::now());
                if remaining.is_zero() {
                    return Err(EngineError::NotSet(node_name.to_string()));
                }
                // Belt-and-braces: also poll periodically in case a kick was missed.
                match tokio_timeout(remaining.min(Duration::from_millis(250)), wait_fut).await {
                    Ok(Ok(())) => {}
                    Ok(Err(_)) => return Err(EngineError::NotSet(node_name.to_string())),
                    Err(_) => {
                        if tokio::time::Instant::now() >= d {
                            return Err(EngineError::NotSet(node_name.to_string()));
                        }
                    }
                }
            }
        }
    }
}

async fn try_read(
    pool: &DbPool,
    execution_id: &str,
    node_name: &str,
    wait: WaitMode,
) -> Result<Option<ReadOutcome>, EngineError> {
    let row = db::repository::values::get_value(pool, execution_id, node_name).await?;

    if row.set_time.is_some() {
        let revision = row.ex_revision.unwrap_or(0);
        let satisfies_baseline = match wait {
            WaitMode::Newer { baseline } => revision > baseline,
            WaitMode::Immediate | WaitMode::Any => true,
        };
        if satisfies_baseline {
            return Ok(Some(ReadOutcome { value: row.node_value, revision }));
        }
        return Ok(None);
    }

    // Not set. If the node's most recent computation is terminal with no
    // pending successor, this is a permanent failure.
    let pending = db::repository::computations::list_pending(pool, execution_id).await?;
    let has_pending = pending.iter().any(|c| c.node_name == node_name);
    if !has_pending {
        let terminal = db::repository::computations::terminal_since_last_success(pool, execution_id, node_name).await?;
        if terminal.iter().any(|c| c.state() == ComputationState::Failed || c.state() == ComputationState::Abandoned) {
            return Err(EngineError::ComputationFailed(node_name.to_string()));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_millis_timeout_is_invalid() {
        assert!(matches!(Timeout::Millis(0).validate(), Err(EngineError::InvalidTimeout)));
    }

    #[test]
    fn positive_timeout_is_valid() {
        assert!(Timeout::Millis(10).validate().is_ok());
    }
}
