//! Node-level error type.

use thiserror::Error;

/// Errors returned by a node's `execute` method.
///
/// The retry policy is per-node configuration (`max_retries`), not a
/// property of the error itself — both variants are retried identically by
/// the engine up to the node's configured attempt count. The distinction is
/// for the node author: `Fatal` documents "don't bother retrying this",
/// even though today nothing downstream reads it differently.
#[derive(Debug, Error, Clone)]
pub enum NodeError {
    /// Transient failure; likely to succeed on a later attempt.
    #[error("retryable node error: {0}")]
    Retryable(String),

    /// Permanent failure; retrying is unlikely to help.
    #[error("fatal node error: {0}")]
    Fatal(String),
}
