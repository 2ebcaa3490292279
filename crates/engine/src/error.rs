//! Engine-level error types.

use thiserror::Error;

/// Errors produced by the dataflow engine: graph catalog, condition
/// evaluator, scheduler, worker, mutation and read APIs, migration.
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ User-input errors (raised synchronously, descriptive) ------

    /// `set`/`unset` targeted a node that isn't `input`.
    #[error("node '{0}' is not an input node and cannot be mutated directly")]
    NotAnInputNode(String),

    /// A forced retry targeted an `input` node, which has no computation to retry.
    #[error("node '{0}' is an input node and has no computation to retry")]
    CannotRetryInputNode(String),

    /// A referenced node doesn't exist in the bound graph definition.
    #[error("no such node '{0}' in graph '{1}' version '{2}'")]
    NodeNotFound(String, String, String),

    /// A map value or metadata object contained a non-string key.
    #[error("map keys must be strings (node '{0}')")]
    NonStringMapKey(String),

    /// `get(..., wait: newer)` was called with only an execution id, not a
    /// baseline revision.
    #[error("wait mode 'newer' requires a baseline revision, not just an execution id")]
    InvalidWait,

    /// A caller-supplied timeout was not a positive integer or `infinity`.
    #[error("timeout must be a positive number of milliseconds or infinite")]
    InvalidTimeout,

    // ------ Read outcomes (not failures, but typed non-success results) ------

    /// The value has never been set.
    #[error("value for node '{0}' has not been set")]
    NotSet(String),

    /// The node's most recent computation terminated without a pending
    /// successor: a permanent computation failure.
    #[error("computation for node '{0}' failed and no retry is pending")]
    ComputationFailed(String),

    // ------ Catalog / migration errors ------

    /// The execution's `(graph_name, graph_version)` is no longer registered.
    #[error("graph '{0}' version '{1}' is not registered in the catalog")]
    GraphNotRegistered(String, String),

    /// The execution referenced by id doesn't exist.
    #[error("no such execution '{0}'")]
    ExecutionNotFound(String),

    // ------ Node execution errors ------

    /// A node's user function reported `{error, reason}` (or panicked).
    #[error("node '{node_name}' computation failed: {reason}")]
    NodeExecutionFailed { node_name: String, reason: String },

    // ------ Persistence / infra ------

    /// Persistence error from the db crate.
    #[error("database error: {0}")]
    Database(#[from] db::DbError),

    /// Error from the kick hub / sweep driver.
    #[error("queue error: {0}")]
    Queue(#[from] queue::QueueError),
}
