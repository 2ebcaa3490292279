//! The `ExecutableNode` trait — the contract every node must fulfil.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::NodeError;

/// Shared context passed to a node at dispatch time.
///
/// Defined here (in the nodes crate) so both the engine and individual node
/// implementations can import it without a circular dependency.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// ID of the execution this computation belongs to.
    pub execution_id: String,
    /// Name of the graph definition bound to the execution.
    pub graph_name: String,
    /// Version of the graph definition bound to the execution.
    pub graph_version: String,
    /// Upstream value snapshots taken at dispatch time, keyed by node name.
    pub inputs: HashMap<String, Value>,
    /// Wall-clock epoch seconds at dispatch time, so schedule nodes compute
    /// deterministically off the snapshot the worker captured rather than
    /// calling the clock themselves.
    pub now: i64,
}

impl ExecutionContext {
    /// Fetch an upstream value by node name, or JSON `null` if absent.
    pub fn input(&self, node_name: &str) -> Value {
        self.inputs.get(node_name).cloned().unwrap_or(Value::Null)
    }
}

/// The core node trait.
///
/// Every derived node kind (`compute`, `mutate`, `schedule_once`,
/// `schedule_recurring`, `tick_once`, `tick_recurring`, `historian`) is
/// dispatched through this trait. The engine treats any `Err` as a failed
/// computation; it never panics across this boundary.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    /// Execute the node, given the upstream values captured in `ctx`, and
    /// return this node's (or, for `mutate` nodes, the mutation target's)
    /// new value.
    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value, NodeError>;
}
