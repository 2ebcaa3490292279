//! Built-in node implementations for the auxiliary node kinds named in the
//! data model: historian and schedule nodes. `compute`/`mutate` nodes are
//! supplied by graph authors; these are the only kinds the engine itself
//! ships an implementation for.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{ExecutableNode, NodeError};
use crate::traits::ExecutionContext;

/// Records a bounded, newest-first history of a source node's values.
///
/// Reads its own prior value (`self_name`) and the source node's current
/// value (`source_node`) from `ctx.inputs` — both must be declared as gate
/// dependencies on the graph so the scheduler snapshots them at dispatch.
pub struct HistorianNode {
    pub self_name: String,
    pub source_node: String,
    pub max_entries: usize,
}

impl HistorianNode {
    pub fn new(self_name: impl Into<String>, source_node: impl Into<String>, max_entries: usize) -> Self {
        Self {
            self_name: self_name.into(),
            source_node: source_node.into(),
            max_entries,
        }
    }
}

#[async_trait]
impl ExecutableNode for HistorianNode {
    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let snapshot = ctx.input(&self.source_node);
        let mut history: Vec<Value> = ctx
            .input(&self.self_name)
            .as_array()
            .cloned()
            .unwrap_or_default();

        history.insert(0, snapshot);
        history.truncate(self.max_entries);

        Ok(Value::Array(history))
    }
}

/// Fires once, `delay_seconds` after dispatch. The resulting epoch-second
/// value is used downstream as a "fire at/after" gate.
pub struct ScheduleOnceNode {
    pub delay_seconds: i64,
}

impl ScheduleOnceNode {
    pub fn new(delay_seconds: i64) -> Self {
        Self { delay_seconds }
    }
}

#[async_trait]
impl ExecutableNode for ScheduleOnceNode {
    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        Ok(json!(ctx.now + self.delay_seconds))
    }
}

/// Fires every `interval_seconds`. The node itself only produces the next
/// epoch-second value; the RegenerateScheduleRecurring sweep is responsible
/// for inserting the successor computation once this one is due and has
/// completed.
pub struct ScheduleRecurringNode {
    pub interval_seconds: i64,
}

impl ScheduleRecurringNode {
    pub fn new(interval_seconds: i64) -> Self {
        Self { interval_seconds }
    }
}

#[async_trait]
impl ExecutableNode for ScheduleRecurringNode {
    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        Ok(json!(ctx.now + self.interval_seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ctx(inputs: HashMap<String, Value>, now: i64) -> ExecutionContext {
        ExecutionContext {
            execution_id: "ex_test".into(),
            graph_name: "g".into(),
            graph_version: "1".into(),
            inputs,
            now,
        }
    }

    #[tokio::test]
    async fn historian_prepends_and_caps() {
        let node = HistorianNode::new("hist", "src", 2);
        let mut inputs = HashMap::new();
        inputs.insert("hist".to_string(), json!([1, 2]));
        inputs.insert("src".to_string(), json!(3));

        let out = node.execute(&ctx(inputs, 0)).await.unwrap();
        assert_eq!(out, json!([3, 1]));
    }

    #[tokio::test]
    async fn schedule_once_adds_delay_to_now() {
        let node = ScheduleOnceNode::new(60);
        let out = node.execute(&ctx(HashMap::new(), 1_000)).await.unwrap();
        assert_eq!(out, json!(1_060));
    }
}
