//! Graph definitions.
//!
//! A `GraphDefinition` is the declarative, content-hashed description of an
//! execution's shape: its nodes, their kinds, gating conditions, and
//! retry/timeout configuration. Function bodies (the closures derived nodes
//! invoke) are carried alongside but excluded from the content hash — they
//! aren't serializable and aren't part of the graph's externally-observable
//! identity.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::condition::{describe, Cond};

/// The kind of a node, mirroring `db::models::NodeType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Input,
    Compute,
    Mutate,
    ScheduleOnce,
    ScheduleRecurring,
    TickOnce,
    TickRecurring,
    Archive,
    Historian,
}

impl NodeKind {
    pub fn is_input(self) -> bool {
        matches!(self, Self::Input)
    }

    pub fn is_derived(self) -> bool {
        !self.is_input()
    }

    pub fn as_db_type(self) -> db::models::NodeType {
        use db::models::NodeType as T;
        match self {
            Self::Input => T::Input,
            Self::Compute => T::Compute,
            Self::Mutate => T::Mutate,
            Self::ScheduleOnce => T::ScheduleOnce,
            Self::ScheduleRecurring => T::ScheduleRecurring,
            Self::TickOnce => T::TickOnce,
            Self::TickRecurring => T::TickRecurring,
            Self::Archive => T::Archive,
            Self::Historian => T::Historian,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Compute => "compute",
            Self::Mutate => "mutate",
            Self::ScheduleOnce => "schedule_once",
            Self::ScheduleRecurring => "schedule_recurring",
            Self::TickOnce => "tick_once",
            Self::TickRecurring => "tick_recurring",
            Self::Archive => "archive",
            Self::Historian => "historian",
        }
    }
}

/// Per-node retry/timeout configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// Backoff delays in milliseconds, one per retry attempt; the last
    /// element is reused once `attempts` exceeds the list length.
    pub backoff_strategy_ms: Vec<u64>,
    /// Absolute deadline from computation start, in seconds.
    pub abandon_after_seconds: i64,
    pub heartbeat_interval_seconds: Option<i64>,
    pub heartbeat_timeout_seconds: Option<i64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff_strategy_ms: vec![1_000],
            abandon_after_seconds: 300,
            heartbeat_interval_seconds: None,
            heartbeat_timeout_seconds: None,
        }
    }
}

impl RetryConfig {
    /// The backoff to apply for the `attempts`-th retry (0-indexed),
    /// clamped to the last configured element.
    pub fn backoff_for(&self, attempts: usize) -> std::time::Duration {
        let idx = attempts.min(self.backoff_strategy_ms.len().saturating_sub(1));
        std::time::Duration::from_millis(self.backoff_strategy_ms.get(idx).copied().unwrap_or(0))
    }

    fn describe(&self) -> String {
        format!(
            "retry(max={},backoff={:?},abandon={},hb={:?}/{:?})",
            self.max_retries,
            self.backoff_strategy_ms,
            self.abandon_after_seconds,
            self.heartbeat_interval_seconds,
            self.heartbeat_timeout_seconds
        )
    }
}

/// A single node in a graph definition.
#[derive(Clone)]
pub struct NodeDef {
    pub name: String,
    pub kind: NodeKind,
    /// Gating condition; `None` for input nodes (always satisfiable, but
    /// never auto-dispatched since they're written by the mutation API).
    pub condition: Option<Cond>,
    /// The node (or, for `mutate`, the mutation target) this computation
    /// invokes. `None` for `input` nodes, which have no compute step.
    pub executable: Option<Arc<dyn nodes::ExecutableNode>>,
    /// For `mutate` nodes: the node whose value this one overwrites.
    pub mutates: Option<String>,
    pub retry: RetryConfig,
    /// `f_on_save`: best-effort side effect invoked after a successful
    /// commit, outside the transaction.
    pub on_save: Option<Arc<dyn Fn(&serde_json::Value) + Send + Sync>>,
}

impl std::fmt::Debug for NodeDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("mutates", &self.mutates)
            .finish()
    }
}

impl NodeDef {
    pub fn input(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Input,
            condition: None,
            executable: None,
            mutates: None,
            retry: RetryConfig::default(),
            on_save: None,
        }
    }

    pub fn derived(
        name: impl Into<String>,
        kind: NodeKind,
        condition: Cond,
        executable: Arc<dyn nodes::ExecutableNode>,
    ) -> Self {
        assert!(kind.is_derived(), "derived() called with NodeKind::Input");
        Self {
            name: name.into(),
            kind,
            condition: Some(condition),
            executable: Some(executable),
            mutates: None,
            retry: RetryConfig::default(),
            on_save: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_mutates(mut self, target: impl Into<String>) -> Self {
        self.mutates = Some(target.into());
        self
    }

    pub fn with_on_save(mut self, f: impl Fn(&serde_json::Value) + Send + Sync + 'static) -> Self {
        self.on_save = Some(Arc::new(f));
        self
    }

    /// The node whose value row this computation writes: itself, unless
    /// it's a `mutate` node targeting another node.
    pub fn target_node(&self) -> &str {
        self.mutates.as_deref().unwrap_or(&self.name)
    }
}

/// A complete graph definition, identified by `(name, version)` and
/// content-hashed for drift detection.
#[derive(Clone)]
pub struct GraphDefinition {
    pub name: String,
    pub version: String,
    pub nodes: Vec<NodeDef>,
}

impl GraphDefinition {
    pub fn new(name: impl Into<String>, version: impl Into<String>, nodes: Vec<NodeDef>) -> Self {
        Self { name: name.into(), version: version.into(), nodes }
    }

    pub fn node(&self, name: &str) -> Option<&NodeDef> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Content hash over node names/kinds/conditions/retry-config and
    /// mutation targets — explicitly excluding function closures, which
    /// aren't hashable. Two definitions with identical shape but different
    /// closures hash identically; that's intentional — the closure is an
    /// implementation detail of the bound process, not part of externally
    /// observable graph identity.
    pub fn graph_hash(&self) -> String {
        let mut descriptor = format!("{}@{}\n", self.name, self.version);
        let mut nodes = self.nodes.clone();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        for n in &nodes {
            descriptor.push_str(&format!(
                "node={} kind={} mutates={:?} retry={} cond={}\n",
                n.name,
                n.kind.describe(),
                n.mutates,
                n.retry.describe(),
                n.condition.as_ref().map(describe).unwrap_or_default(),
            ));
        }

        let mut hasher = Sha256::new();
        hasher.update(descriptor.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Cond;
    use nodes::builtins::ScheduleOnceNode;

    #[test]
    fn hash_is_stable_across_node_order() {
        let a = GraphDefinition::new(
            "g",
            "1",
            vec![
                NodeDef::input("x"),
                NodeDef::derived("y", NodeKind::ScheduleOnce, Cond::all_provided(["x"]), Arc::new(ScheduleOnceNode::new(1))),
            ],
        );
        let b = GraphDefinition::new(
            "g",
            "1",
            vec![
                NodeDef::derived("y", NodeKind::ScheduleOnce, Cond::all_provided(["x"]), Arc::new(ScheduleOnceNode::new(1))),
                NodeDef::input("x"),
            ],
        );
        assert_eq!(a.graph_hash(), b.graph_hash());
    }

    #[test]
    fn hash_changes_with_condition_shape() {
        let a = GraphDefinition::new(
            "g",
            "1",
            vec![NodeDef::input("x"), NodeDef::derived("y", NodeKind::Compute, Cond::all_provided(["x"]), Arc::new(ScheduleOnceNode::new(1)))],
        );
        let b = GraphDefinition::new(
            "g",
            "1",
            vec![NodeDef::input("x"), NodeDef::derived("y", NodeKind::Compute, Cond::all_provided(["x", "z"]), Arc::new(ScheduleOnceNode::new(1)))],
        );
        assert_ne!(a.graph_hash(), b.graph_hash());
    }
}
