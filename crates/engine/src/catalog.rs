//! Graph Catalog: process-wide `(name, version) -> GraphDefinition` registry.
//!
//! Registration is idempotent-overwrite (last-write-wins); lookups are
//! reads of a shared, lock-guarded map — each process registers its own
//! graph definitions at startup.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::graph::GraphDefinition;

#[derive(Clone, Default)]
pub struct GraphCatalog {
    inner: Arc<RwLock<HashMap<(String, String), Arc<GraphDefinition>>>>,
}

impl GraphCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a graph definition, overwriting any prior definition for
    /// the same `(name, version)`.
    pub fn register(&self, def: GraphDefinition) {
        let key = (def.name.clone(), def.version.clone());
        self.inner.write().expect("catalog lock poisoned").insert(key, Arc::new(def));
    }

    pub fn get(&self, name: &str, version: &str) -> Option<Arc<GraphDefinition>> {
        self.inner
            .read()
            .expect("catalog lock poisoned")
            .get(&(name.to_string(), version.to_string()))
            .cloned()
    }

    /// Look up the graph definition bound to an execution, loading its
    /// `(graph_name, graph_version)` from the store first. Returns `None`
    /// both when the execution doesn't exist and when its graph is no
    /// longer registered — callers that need to tell those apart should
    /// load the execution row themselves.
    pub async fn get_execution_graph(&self, pool: &db::DbPool, execution_id: &str) -> Option<Arc<GraphDefinition>> {
        let execution = db::repository::executions::get_execution(pool, execution_id).await.ok()?;
        self.get(&execution.graph_name, &execution.graph_version)
    }

    /// All versions registered for `name`, sorted descending by version
    /// string.
    pub fn list(&self, name: &str) -> Vec<Arc<GraphDefinition>> {
        let guard = self.inner.read().expect("catalog lock poisoned");
        let mut matches: Vec<Arc<GraphDefinition>> = guard
            .values()
            .filter(|d| d.name == name)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.version.cmp(&a.version));
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Cond;
    use crate::graph::{NodeDef, NodeKind};
    use nodes::builtins::ScheduleOnceNode;
    use std::sync::Arc as StdArc;

    fn def(name: &str, version: &str) -> GraphDefinition {
        GraphDefinition::new(
            name,
            version,
            vec![
                NodeDef::input("x"),
                NodeDef::derived("y", NodeKind::ScheduleOnce, Cond::all_provided(["x"]), StdArc::new(ScheduleOnceNode::new(1))),
            ],
        )
    }

    #[test]
    fn register_then_get_roundtrips() {
        let catalog = GraphCatalog::new();
        catalog.register(def("g", "1"));
        assert!(catalog.get("g", "1").is_some());
        assert!(catalog.get("g", "2").is_none());
    }

    #[test]
    fn registering_same_key_overwrites() {
        let catalog = GraphCatalog::new();
        catalog.register(def("g", "1"));
        let h1 = catalog.get("g", "1").unwrap().graph_hash();
        catalog.register(def("g", "1"));
        let h2 = catalog.get("g", "1").unwrap().graph_hash();
        assert_eq!(h1, h2);
    }

    #[test]
    fn list_sorts_versions_descending() {
        let catalog = GraphCatalog::new();
        catalog.register(def("g", "1"));
        catalog.register(def("g", "3"));
        catalog.register(def("g", "2"));
        let versions: Vec<String> = catalog.list("g").iter().map(|d| d.version.clone()).collect();
        assert_eq!(versions, vec!["3", "2", "1"]);
    }
}
