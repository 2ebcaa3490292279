//! Gating condition evaluator.
//!
//! A condition is a small boolean-tree DSL over the current value state of
//! an execution. Evaluation is pure and synchronous — no I/O, no awaiting —
//! so it can run inside the scheduler's row-locked transaction without
//! holding the lock across a suspension point.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use db::models::ValueRow;

/// A named, stable predicate over a set value. Identified by `id` so two
/// conditions built from the "same" predicate compare equal and hash
/// identically — required for graph content hashing.
#[derive(Clone)]
pub struct Predicate {
    pub id: &'static str,
    pub f: Arc<dyn Fn(&serde_json::Value) -> bool + Send + Sync>,
}

impl Predicate {
    pub fn new(id: &'static str, f: impl Fn(&serde_json::Value) -> bool + Send + Sync + 'static) -> Self {
        Self { id, f: Arc::new(f) }
    }

    /// The trivial predicate: true for any set value. Used by the `[nodes…]`
    /// list-sugar form ("and over `{node, provided?}`").
    pub fn provided() -> Self {
        Self::new("provided", |_| true)
    }
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predicate").field("id", &self.id).finish()
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Predicate {}

impl std::hash::Hash for Predicate {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A gating condition tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cond {
    Leaf { node_name: String, predicate: Predicate },
    And(Vec<Cond>),
    Or(Vec<Cond>),
    Not(Box<Cond>),
}

impl Cond {
    /// Sugar: `and` over `{node, provided?}` for each name.
    pub fn all_provided(node_names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Cond::And(
            node_names
                .into_iter()
                .map(|n| Cond::Leaf { node_name: n.into(), predicate: Predicate::provided() })
                .collect(),
        )
    }
}

/// A stable string describing a condition tree's shape and predicate ids,
/// for graph content hashing (function bodies are excluded from the hash,
/// but which predicate id gates which node is part of the graph's identity).
pub fn describe(cond: &Cond) -> String {
    match cond {
        Cond::Leaf { node_name, predicate } => format!("leaf({node_name},{})", predicate.id),
        Cond::And(children) => format!("and({})", children.iter().map(describe).collect::<Vec<_>>().join(",")),
        Cond::Or(children) => format!("or({})", children.iter().map(describe).collect::<Vec<_>>().join(",")),
        Cond::Not(child) => format!("not({})", describe(child)),
    }
}

/// Outcome of evaluating a condition against a value snapshot: which leaves
/// were met and which weren't, so tooling can explain why a node is blocked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvalResult {
    pub met: bool,
    pub leaves_met: Vec<String>,
    pub leaves_unmet: Vec<String>,
}

/// Evaluate `cond` against the given value snapshot. Unknown node names are
/// treated as unmet rather than erroring — graph validation is expected to
/// reject dangling references up front.
pub fn evaluate(cond: &Cond, values: &HashMap<String, ValueRow>) -> EvalResult {
    let mut leaves_met = Vec::new();
    let mut leaves_unmet = Vec::new();
    let met = eval_inner(cond, values, &mut leaves_met, &mut leaves_unmet);
    EvalResult { met, leaves_met, leaves_unmet }
}

fn eval_inner(
    cond: &Cond,
    values: &HashMap<String, ValueRow>,
    leaves_met: &mut Vec<String>,
    leaves_unmet: &mut Vec<String>,
) -> bool {
    match cond {
        Cond::Leaf { node_name, predicate } => {
            let met = match values.get(node_name) {
                Some(row) if row.is_set() => (predicate.f)(&row.node_value),
                _ => false,
            };
            if met {
                leaves_met.push(node_name.clone());
            } else {
                leaves_unmet.push(node_name.clone());
            }
            met
        }
        Cond::And(children) => {
            // Evaluate all children so leaves_met/leaves_unmet are complete,
            // even once one child is already known unmet.
            children
                .iter()
                .map(|c| eval_inner(c, values, leaves_met, leaves_unmet))
                .fold(true, |acc, m| acc && m)
        }
        Cond::Or(children) => children
            .iter()
            .map(|c| eval_inner(c, values, leaves_met, leaves_unmet))
            .fold(false, |acc, m| acc || m),
        Cond::Not(child) => {
            // A `Not` leaf contributes no leaves of its own to the explain
            // output; only its descendant leaves are reported.
            !eval_inner(child, values, leaves_met, leaves_unmet)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::models::ValueRow;
    use serde_json::json;
    use uuid::Uuid;

    fn set_row(node_name: &str, value: serde_json::Value) -> ValueRow {
        ValueRow {
            id: Uuid::new_v4(),
            execution_id: "ex_1".into(),
            node_name: node_name.into(),
            node_type: "input".into(),
            node_value: value,
            set_time: Some(100),
            ex_revision: Some(1),
            metadata: None,
            inserted_at: 100,
            updated_at: 100,
        }
    }

    #[test]
    fn and_requires_all_leaves() {
        let cond = Cond::all_provided(["a", "b"]);
        let mut values = HashMap::new();
        values.insert("a".to_string(), set_row("a", json!(1)));

        let result = evaluate(&cond, &values);
        assert!(!result.met);
        assert_eq!(result.leaves_met, vec!["a"]);
        assert_eq!(result.leaves_unmet, vec!["b"]);
    }

    #[test]
    fn or_is_met_if_any_leaf_met() {
        let cond = Cond::Or(vec![
            Cond::Leaf { node_name: "a".into(), predicate: Predicate::provided() },
            Cond::Leaf { node_name: "b".into(), predicate: Predicate::provided() },
        ]);
        let mut values = HashMap::new();
        values.insert("b".to_string(), set_row("b", json!(true)));

        assert!(evaluate(&cond, &values).met);
    }

    #[test]
    fn unset_value_is_unmet_even_with_trivial_predicate() {
        let cond = Cond::all_provided(["a"]);
        let values = HashMap::new();
        let result = evaluate(&cond, &values);
        assert!(!result.met);
        assert_eq!(result.leaves_unmet, vec!["a"]);
    }

    #[test]
    fn predicate_with_custom_logic() {
        let cond = Cond::Leaf {
            node_name: "n".into(),
            predicate: Predicate::new("is_true", |v| v.as_bool() == Some(true)),
        };
        let mut values = HashMap::new();
        values.insert("n".to_string(), set_row("n", json!(false)));
        assert!(!evaluate(&cond, &values).met);
    }
}
