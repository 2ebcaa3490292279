//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models — they carry no scheduling behaviour.
//! Domain types (graphs, conditions, retry policy) live in the `engine` crate.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// executions
// ---------------------------------------------------------------------------

/// A persisted execution row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionRow {
    pub id: String,
    pub graph_name: String,
    pub graph_version: String,
    pub graph_hash: String,
    pub revision: i64,
    pub archived_at: Option<i64>,
    pub inserted_at: i64,
    pub updated_at: i64,
}

// ---------------------------------------------------------------------------
// values
// ---------------------------------------------------------------------------

/// Node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum NodeType {
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

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Input => "input",
            Self::Compute => "compute",
            Self::Mutate => "mutate",
            Self::ScheduleOnce => "schedule_once",
            Self::ScheduleRecurring => "schedule_recurring",
            Self::TickOnce => "tick_once",
            Self::TickRecurring => "tick_recurring",
            Self::Archive => "archive",
            Self::Historian => "historian",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for NodeType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" => Ok(Self::Input),
            "compute" => Ok(Self::Compute),
            "mutate" => Ok(Self::Mutate),
            "schedule_once" => Ok(Self::ScheduleOnce),
            "schedule_recurring" => Ok(Self::ScheduleRecurring),
            "tick_once" => Ok(Self::TickOnce),
            "tick_recurring" => Ok(Self::TickRecurring),
            "archive" => Ok(Self::Archive),
            "historian" => Ok(Self::Historian),
            other => Err(format!("unknown node type: {other}")),
        }
    }
}

impl NodeType {
    /// Schedule-kind nodes are polled by the ScheduleNodes/UnblockedBySchedule sweeps.
    pub fn is_schedule_kind(self) -> bool {
        matches!(
            self,
            Self::ScheduleOnce | Self::ScheduleRecurring | Self::TickOnce | Self::TickRecurring
        )
    }

    pub fn is_recurring(self) -> bool {
        matches!(self, Self::ScheduleRecurring | Self::TickRecurring)
    }

    pub fn is_input(self) -> bool {
        matches!(self, Self::Input)
    }
}

/// A persisted value row — one per `(execution_id, node_name)`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ValueRow {
    pub id: Uuid,
    pub execution_id: String,
    pub node_name: String,
    pub node_type: String,
    pub node_value: serde_json::Value,
    pub set_time: Option<i64>,
    pub ex_revision: Option<i64>,
    pub metadata: Option<serde_json::Value>,
    pub inserted_at: i64,
    pub updated_at: i64,
}

impl ValueRow {
    /// A value that has never been set (distinct from an explicit JSON `null`).
    pub fn is_set(&self) -> bool {
        self.set_time.is_some()
    }
}

// ---------------------------------------------------------------------------
// computations
// ---------------------------------------------------------------------------

/// Computation lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum ComputationState {
    NotSet,
    Computing,
    Success,
    Failed,
    Abandoned,
    Cancelled,
}

impl ComputationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Abandoned | Self::Cancelled)
    }

    pub fn is_pending(self) -> bool {
        matches!(self, Self::NotSet | Self::Computing)
    }
}

impl std::fmt::Display for ComputationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotSet => "not_set",
            Self::Computing => "computing",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ComputationState {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_set" => Ok(Self::NotSet),
            "computing" => Ok(Self::Computing),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "abandoned" => Ok(Self::Abandoned),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown computation state: {other}")),
        }
    }
}

/// A persisted computation row. Multiple per node; at most one in
/// `{not_set, computing}` at a time (invariant 2).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ComputationRow {
    pub id: Uuid,
    pub execution_id: String,
    pub node_name: String,
    pub computation_type: String,
    pub state: String,
    pub ex_revision_at_start: Option<i64>,
    pub ex_revision_at_completion: Option<i64>,
    pub scheduled_time: Option<i64>,
    pub start_time: Option<i64>,
    pub completion_time: Option<i64>,
    pub deadline: Option<i64>,
    pub error_details: Option<String>,
    pub computed_with: Option<serde_json::Value>,
    pub last_heartbeat_at: Option<i64>,
    pub heartbeat_deadline: Option<i64>,
    pub inserted_at: i64,
    pub updated_at: i64,
}

impl ComputationRow {
    pub fn state(&self) -> ComputationState {
        self.state.parse().expect("state column holds a valid ComputationState")
    }
}

// ---------------------------------------------------------------------------
// sweep_runs
// ---------------------------------------------------------------------------

/// The kind of background sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepKind {
    Abandoned,
    ScheduleNodes,
    UnblockedBySchedule,
    RegenerateScheduleRecurring,
    StalledExecutions,
    MissedSchedulesCatchall,
}

impl std::fmt::Display for SweepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Abandoned => "abandoned",
            Self::ScheduleNodes => "schedule_nodes",
            Self::UnblockedBySchedule => "unblocked_by_schedule",
            Self::RegenerateScheduleRecurring => "regenerate_schedule_recurring",
            Self::StalledExecutions => "stalled_executions",
            Self::MissedSchedulesCatchall => "missed_schedules_catchall",
        };
        write!(f, "{s}")
    }
}

/// An audit row for a single run of a background sweep.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SweepRunRow {
    pub id: Uuid,
    pub sweep_type: String,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub executions_processed: Option<i32>,
    pub inserted_at: i64,
    pub updated_at: i64,
}
