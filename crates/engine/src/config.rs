//! Engine-wide configuration.

/// Sweep and store settings for one deployment, with conservative defaults.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub stalled_executions: StalledExecutionsConfig,
    pub missed_schedules_catchall: MissedSchedulesCatchallConfig,
    pub schedule_nodes: ScheduleNodesConfig,
    pub store_backend: StoreBackend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Relational,
    InMemory,
}

#[derive(Debug, Clone)]
pub struct StalledExecutionsConfig {
    pub enabled: bool,
    /// UTC hour restriction; `None` = no restriction.
    pub preferred_hour: Option<u8>,
    pub min_seconds_between_runs: i64,
    pub too_new_cutoff_seconds: i64,
    pub overlap_seconds: i64,
}

impl Default for StalledExecutionsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            preferred_hour: None,
            min_seconds_between_runs: 30 * 60,
            too_new_cutoff_seconds: 10 * 60,
            overlap_seconds: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MissedSchedulesCatchallConfig {
    pub enabled: bool,
    pub preferred_hour: Option<u8>,
    pub lookback_days: i64,
    pub min_seconds_between_runs: i64,
    /// How recent a schedule value must *not* be to count as "missed"
    /// (values newer than this are left to the regular sweeps).
    pub recency_boundary_seconds: i64,
}

impl Default for MissedSchedulesCatchallConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            preferred_hour: Some(2),
            lookback_days: 7,
            min_seconds_between_runs: 23 * 60 * 60,
            recency_boundary_seconds: 30 * 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleNodesConfig {
    pub min_seconds_between_runs: i64,
    pub overlap_seconds: i64,
}

impl Default for ScheduleNodesConfig {
    fn default() -> Self {
        Self { min_seconds_between_runs: 120, overlap_seconds: 15 }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stalled_executions: StalledExecutionsConfig::default(),
            missed_schedules_catchall: MissedSchedulesCatchallConfig::default(),
            schedule_nodes: ScheduleNodesConfig::default(),
            store_backend: StoreBackend::Relational,
        }
    }
}
