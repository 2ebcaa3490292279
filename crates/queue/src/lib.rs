//! `queue` crate — in-process kick hub and generic background-sweep driver.
//!
//! The dataflow engine has no durable work queue separate from its
//! `computations` rows, so this crate carries no job table: it is purely
//! the in-process optimization layer on top of the database-driven sweeps:
//! an explicit in-process channel keyed by execution_id for kicks, and the
//! common preflight/advisory-lock/audit-row shape for sweeps.

pub mod error;
pub mod kick;
pub mod sweep;

pub use error::QueueError;
pub use kick::KickHub;
pub use sweep::{SweepBody, SweepRunner};
