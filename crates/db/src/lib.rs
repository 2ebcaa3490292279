//! `db` crate — pure persistence layer for the Journey dataflow engine.
//!
//! Provides a connection pool, typed row structs, and repository functions
//! for every table in the schema. No scheduling logic lives here.

pub mod advisory;
pub mod error;
pub mod models;
pub mod pool;
pub mod repository;

pub use error::DbError;
pub use pool::{DbPool, Tx};
