//! Database layer - connection pool, migrations and repositories
//!
//! # Design Principles
//!
//! - One shared `PgPool`, no per-request connections
//! - List operations use JOINs or batched `= ANY($1)` lookups, never N+1
//! - Rely on DB constraints and handle conflicts, no check-then-insert
//! - Counters change in the same transaction as the row that moves them

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repos;

pub use error::DbError;
pub use pool::{create_pool, create_pool_with_options};
pub use repos::*;
