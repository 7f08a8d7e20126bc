//! `db` crate: pure persistence layer.
//!
//! Provides a MySQL connection pool, typed row structs, repository functions
//! for the incident schema, and the [`IncidentStore`] transaction seam the
//! creation workflow runs against. No business logic lives here.

pub mod error;
pub mod pool;
pub mod repository;
pub mod models;
pub mod store;
pub mod mock;

pub use pool::DbPool;
pub use error::{ConstraintKind, DbError};
pub use store::{IncidentStore, IncidentTx, MySqlIncidentStore};
