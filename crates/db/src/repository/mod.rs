//! Repository functions: one function per database operation.
//!
//! Every function takes a sqlx executor (pool, connection, or open
//! transaction) and returns a `Result<T, DbError>`. Values are always bound
//! as parameters. No business logic, no payload types: pure SQL.

pub mod incidents;
pub mod crew;
