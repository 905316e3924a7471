//! CockroachDB connection over the Postgres wire protocol.
//!
//! Statements come from `roachops_core::sql`; this module binds their
//! parameters, runs them through a lazily connecting `sqlx` pool and decodes
//! the returned rows.

mod connection;
mod conversions;
mod error;

pub use connection::CockroachConnection;
