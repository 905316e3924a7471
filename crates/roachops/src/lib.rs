//! Create, seed and query CockroachDB tables.
//!
//! The imperative shell around `roachops_core`: connection configuration,
//! the CockroachDB and in-memory connections and the `Operations` entry point.

pub mod config;
pub mod connection;
pub mod operations;

pub use config::{ConfigError, ConnectionConfig, Dialect};
pub use operations::Operations;
