//! Functional core of roachops: table models, record validation, SQL
//! building and the connection seam. Nothing in this crate performs I/O.

pub mod error;
pub mod fixtures;
pub mod operations;
pub mod record;
pub mod schema;
pub mod sql;

pub use error::{OperationsError, Result};
