//! sqlx error mapping.
//!
//! Maps `sqlx::Error` to `OperationsError` from `roachops_core`.
//! Constraint violations become semantic variants; everything the pool
//! reports while reaching the server becomes `ConnectionFailed`.

use roachops_core::OperationsError;

/// Maps a sqlx error raised while operating on `table`.
///
/// # Error Mapping
///
/// - unique violation → `OperationsError::AlreadyExists`
/// - other integrity or data exceptions (SQLSTATE 22xxx, 23xxx) → `OperationsError::InvalidData`
/// - I/O, TLS, protocol, pool timeouts → `OperationsError::ConnectionFailed`
/// - decode failures → `OperationsError::Serialization`
/// - All other errors → `OperationsError::QueryFailed`
pub fn map_sqlx_error(err: sqlx::Error, table: &str) -> OperationsError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            OperationsError::AlreadyExists {
                table: table.to_string(),
                key: db_err.constraint().unwrap_or("unknown").to_string(),
            }
        }

        sqlx::Error::Database(db_err)
            if db_err
                .code()
                .is_some_and(|code| code.starts_with("22") || code.starts_with("23")) =>
        {
            OperationsError::InvalidData(format!("{table}: {}", db_err.message()))
        }

        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::Configuration(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => OperationsError::ConnectionFailed(err.to_string()),

        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::TypeNotFound { .. } => OperationsError::Serialization(err.to_string()),

        _ => OperationsError::QueryFailed(err.to_string()),
    }
}
