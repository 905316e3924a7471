use thiserror::Error;

/// Errors that can occur during table and row operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OperationsError {
    /// An update was requested without a filter to scope it.
    #[error("Missing primary key")]
    MissingIdentifier,
    #[error("{table} already has a row with key {key}")]
    AlreadyExists { table: String, key: String },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl OperationsError {
    /// Returns true when the failure came from reaching the database rather than from the request.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, OperationsError::ConnectionFailed(_))
    }
}

/// Result type for table and row operations.
pub type Result<T> = std::result::Result<T, OperationsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_identifier_display() {
        assert_eq!(
            OperationsError::MissingIdentifier.to_string(),
            "Missing primary key"
        );
    }

    #[test]
    fn test_already_exists_display() {
        let error = OperationsError::AlreadyExists {
            table: "rgb".to_string(),
            key: "chartreuse".to_string(),
        };
        assert_eq!(error.to_string(), "rgb already has a row with key chartreuse");
    }

    #[test]
    fn test_connection_failed_display() {
        let error = OperationsError::ConnectionFailed("connection refused".to_string());
        assert_eq!(error.to_string(), "Connection failed: connection refused");
        assert!(error.is_connectivity());
    }

    #[test]
    fn test_query_failed_is_not_connectivity() {
        let error = OperationsError::QueryFailed("syntax error".to_string());
        assert_eq!(error.to_string(), "Query failed: syntax error");
        assert!(!error.is_connectivity());
    }

    #[test]
    fn test_invalid_data_display() {
        let error = OperationsError::InvalidData("unknown column 'hue'".to_string());
        assert_eq!(error.to_string(), "Invalid data: unknown column 'hue'");
    }
}
