use crate::error::{OperationsError, Result};

/// Result of one member of a batch, tagged with the table it concerned.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem<T> {
    pub table: String,
    pub result: Result<T>,
}

impl<T> BatchItem<T> {
    pub fn new(table: impl Into<String>, result: Result<T>) -> Self {
        Self {
            table: table.into(),
            result,
        }
    }
}

/// Every member's result of a batch, in the order the members were given.
///
/// All members are attempted regardless of failures. Callers that want
/// all-or-nothing use [`BatchOutcome::into_result`].
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome<T> {
    items: Vec<BatchItem<T>>,
}

impl<T> BatchOutcome<T> {
    pub fn new(items: Vec<BatchItem<T>>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[BatchItem<T>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true when no member failed.
    pub fn is_success(&self) -> bool {
        self.items.iter().all(|item| item.result.is_ok())
    }

    /// Successful members as `(table, value)`.
    pub fn succeeded(&self) -> impl Iterator<Item = (&str, &T)> {
        self.items.iter().filter_map(|item| match &item.result {
            Ok(value) => Some((item.table.as_str(), value)),
            Err(_) => None,
        })
    }

    /// Failed members as `(table, error)`.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &OperationsError)> {
        self.items.iter().filter_map(|item| match &item.result {
            Ok(_) => None,
            Err(err) => Some((item.table.as_str(), err)),
        })
    }

    /// The ordered successes, or the first failure in member order.
    pub fn into_result(self) -> Result<Vec<T>> {
        self.items.into_iter().map(|item| item.result).collect()
    }
}

impl<T> FromIterator<BatchItem<T>> for BatchOutcome<T> {
    fn from_iter<I: IntoIterator<Item = BatchItem<T>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed() -> BatchOutcome<u32> {
        vec![
            BatchItem::new("rgb", Ok(3)),
            BatchItem::new(
                "users",
                Err(OperationsError::QueryFailed("first".to_string())),
            ),
            BatchItem::new("massive", Ok(5)),
            BatchItem::new(
                "nodata",
                Err(OperationsError::QueryFailed("second".to_string())),
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_all_members_are_kept_in_order() {
        let outcome = mixed();
        let tables: Vec<&str> = outcome.items().iter().map(|i| i.table.as_str()).collect();
        assert_eq!(tables, vec!["rgb", "users", "massive", "nodata"]);
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_succeeded_and_failures_split() {
        let outcome = mixed();
        let ok: Vec<(&str, &u32)> = outcome.succeeded().collect();
        assert_eq!(ok, vec![("rgb", &3), ("massive", &5)]);

        let failed: Vec<&str> = outcome.failures().map(|(table, _)| table).collect();
        assert_eq!(failed, vec!["users", "nodata"]);
    }

    #[test]
    fn test_into_result_reports_first_failure() {
        assert_eq!(
            mixed().into_result(),
            Err(OperationsError::QueryFailed("first".to_string()))
        );
    }

    #[test]
    fn test_into_result_keeps_order_on_success() {
        let outcome: BatchOutcome<u32> = vec![BatchItem::new("a", Ok(1)), BatchItem::new("b", Ok(2))]
            .into_iter()
            .collect();
        assert!(outcome.is_success());
        assert_eq!(outcome.into_result(), Ok(vec![1, 2]));
    }

    #[test]
    fn test_empty_batch_is_success() {
        let outcome: BatchOutcome<u32> = BatchOutcome::new(Vec::new());
        assert!(outcome.is_empty());
        assert!(outcome.is_success());
        assert_eq!(outcome.into_result(), Ok(Vec::new()));
    }
}
