use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::schema::Table;

/// Tables created so far, by name.
///
/// Entries are only ever added or replaced; nothing removes them.
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: Arc<RwLock<HashMap<String, Table>>>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table under its name, returning the entry it replaced.
    pub async fn register(&self, table: Table) -> Option<Table> {
        let mut tables = self.tables.write().await;
        tables.insert(table.name.clone(), table)
    }

    pub async fn get(&self, name: &str) -> Option<Table> {
        let tables = self.tables.read().await;
        tables.get(name).cloned()
    }

    pub async fn contains(&self, name: &str) -> bool {
        let tables = self.tables.read().await;
        tables.contains_key(name)
    }

    /// Registered table names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let tables = self.tables.read().await;
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        self.tables.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tables.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSpec, ColumnType, TableDefinition};

    fn table(name: &str) -> Table {
        Table::new(
            TableDefinition::new(name)
                .with_column(ColumnSpec::new("id", ColumnType::Text).primary_key()),
        )
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = TableRegistry::new();
        assert!(registry.is_empty().await);

        assert!(registry.register(table("rgb")).await.is_none());

        assert!(registry.contains("rgb").await);
        assert_eq!(registry.get("rgb").await.unwrap().name, "rgb");
        assert!(registry.get("users").await.is_none());
    }

    #[tokio::test]
    async fn test_register_replaces_existing_entry() {
        let registry = TableRegistry::new();
        registry.register(table("rgb")).await;

        let replaced = registry.register(table("rgb")).await;
        assert!(replaced.is_some());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let registry = TableRegistry::new();
        let clone = registry.clone();
        clone.register(table("users")).await;
        clone.register(table("massive")).await;

        assert_eq!(registry.names().await, vec!["massive", "users"]);
    }
}
