use async_trait::async_trait;

use crate::error::Result;
use crate::record::{DeleteMode, Filter, Record, Row, SelectQuery};
use crate::schema::TableDefinition;

/// A handle for issuing table and row requests against one database.
///
/// Requests arrive already validated against the table definition, so
/// implementations only translate and execute them.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Drops the table if it exists and creates it afresh.
    async fn sync_table(&self, definition: &TableDefinition) -> Result<()>;

    /// Inserts all records in one batched request and returns the stored rows.
    async fn bulk_insert(&self, definition: &TableDefinition, records: &[Record])
        -> Result<Vec<Row>>;

    /// Returns the rows matching a query.
    async fn select(&self, definition: &TableDefinition, query: &SelectQuery) -> Result<Vec<Row>>;

    /// Applies `attributes` to the rows matching `filter` and returns them.
    async fn update(
        &self,
        definition: &TableDefinition,
        attributes: &Record,
        filter: &Filter,
    ) -> Result<Vec<Row>>;

    /// Removes the rows matching `filter` and returns how many were removed.
    async fn delete(
        &self,
        definition: &TableDefinition,
        filter: &Filter,
        mode: DeleteMode,
    ) -> Result<u64>;

    /// Names of the databases the connected user can see.
    async fn database_names(&self) -> Result<Vec<String>>;
}
