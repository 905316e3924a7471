//! Table and row operations over an injected connection.
//!
//! `Operations` keeps a registry of the tables it created. Every request
//! names a table; names missing from the registry are not errors: reads
//! return no rows, writes change nothing and counts are zero.

use std::slice;
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;

use roachops_core::operations::{BatchItem, BatchOutcome, Connection, TableRegistry};
use roachops_core::record::{
    require_filter, validate_columns, validate_filter, validate_record, validate_update, DataSets,
    DeleteMode, Filter, Record, Retrieval, Row, SelectQuery, UpdateOutcome, UpdateRequest,
};
use roachops_core::schema::{validate_definition, Table, TableDefinition};
use roachops_core::Result;

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Entry point for every table and row request.
#[derive(Clone)]
pub struct Operations {
    connection: Arc<dyn Connection>,
    tables: TableRegistry,
}

impl Operations {
    /// Creates operations over a connection with an empty registry.
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self::with_registry(connection, TableRegistry::new())
    }

    /// Creates operations sharing an existing registry.
    pub fn with_registry(connection: Arc<dyn Connection>, tables: TableRegistry) -> Self {
        Self { connection, tables }
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    pub fn tables(&self) -> &TableRegistry {
        &self.tables
    }

    /// Looks up a created table.
    pub async fn table(&self, name: &str) -> Option<Table> {
        self.tables.get(name).await
    }

    async fn registered(&self, name: &str, operation: &'static str) -> Option<Table> {
        let table = self.tables.get(name).await;
        if table.is_none() {
            tracing::warn!(table = name, operation, "Table not found");
        }
        table
    }

    /// Drops and recreates a table, then registers it.
    ///
    /// Existing rows are lost. The registry is only updated when the
    /// database accepted the new table.
    pub async fn create_one_table(&self, definition: TableDefinition) -> Result<Table> {
        let started = Instant::now();
        let name = definition.name.clone();

        let result = async {
            validate_definition(&definition)?;
            self.connection.sync_table(&definition).await
        }
        .await;

        match result {
            Ok(()) => {
                let table = Table::new(definition);
                self.tables.register(table.clone()).await;
                tracing::info!(table = %name, elapsed_ms = elapsed_ms(started), "Table created");
                Ok(table)
            }
            Err(err) => {
                tracing::error!(table = %name, error = %err, "Failed to create table");
                Err(err)
            }
        }
    }

    /// Creates every table concurrently and waits for all of them.
    ///
    /// A failure does not stop its siblings; results keep the input order.
    pub async fn create_tables(&self, definitions: Vec<TableDefinition>) -> BatchOutcome<Table> {
        let started = Instant::now();
        let outcome: BatchOutcome<Table> = join_all(definitions.into_iter().map(|definition| {
            let name = definition.name.clone();
            async move { BatchItem::new(name, self.create_one_table(definition).await) }
        }))
        .await
        .into_iter()
        .collect();

        tracing::info!(
            tables = outcome.len(),
            failed = outcome.failures().count(),
            elapsed_ms = elapsed_ms(started),
            "Tables created"
        );
        outcome
    }

    /// Bulk-inserts records into a created table and returns the stored rows.
    ///
    /// All records are validated before anything is sent; one invalid record
    /// rejects the whole load.
    pub async fn load_one_table(&self, name: &str, records: &[Record]) -> Result<Vec<Row>> {
        let Some(table) = self.registered(name, "load").await else {
            return Ok(Vec::new());
        };
        let started = Instant::now();

        let result = async {
            let records = records
                .iter()
                .map(|record| validate_record(&table.definition, record))
                .collect::<Result<Vec<_>>>()?;
            self.connection
                .bulk_insert(&table.definition, &records)
                .await
        }
        .await;

        match &result {
            Ok(rows) => tracing::info!(
                table = name,
                rows = rows.len(),
                elapsed_ms = elapsed_ms(started),
                "Table loaded"
            ),
            Err(err) => tracing::error!(table = name, error = %err, "Failed to load table"),
        }
        result
    }

    /// Loads every data set concurrently and waits for all of them.
    pub async fn load_tables(&self, data: &DataSets) -> BatchOutcome<Vec<Row>> {
        let started = Instant::now();
        let loads = data.iter().map(|(name, records)| async move {
            BatchItem::new(name.clone(), self.load_one_table(name, records).await)
        });
        let outcome: BatchOutcome<Vec<Row>> = join_all(loads).await.into_iter().collect();

        tracing::info!(
            tables = outcome.len(),
            rows = outcome.succeeded().map(|(_, rows)| rows.len()).sum::<usize>(),
            failed = outcome.failures().count(),
            elapsed_ms = elapsed_ms(started),
            "Tables loaded"
        );
        outcome
    }

    /// Returns every row matching the filter, ordered by primary key.
    pub async fn select_rows(&self, name: &str, filter: &Filter) -> Result<Vec<Row>> {
        let Some(table) = self.registered(name, "select").await else {
            return Ok(Vec::new());
        };
        let filter = validate_filter(&table.definition, filter)?;
        let rows = self
            .connection
            .select(&table.definition, &SelectQuery::all(filter))
            .await?;
        tracing::debug!(table = name, rows = rows.len(), "Rows selected");
        Ok(rows)
    }

    /// Returns only the requested columns of the rows matching the filter.
    pub async fn retrieve_value(&self, name: &str, retrieval: &Retrieval) -> Result<Vec<Row>> {
        let Some(table) = self.registered(name, "retrieve").await else {
            return Ok(Vec::new());
        };
        validate_columns(&table.definition, &retrieval.columns)?;
        let filter = validate_filter(&table.definition, &retrieval.filter)?;
        let rows = self
            .connection
            .select(
                &table.definition,
                &SelectQuery::columns(filter, retrieval.columns.clone()),
            )
            .await?;
        tracing::debug!(table = name, rows = rows.len(), "Values retrieved");
        Ok(rows)
    }

    /// Inserts a single record.
    pub async fn insert_record(&self, name: &str, record: &Record) -> Result<Vec<Row>> {
        self.load_one_table(name, slice::from_ref(record)).await
    }

    /// Changes columns on the rows matching the request's filter.
    ///
    /// An update without a filter fails with
    /// [`OperationsError::MissingIdentifier`](roachops_core::OperationsError::MissingIdentifier),
    /// whether or not the table exists.
    pub async fn update_fields(&self, name: &str, request: &UpdateRequest) -> Result<UpdateOutcome> {
        require_filter(request)?;
        let Some(table) = self.registered(name, "update").await else {
            return Ok(UpdateOutcome::default());
        };
        let (attributes, filter) = validate_update(&table.definition, request)?;
        let rows = self
            .connection
            .update(&table.definition, &attributes, &filter)
            .await?;
        let outcome = UpdateOutcome::from_rows(rows);
        tracing::info!(table = name, rows = outcome.affected_count, "Rows updated");
        Ok(outcome)
    }

    /// Deletes the rows matching a key filter and returns how many were deleted.
    ///
    /// Rows of a paranoid table are only marked deleted.
    pub async fn delete_record(&self, name: &str, filter: &Filter) -> Result<u64> {
        let Some(table) = self.registered(name, "delete").await else {
            return Ok(0);
        };
        let filter = validate_filter(&table.definition, filter)?;
        let count = self
            .connection
            .delete(&table.definition, &filter, DeleteMode::Soft)
            .await?;
        tracing::info!(table = name, rows = count, "Rows deleted");
        Ok(count)
    }

    /// Deletes every row of a table.
    ///
    /// With `hard` set rows are removed permanently, soft-deleted ones
    /// included; otherwise paranoid tables only mark them deleted.
    pub async fn delete_table_data(&self, name: &str, hard: bool) -> Result<u64> {
        let Some(table) = self.registered(name, "delete").await else {
            return Ok(0);
        };
        let count = self
            .connection
            .delete(&table.definition, &Filter::new(), DeleteMode::from_hard_flag(hard))
            .await?;
        tracing::info!(table = name, rows = count, hard, "Table data deleted");
        Ok(count)
    }

    /// Names of the databases visible to the connected user.
    pub async fn database_names(&self) -> Result<Vec<String>> {
        self.connection.database_names().await
    }
}
