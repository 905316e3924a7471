//! CockroachDB `Connection` implementation.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};

use roachops_core::operations::Connection;
use roachops_core::record::{DeleteMode, Filter, Record, Row, SelectQuery};
use roachops_core::schema::TableDefinition;
use roachops_core::sql::{self, MAX_BIND_PARAMS};
use roachops_core::Result;

use crate::config::ConnectionConfig;

use super::conversions::{bind_all, row_to_record};
use super::error::map_sqlx_error;

/// Connection to one CockroachDB database.
///
/// The pool connects lazily: building a `CockroachConnection` never fails,
/// even when the server is unreachable. Connectivity errors surface on the
/// first request.
#[derive(Debug, Clone)]
pub struct CockroachConnection {
    pool: PgPool,
    config: ConnectionConfig,
}

impl CockroachConnection {
    /// Creates a connection for the given configuration without contacting the server.
    pub fn new(config: ConnectionConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .ssl_mode(PgSslMode::Disable);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_lazy_with(options);

        tracing::debug!(url = %config.redacted_url(), "Configured CockroachDB connection");

        Self { pool, config }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Round-trips a trivial query, establishing the first connection if needed.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "ping"))?;
        Ok(())
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Connection for CockroachConnection {
    async fn sync_table(&self, definition: &TableDefinition) -> Result<()> {
        let name = definition.name.as_str();

        for statement in [sql::drop_table(definition), sql::create_table(definition)] {
            tracing::debug!(table = name, sql = %statement, "Executing");
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error(e, name))?;
        }

        Ok(())
    }

    async fn bulk_insert(
        &self,
        definition: &TableDefinition,
        records: &[Record],
    ) -> Result<Vec<Row>> {
        let name = definition.name.as_str();
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let statements = sql::insert_rows(definition, records, MAX_BIND_PARAMS);

        // One transaction so a chunked load is all-or-nothing.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(e, name))?;

        let mut inserted = Vec::with_capacity(records.len());
        for statement in &statements {
            tracing::debug!(
                table = name,
                params = statement.params.len(),
                "Executing bulk insert"
            );
            let rows = bind_all(sqlx::query(&statement.sql), &statement.params)?
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error(e, name))?;
            for row in &rows {
                inserted.push(row_to_record(row, definition)?);
            }
        }

        tx.commit().await.map_err(|e| map_sqlx_error(e, name))?;

        Ok(inserted)
    }

    async fn select(&self, definition: &TableDefinition, query: &SelectQuery) -> Result<Vec<Row>> {
        let name = definition.name.as_str();
        let statement = sql::select_rows(definition, query)?;
        tracing::debug!(table = name, sql = %statement.sql, "Executing");

        let rows = bind_all(sqlx::query(&statement.sql), &statement.params)?
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, name))?;

        rows.iter()
            .map(|row| row_to_record(row, definition))
            .collect()
    }

    async fn update(
        &self,
        definition: &TableDefinition,
        attributes: &Record,
        filter: &Filter,
    ) -> Result<Vec<Row>> {
        let name = definition.name.as_str();
        let statement = sql::update_rows(definition, attributes, filter)?;
        tracing::debug!(table = name, sql = %statement.sql, "Executing");

        let rows = bind_all(sqlx::query(&statement.sql), &statement.params)?
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, name))?;

        rows.iter()
            .map(|row| row_to_record(row, definition))
            .collect()
    }

    async fn delete(
        &self,
        definition: &TableDefinition,
        filter: &Filter,
        mode: DeleteMode,
    ) -> Result<u64> {
        let name = definition.name.as_str();
        let statement = sql::delete_rows(definition, filter, mode)?;
        tracing::debug!(table = name, sql = %statement.sql, "Executing");

        let result = bind_all(sqlx::query(&statement.sql), &statement.params)?
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, name))?;

        Ok(result.rows_affected())
    }

    async fn database_names(&self) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(sql::LIST_DATABASES)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "pg_database"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roachops_core::record::record_from_value;
    use roachops_core::schema::{ColumnSpec, ColumnType};
    use roachops_core::OperationsError;
    use serde_json::json;
    use uuid::Uuid;

    /// Skip test if CockroachDB not available.
    async fn get_test_connection() -> Option<CockroachConnection> {
        let config = ConnectionConfig {
            acquire_timeout_seconds: 2,
            ..ConnectionConfig::from_env().ok()?
        };
        let connection = CockroachConnection::new(config);
        connection.ping().await.ok()?;
        Some(connection)
    }

    /// Unique table name to avoid clashes between concurrent test runs.
    fn test_table(prefix: &str) -> TableDefinition {
        TableDefinition::new(format!("{prefix}_{}", Uuid::new_v4().simple()))
            .with_column(ColumnSpec::new("id", ColumnType::String(36)).primary_key())
            .with_column(ColumnSpec::new("color", ColumnType::String(36)))
            .with_column(ColumnSpec::new("colourMap", ColumnType::Jsonb))
            .with_column(ColumnSpec::new(
                "tags",
                ColumnType::array(ColumnType::String(16)),
            ))
    }

    async fn drop_test_table(connection: &CockroachConnection, definition: &TableDefinition) {
        sqlx::query(&sql::drop_table(definition))
            .execute(&connection.pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_construction_never_fails_and_first_use_reports_connectivity() {
        let connection = CockroachConnection::new(ConnectionConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            acquire_timeout_seconds: 1,
            ..ConnectionConfig::default()
        });

        let result = connection.database_names().await;
        assert!(matches!(result, Err(OperationsError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn test_closed_connection_rejects_requests() {
        let connection = CockroachConnection::new(ConnectionConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            acquire_timeout_seconds: 1,
            ..ConnectionConfig::default()
        });

        connection.close().await;

        let result = connection.database_names().await;
        assert!(matches!(result, Err(OperationsError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn test_database_names_include_configured_database() {
        let Some(connection) = get_test_connection().await else {
            eprintln!("Skipping test: CockroachDB not available");
            return;
        };

        let names = connection.database_names().await.unwrap();
        assert!(names.contains(&connection.config().database));
    }

    #[tokio::test]
    async fn test_sync_insert_select_round_trip() {
        let Some(connection) = get_test_connection().await else {
            eprintln!("Skipping test: CockroachDB not available");
            return;
        };
        let definition = test_table("rgb");

        connection.sync_table(&definition).await.unwrap();
        let empty = connection
            .select(&definition, &SelectQuery::default())
            .await
            .unwrap();
        assert!(empty.is_empty());

        let record = record_from_value(json!({
            "id": "chartreuse",
            "color": "green",
            "colourMap": { "foreground": "#7FFF00" },
            "tags": ["bright", "yellowish"]
        }));
        let inserted = connection
            .bulk_insert(&definition, std::slice::from_ref(&record))
            .await
            .unwrap();
        assert_eq!(inserted.len(), 1);
        assert!(inserted[0]["createdAt"].is_string());

        let rows = connection
            .select(
                &definition,
                &SelectQuery::all(record_from_value(json!({ "id": "chartreuse" }))),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        for (key, value) in &record {
            assert_eq!(&rows[0][key], value, "column {key}");
        }

        drop_test_table(&connection, &definition).await;
    }

    #[tokio::test]
    async fn test_duplicate_key_maps_to_already_exists() {
        let Some(connection) = get_test_connection().await else {
            eprintln!("Skipping test: CockroachDB not available");
            return;
        };
        let definition = test_table("dup");
        connection.sync_table(&definition).await.unwrap();

        let record = record_from_value(json!({ "id": "crimson", "color": "red" }));
        let result = connection
            .bulk_insert(&definition, &[record.clone(), record])
            .await;
        assert!(matches!(result, Err(OperationsError::AlreadyExists { .. })));

        // The failed batch left nothing behind.
        let rows = connection
            .select(&definition, &SelectQuery::default())
            .await
            .unwrap();
        assert!(rows.is_empty());

        drop_test_table(&connection, &definition).await;
    }

    #[tokio::test]
    async fn test_update_and_delete_counts() {
        let Some(connection) = get_test_connection().await else {
            eprintln!("Skipping test: CockroachDB not available");
            return;
        };
        let definition = test_table("upd");
        connection.sync_table(&definition).await.unwrap();

        let records = vec![
            record_from_value(json!({ "id": "chartreuse", "color": "green" })),
            record_from_value(json!({ "id": "forest", "color": "green" })),
            record_from_value(json!({ "id": "crimson", "color": "red" })),
        ];
        connection.bulk_insert(&definition, &records).await.unwrap();

        let updated = connection
            .update(
                &definition,
                &record_from_value(json!({ "color": "lime" })),
                &record_from_value(json!({ "id": "chartreuse" })),
            )
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["color"], json!("lime"));

        let deleted = connection
            .delete(&definition, &Filter::new(), DeleteMode::Hard)
            .await
            .unwrap();
        assert_eq!(deleted, 3);

        drop_test_table(&connection, &definition).await;
    }
}
