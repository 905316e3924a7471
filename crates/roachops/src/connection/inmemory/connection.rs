//! In-memory `Connection` implementation.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use roachops_core::operations::Connection;
use roachops_core::record::{
    describe_key, format_timestamp, matches_filter, project_row, DeleteMode, Filter, Record, Row,
    SelectQuery,
};
use roachops_core::schema::{
    ColumnType, TableDefinition, CREATED_AT_COLUMN, DELETED_AT_COLUMN, UPDATED_AT_COLUMN,
};
use roachops_core::{OperationsError, Result};

#[derive(Debug, Default)]
struct InMemoryTable {
    rows: Vec<Row>,
    next_id: i64,
}

/// In-memory stand-in for a CockroachDB database.
#[derive(Debug, Clone)]
pub struct InMemoryConnection {
    database: String,
    tables: Arc<RwLock<HashMap<String, InMemoryTable>>>,
}

impl Default for InMemoryConnection {
    fn default() -> Self {
        Self::new("fluid_prefsdb")
    }
}

impl InMemoryConnection {
    /// Creates an empty database with the given name.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            tables: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns true when the table has been created.
    pub async fn has_table(&self, name: &str) -> bool {
        self.tables.read().await.contains_key(name)
    }

    /// Number of stored rows, soft-deleted ones included.
    pub async fn stored_rows(&self, name: &str) -> Option<usize> {
        self.tables.read().await.get(name).map(|t| t.rows.len())
    }
}

fn missing_relation(name: &str) -> OperationsError {
    OperationsError::QueryFailed(format!("relation \"{name}\" does not exist"))
}

fn is_visible(definition: &TableDefinition, row: &Row) -> bool {
    !definition.paranoid || row.get(DELETED_AT_COLUMN).is_none_or(Value::is_null)
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        // Nulls sort last, as in an ascending database index.
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn key_of(definition: &TableDefinition, row: &Row) -> Vec<Value> {
    definition
        .primary_key()
        .iter()
        .map(|c| row.get(&c.name).cloned().unwrap_or(Value::Null))
        .collect()
}

fn compare_keys(a: &[Value], b: &[Value]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| compare_values(x, y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Keys of every stored row, soft-deleted ones included.
fn existing_keys(definition: &TableDefinition, rows: &[Row]) -> Vec<Vec<Value>> {
    rows.iter().map(|row| key_of(definition, row)).collect()
}

fn conflict(definition: &TableDefinition, row: &Row) -> OperationsError {
    OperationsError::AlreadyExists {
        table: definition.name.clone(),
        key: describe_key(definition, row),
    }
}

#[async_trait]
impl Connection for InMemoryConnection {
    async fn sync_table(&self, definition: &TableDefinition) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.insert(
            definition.name.clone(),
            InMemoryTable {
                rows: Vec::new(),
                next_id: 1,
            },
        );
        Ok(())
    }

    async fn bulk_insert(
        &self,
        definition: &TableDefinition,
        records: &[Record],
    ) -> Result<Vec<Row>> {
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(&definition.name)
            .ok_or_else(|| missing_relation(&definition.name))?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let now = Value::String(format_timestamp(&Utc::now()));
        let mut next_id = table.next_id;
        let mut keys = existing_keys(definition, &table.rows);
        let mut inserted = Vec::with_capacity(records.len());

        for record in records {
            let mut row = Row::new();
            for column in definition.all_columns() {
                let value = match (&column.column_type, column.name.as_str()) {
                    (ColumnType::BigSerial, _) => match record.get(&column.name) {
                        Some(value) if !value.is_null() => value.clone(),
                        _ => {
                            let id = next_id;
                            next_id += 1;
                            Value::Number(id.into())
                        }
                    },
                    (_, CREATED_AT_COLUMN) | (_, UPDATED_AT_COLUMN) => now.clone(),
                    (_, DELETED_AT_COLUMN) => Value::Null,
                    _ => record.get(&column.name).cloned().unwrap_or(Value::Null),
                };
                row.insert(column.name, value);
            }

            let key = key_of(definition, &row);
            if keys.iter().any(|k| compare_keys(k, &key).is_eq()) {
                // Nothing is stored: the whole batch fails together.
                return Err(conflict(definition, &row));
            }
            keys.push(key);
            inserted.push(row);
        }

        table.next_id = next_id;
        table.rows.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn select(&self, definition: &TableDefinition, query: &SelectQuery) -> Result<Vec<Row>> {
        let tables = self.tables.read().await;
        let table = tables
            .get(&definition.name)
            .ok_or_else(|| missing_relation(&definition.name))?;

        let mut rows: Vec<&Row> = table
            .rows
            .iter()
            .filter(|row| is_visible(definition, row) && matches_filter(row, &query.filter))
            .collect();
        rows.sort_by(|a, b| compare_keys(&key_of(definition, a), &key_of(definition, b)));

        Ok(rows
            .into_iter()
            .map(|row| match &query.columns {
                Some(columns) => project_row(row, columns),
                None => row.clone(),
            })
            .collect())
    }

    async fn update(
        &self,
        definition: &TableDefinition,
        attributes: &Record,
        filter: &Filter,
    ) -> Result<Vec<Row>> {
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(&definition.name)
            .ok_or_else(|| missing_relation(&definition.name))?;

        let now = Value::String(format_timestamp(&Utc::now()));
        let mut updated_rows = table.rows.clone();
        let mut changed = Vec::new();

        for (index, row) in updated_rows.iter_mut().enumerate() {
            if !is_visible(definition, row) || !matches_filter(row, filter) {
                continue;
            }
            for (name, value) in attributes {
                row.insert(name.clone(), value.clone());
            }
            if definition.timestamps {
                row.insert(UPDATED_AT_COLUMN.to_string(), now.clone());
            }
            changed.push(index);
        }

        // A key change may not collide with any other row.
        for &index in &changed {
            let key = key_of(definition, &updated_rows[index]);
            let collides = updated_rows.iter().enumerate().any(|(other, row)| {
                other != index && compare_keys(&key_of(definition, row), &key).is_eq()
            });
            if collides {
                return Err(conflict(definition, &updated_rows[index]));
            }
        }

        let result = changed.iter().map(|&i| updated_rows[i].clone()).collect();
        table.rows = updated_rows;
        Ok(result)
    }

    async fn delete(
        &self,
        definition: &TableDefinition,
        filter: &Filter,
        mode: DeleteMode,
    ) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(&definition.name)
            .ok_or_else(|| missing_relation(&definition.name))?;

        if mode == DeleteMode::Soft && definition.paranoid {
            let now = Value::String(format_timestamp(&Utc::now()));
            let mut count = 0;
            for row in table.rows.iter_mut() {
                if is_visible(definition, row) && matches_filter(row, filter) {
                    row.insert(DELETED_AT_COLUMN.to_string(), now.clone());
                    count += 1;
                }
            }
            return Ok(count);
        }

        let before = table.rows.len();
        table.rows.retain(|row| !matches_filter(row, filter));
        Ok((before - table.rows.len()) as u64)
    }

    async fn database_names(&self) -> Result<Vec<String>> {
        Ok(vec![self.database.clone()])
    }
}
