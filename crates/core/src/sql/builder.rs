//! SQL statement builders for the CockroachDB (Postgres) dialect.
//!
//! Pure functions from table definitions and validated requests to SQL text
//! plus typed parameters. Every placeholder carries a cast to its column type
//! so that `NULL` and untyped values bind correctly.

use serde_json::Value;

use crate::error::{OperationsError, Result};
use crate::record::{DeleteMode, Filter, Record, SelectQuery};
use crate::schema::{ColumnSpec, ColumnType, TableDefinition, DELETED_AT_COLUMN, UPDATED_AT_COLUMN};

/// Largest number of bind parameters a single Postgres statement accepts.
pub const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// Lists the databases visible to the connected user.
pub const LIST_DATABASES: &str = "SELECT datname FROM pg_database ORDER BY datname";

/// A value bound to a placeholder, with the column type it is cast to.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub value: Value,
    pub column_type: ColumnType,
}

/// SQL text with its parameters in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Param>,
}

impl Statement {
    fn without_params(sql: String) -> Self {
        Self {
            sql,
            params: Vec::new(),
        }
    }
}

/// Quotes an identifier, preserving case and dots.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn push_param(params: &mut Vec<Param>, value: Value, column_type: &ColumnType) -> String {
    params.push(Param {
        value,
        column_type: column_type.clone(),
    });
    format!("${}::{}", params.len(), column_type.cast_type())
}

fn column_of(definition: &TableDefinition, name: &str) -> Result<ColumnSpec> {
    definition.find_column(name).ok_or_else(|| {
        OperationsError::InvalidData(format!(
            "table '{}' has no column '{}'",
            definition.name, name
        ))
    })
}

fn where_clause(
    definition: &TableDefinition,
    filter: &Filter,
    params: &mut Vec<Param>,
    exclude_deleted: bool,
) -> Result<String> {
    let mut conditions = Vec::with_capacity(filter.len() + 1);
    for (name, value) in filter {
        let column = column_of(definition, name)?;
        let quoted = quote_identifier(name);
        if value.is_null() {
            conditions.push(format!("{quoted} IS NULL"));
        } else {
            let placeholder = push_param(params, value.clone(), &column.column_type);
            conditions.push(format!("{quoted} = {placeholder}"));
        }
    }
    if exclude_deleted && definition.paranoid {
        conditions.push(format!("{} IS NULL", quote_identifier(DELETED_AT_COLUMN)));
    }

    if conditions.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" WHERE {}", conditions.join(" AND ")))
    }
}

/// `DROP TABLE IF EXISTS`, removing dependent objects too.
pub fn drop_table(definition: &TableDefinition) -> String {
    format!(
        "DROP TABLE IF EXISTS {} CASCADE",
        quote_identifier(&definition.name)
    )
}

/// `CREATE TABLE` for every column of the definition, implicit ones included.
pub fn create_table(definition: &TableDefinition) -> String {
    let columns = definition.all_columns();
    let mut parts: Vec<String> = columns
        .iter()
        .map(|column| {
            let mut part = format!(
                "{} {}",
                quote_identifier(&column.name),
                column.column_type.ddl_type()
            );
            if !column.allow_null {
                part.push_str(" NOT NULL");
            }
            if column.column_type == ColumnType::Date && column.is_generated() && !column.allow_null {
                part.push_str(" DEFAULT now()");
            }
            part
        })
        .collect();

    let key: Vec<String> = columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| quote_identifier(&c.name))
        .collect();
    parts.push(format!("PRIMARY KEY ({})", key.join(", ")));

    format!(
        "CREATE TABLE {} ({})",
        quote_identifier(&definition.name),
        parts.join(", ")
    )
}

/// Columns an insert of `records` writes: every column the caller may set,
/// plus generated keys some record supplies explicitly.
pub fn insert_columns(definition: &TableDefinition, records: &[Record]) -> Vec<ColumnSpec> {
    definition
        .all_columns()
        .into_iter()
        .filter(|column| {
            !column.is_generated()
                || (column.column_type == ColumnType::BigSerial
                    && records.iter().any(|r| r.contains_key(&column.name)))
        })
        .collect()
}

/// Multi-row `INSERT ... RETURNING *`, split so no statement exceeds
/// `max_params` parameters.
///
/// Tables with nothing to write get one `DEFAULT VALUES` statement per record.
pub fn insert_rows(
    definition: &TableDefinition,
    records: &[Record],
    max_params: usize,
) -> Vec<Statement> {
    let table = quote_identifier(&definition.name);
    let columns = insert_columns(definition, records);

    if columns.is_empty() {
        return records
            .iter()
            .map(|_| Statement::without_params(format!("INSERT INTO {table} DEFAULT VALUES RETURNING *")))
            .collect();
    }

    let column_list = columns
        .iter()
        .map(|c| quote_identifier(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let rows_per_statement = (max_params / columns.len()).max(1);

    records
        .chunks(rows_per_statement)
        .map(|chunk| {
            let mut params = Vec::with_capacity(chunk.len() * columns.len());
            let tuples = chunk
                .iter()
                .map(|record| {
                    let placeholders = columns
                        .iter()
                        .map(|column| {
                            let value = record.get(&column.name).cloned().unwrap_or(Value::Null);
                            // Generated keys left out of a record take the column default.
                            if value.is_null() && column.is_generated() {
                                return "DEFAULT".to_string();
                            }
                            push_param(&mut params, value, &column.column_type)
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("({placeholders})")
                })
                .collect::<Vec<_>>()
                .join(", ");

            Statement {
                sql: format!("INSERT INTO {table} ({column_list}) VALUES {tuples} RETURNING *"),
                params,
            }
        })
        .collect()
}

/// `SELECT` of the rows matching a filter, ordered by primary key.
/// Soft-deleted rows are never returned.
pub fn select_rows(definition: &TableDefinition, query: &SelectQuery) -> Result<Statement> {
    let projection = match &query.columns {
        Some(columns) => {
            for name in columns {
                column_of(definition, name)?;
            }
            columns
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ")
        }
        None => "*".to_string(),
    };

    let mut params = Vec::new();
    let where_sql = where_clause(definition, &query.filter, &mut params, true)?;
    let order = definition
        .primary_key()
        .iter()
        .map(|c| quote_identifier(&c.name))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(Statement {
        sql: format!(
            "SELECT {projection} FROM {}{where_sql} ORDER BY {order}",
            quote_identifier(&definition.name)
        ),
        params,
    })
}

/// `UPDATE ... RETURNING *`, bumping `updatedAt` when the table has timestamps.
pub fn update_rows(
    definition: &TableDefinition,
    attributes: &Record,
    filter: &Filter,
) -> Result<Statement> {
    let mut params = Vec::new();
    let mut assignments = Vec::with_capacity(attributes.len() + 1);
    for (name, value) in attributes {
        let column = column_of(definition, name)?;
        let placeholder = push_param(&mut params, value.clone(), &column.column_type);
        assignments.push(format!("{} = {placeholder}", quote_identifier(name)));
    }
    if definition.timestamps {
        assignments.push(format!("{} = now()", quote_identifier(UPDATED_AT_COLUMN)));
    }

    let where_sql = where_clause(definition, filter, &mut params, true)?;

    Ok(Statement {
        sql: format!(
            "UPDATE {} SET {}{where_sql} RETURNING *",
            quote_identifier(&definition.name),
            assignments.join(", ")
        ),
        params,
    })
}

/// Removes the rows matching a filter.
///
/// A soft delete of a paranoid table stamps `deletedAt` on rows not already
/// deleted; everything else is a plain `DELETE`.
pub fn delete_rows(
    definition: &TableDefinition,
    filter: &Filter,
    mode: DeleteMode,
) -> Result<Statement> {
    let table = quote_identifier(&definition.name);
    let mut params = Vec::new();

    if mode == DeleteMode::Soft && definition.paranoid {
        let where_sql = where_clause(definition, filter, &mut params, true)?;
        return Ok(Statement {
            sql: format!(
                "UPDATE {table} SET {} = now(){where_sql}",
                quote_identifier(DELETED_AT_COLUMN)
            ),
            params,
        });
    }

    let where_sql = where_clause(definition, filter, &mut params, false)?;
    Ok(Statement {
        sql: format!("DELETE FROM {table}{where_sql}"),
        params,
    })
}
