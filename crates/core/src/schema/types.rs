use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{OperationsError, Result};

/// Name of the surrogate key added to tables that declare no primary key.
pub const ID_COLUMN: &str = "id";
/// Row creation timestamp, present when `timestamps` is enabled.
pub const CREATED_AT_COLUMN: &str = "createdAt";
/// Row modification timestamp, present when `timestamps` is enabled.
pub const UPDATED_AT_COLUMN: &str = "updatedAt";
/// Soft-delete marker, present on paranoid tables.
pub const DELETED_AT_COLUMN: &str = "deletedAt";

/// Default length for `VARCHAR` columns declared without one.
const DEFAULT_STRING_LENGTH: u32 = 255;

/// SQL type of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Variable length string with a maximum length.
    String(u32),
    Text,
    Integer,
    /// Server-generated integer key.
    BigSerial,
    Float,
    Boolean,
    /// Timestamp with time zone.
    Date,
    Jsonb,
    Array(Box<ColumnType>),
}

impl ColumnType {
    /// A `VARCHAR(255)` column.
    pub fn string() -> Self {
        ColumnType::String(DEFAULT_STRING_LENGTH)
    }

    /// An array of `inner` values.
    pub fn array(inner: ColumnType) -> Self {
        ColumnType::Array(Box::new(inner))
    }

    /// Type used in `CREATE TABLE`.
    pub fn ddl_type(&self) -> String {
        match self {
            ColumnType::BigSerial => "BIGSERIAL".to_string(),
            other => other.cast_type(),
        }
    }

    /// Type used to cast bound parameters.
    pub fn cast_type(&self) -> String {
        match self {
            ColumnType::String(len) => format!("VARCHAR({len})"),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Integer | ColumnType::BigSerial => "INT8".to_string(),
            ColumnType::Float => "FLOAT8".to_string(),
            ColumnType::Boolean => "BOOL".to_string(),
            ColumnType::Date => "TIMESTAMPTZ".to_string(),
            ColumnType::Jsonb => "JSONB".to_string(),
            ColumnType::Array(inner) => format!("{}[]", inner.cast_type()),
        }
    }
}

/// A single column of a table definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default = "default_true")]
    pub allow_null: bool,
}

impl ColumnSpec {
    /// Creates a nullable, non-key column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            primary_key: false,
            allow_null: true,
        }
    }

    /// Marks this column as (part of) the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.allow_null = false;
        self
    }

    /// Marks this column as `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.allow_null = false;
        self
    }

    /// Returns true when the database fills this column in.
    pub fn is_generated(&self) -> bool {
        self.column_type == ColumnType::BigSerial
            || self.name == CREATED_AT_COLUMN
            || self.name == UPDATED_AT_COLUMN
            || self.name == DELETED_AT_COLUMN
    }
}

fn default_true() -> bool {
    true
}

/// Static definition of a table: its name and declared columns.
///
/// Implicit columns are derived from the flags rather than stored: a `BIGSERIAL`
/// `id` key when nothing is marked primary, `createdAt`/`updatedAt` when
/// `timestamps` is set and `deletedAt` when `paranoid` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    #[serde(default = "default_true")]
    pub timestamps: bool,
    #[serde(default)]
    pub paranoid: bool,
}

impl TableDefinition {
    /// Creates a definition with no declared columns and timestamps enabled.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            timestamps: true,
            paranoid: false,
        }
    }

    /// Adds a declared column.
    pub fn with_column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    /// Disables the `createdAt`/`updatedAt` columns.
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Enables soft deletes through a `deletedAt` column.
    pub fn paranoid(mut self) -> Self {
        self.paranoid = true;
        self
    }

    /// Returns true when no declared column is part of the primary key.
    pub fn has_implicit_id(&self) -> bool {
        !self.columns.iter().any(|c| c.primary_key)
    }

    /// All columns of the table in DDL order, implicit ones included.
    pub fn all_columns(&self) -> Vec<ColumnSpec> {
        let mut columns = Vec::with_capacity(self.columns.len() + 4);
        if self.has_implicit_id() {
            columns.push(ColumnSpec::new(ID_COLUMN, ColumnType::BigSerial).primary_key());
        }
        columns.extend(self.columns.iter().cloned());
        if self.timestamps {
            columns.push(ColumnSpec::new(CREATED_AT_COLUMN, ColumnType::Date).not_null());
            columns.push(ColumnSpec::new(UPDATED_AT_COLUMN, ColumnType::Date).not_null());
        }
        if self.paranoid {
            columns.push(ColumnSpec::new(DELETED_AT_COLUMN, ColumnType::Date));
        }
        columns
    }

    /// Looks up a column by name, implicit ones included.
    pub fn find_column(&self, name: &str) -> Option<ColumnSpec> {
        self.all_columns().into_iter().find(|c| c.name == name)
    }

    /// Primary key columns in declaration order.
    pub fn primary_key(&self) -> Vec<ColumnSpec> {
        self.all_columns()
            .into_iter()
            .filter(|c| c.primary_key)
            .collect()
    }
}

/// Checks that a definition can be turned into a table.
pub fn validate_definition(definition: &TableDefinition) -> Result<()> {
    if definition.name.trim().is_empty() {
        return Err(OperationsError::InvalidData(
            "table name must not be empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for column in definition.all_columns() {
        if column.name.trim().is_empty() {
            return Err(OperationsError::InvalidData(format!(
                "table '{}' has a column with an empty name",
                definition.name
            )));
        }
        if !seen.insert(column.name.clone()) {
            return Err(OperationsError::InvalidData(format!(
                "table '{}' defines column '{}' more than once",
                definition.name, column.name
            )));
        }
        if let ColumnType::Array(inner) = &column.column_type {
            if !matches!(
                inner.as_ref(),
                ColumnType::String(_) | ColumnType::Text | ColumnType::Integer | ColumnType::Boolean
            ) {
                return Err(OperationsError::InvalidData(format!(
                    "column '{}' of table '{}' has an unsupported array element type",
                    column.name, definition.name
                )));
            }
        }
    }

    Ok(())
}

/// Handle to a created table, as held by the table registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub definition: Arc<TableDefinition>,
}

impl Table {
    pub fn new(definition: TableDefinition) -> Self {
        Self {
            name: definition.name.clone(),
            definition: Arc::new(definition),
        }
    }
}
