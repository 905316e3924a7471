use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A row to be written: column name to value.
pub type Record = Map<String, Value>;

/// A row read back from a table.
pub type Row = Map<String, Value>;

/// Column name to required value. Rows match when every pair is equal.
pub type Filter = Map<String, Value>;

/// Records to load, by table name.
pub type DataSets = BTreeMap<String, Vec<Record>>;

/// Read a subset of columns from the rows matching a filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Retrieval {
    #[serde(alias = "attributes")]
    pub columns: Vec<String>,
    #[serde(default, alias = "where")]
    pub filter: Filter,
}

impl Retrieval {
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>, filter: Filter) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            filter,
        }
    }
}

/// Change `attributes` on the rows matching `filter`.
///
/// `filter` is optional only so a request without one can be represented and
/// rejected; updates are always scoped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub attributes: Record,
    #[serde(default, rename = "where", alias = "filter")]
    pub filter: Option<Filter>,
}

impl UpdateRequest {
    pub fn new(attributes: Record, filter: Filter) -> Self {
        Self {
            attributes,
            filter: Some(filter),
        }
    }

    /// An update with no filter at all.
    pub fn unscoped(attributes: Record) -> Self {
        Self {
            attributes,
            filter: None,
        }
    }
}

/// Result of an update: how many rows changed and their new values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateOutcome {
    pub affected_count: u64,
    pub affected_rows: Vec<Row>,
}

impl UpdateOutcome {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            affected_count: rows.len() as u64,
            affected_rows: rows,
        }
    }
}

/// How rows are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    /// Rows are removed permanently.
    Hard,
    /// Rows are marked with `deletedAt` when the table is paranoid, removed otherwise.
    Soft,
}

impl DeleteMode {
    pub fn from_hard_flag(hard: bool) -> Self {
        if hard {
            DeleteMode::Hard
        } else {
            DeleteMode::Soft
        }
    }
}

/// A validated read request handed to a connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub filter: Filter,
    /// Columns to return; `None` returns every column.
    pub columns: Option<Vec<String>>,
}

impl SelectQuery {
    pub fn all(filter: Filter) -> Self {
        Self {
            filter,
            columns: None,
        }
    }

    pub fn columns(filter: Filter, columns: Vec<String>) -> Self {
        Self {
            filter,
            columns: Some(columns),
        }
    }
}

/// Builds a record from a JSON object value. Non-objects produce an empty record.
pub fn record_from_value(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}
