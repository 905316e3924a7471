//! Conversions between JSON values and Postgres parameters and rows.
//!
//! Values are bound and decoded according to the column type of the
//! table definition, never by inspecting the JSON value alone.

use chrono::{DateTime, Utc};
use serde_json::{Number, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{Column, Postgres, Row as _};

use roachops_core::record::{format_timestamp, parse_timestamp, Row};
use roachops_core::schema::{ColumnType, TableDefinition};
use roachops_core::sql::Param;
use roachops_core::{OperationsError, Result};

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

fn invalid(param: &Param) -> OperationsError {
    OperationsError::InvalidData(format!(
        "cannot bind {} as {}",
        param.value,
        param.column_type.cast_type()
    ))
}

fn string_elements(param: &Param, items: &[Value]) -> Result<Vec<String>> {
    items
        .iter()
        .map(|item| item.as_str().map(str::to_owned).ok_or_else(|| invalid(param)))
        .collect()
}

/// Binds one parameter with the Rust type matching its column type.
pub fn bind_param<'q>(query: PgQuery<'q>, param: &Param) -> Result<PgQuery<'q>> {
    let value = &param.value;
    let bound = match &param.column_type {
        ColumnType::String(_) | ColumnType::Text => {
            if value.is_null() {
                query.bind(None::<String>)
            } else {
                let s = value.as_str().ok_or_else(|| invalid(param))?;
                query.bind(Some(s.to_owned()))
            }
        }
        ColumnType::Integer | ColumnType::BigSerial => {
            if value.is_null() {
                query.bind(None::<i64>)
            } else {
                query.bind(Some(value.as_i64().ok_or_else(|| invalid(param))?))
            }
        }
        ColumnType::Float => {
            if value.is_null() {
                query.bind(None::<f64>)
            } else {
                query.bind(Some(value.as_f64().ok_or_else(|| invalid(param))?))
            }
        }
        ColumnType::Boolean => {
            if value.is_null() {
                query.bind(None::<bool>)
            } else {
                query.bind(Some(value.as_bool().ok_or_else(|| invalid(param))?))
            }
        }
        ColumnType::Date => {
            if value.is_null() {
                query.bind(None::<DateTime<Utc>>)
            } else {
                let ts = value
                    .as_str()
                    .and_then(parse_timestamp)
                    .ok_or_else(|| invalid(param))?;
                query.bind(Some(ts))
            }
        }
        ColumnType::Jsonb => {
            if value.is_null() {
                query.bind(None::<Json<Value>>)
            } else {
                query.bind(Some(Json(value.clone())))
            }
        }
        ColumnType::Array(inner) => {
            let items = match value {
                Value::Null => None,
                Value::Array(items) => Some(items.as_slice()),
                _ => return Err(invalid(param)),
            };
            match inner.as_ref() {
                ColumnType::String(_) | ColumnType::Text => query.bind(
                    items
                        .map(|items| string_elements(param, items))
                        .transpose()?,
                ),
                ColumnType::Integer => query.bind(
                    items
                        .map(|items| {
                            items
                                .iter()
                                .map(|item| item.as_i64().ok_or_else(|| invalid(param)))
                                .collect::<Result<Vec<i64>>>()
                        })
                        .transpose()?,
                ),
                ColumnType::Boolean => query.bind(
                    items
                        .map(|items| {
                            items
                                .iter()
                                .map(|item| item.as_bool().ok_or_else(|| invalid(param)))
                                .collect::<Result<Vec<bool>>>()
                        })
                        .transpose()?,
                ),
                _ => return Err(invalid(param)),
            }
        }
    };
    Ok(bound)
}

/// Binds every parameter of a statement, in placeholder order.
pub fn bind_all<'q>(mut query: PgQuery<'q>, params: &[Param]) -> Result<PgQuery<'q>> {
    for param in params {
        query = bind_param(query, param)?;
    }
    Ok(query)
}

fn decode_error(column: &str, err: sqlx::Error) -> OperationsError {
    OperationsError::Serialization(format!("column '{column}': {err}"))
}

fn decode_column(row: &PgRow, index: usize, name: &str, column_type: &ColumnType) -> Result<Value> {
    let value = match column_type {
        ColumnType::String(_) | ColumnType::Text => row
            .try_get::<Option<String>, _>(index)
            .map_err(|e| decode_error(name, e))?
            .map(Value::String),
        ColumnType::Integer | ColumnType::BigSerial => row
            .try_get::<Option<i64>, _>(index)
            .map_err(|e| decode_error(name, e))?
            .map(|n| Value::Number(n.into())),
        ColumnType::Float => row
            .try_get::<Option<f64>, _>(index)
            .map_err(|e| decode_error(name, e))?
            .and_then(Number::from_f64)
            .map(Value::Number),
        ColumnType::Boolean => row
            .try_get::<Option<bool>, _>(index)
            .map_err(|e| decode_error(name, e))?
            .map(Value::Bool),
        ColumnType::Date => row
            .try_get::<Option<DateTime<Utc>>, _>(index)
            .map_err(|e| decode_error(name, e))?
            .map(|ts| Value::String(format_timestamp(&ts))),
        ColumnType::Jsonb => row
            .try_get::<Option<Json<Value>>, _>(index)
            .map_err(|e| decode_error(name, e))?
            .map(|json| json.0),
        ColumnType::Array(inner) => match inner.as_ref() {
            ColumnType::String(_) | ColumnType::Text => row
                .try_get::<Option<Vec<String>>, _>(index)
                .map_err(|e| decode_error(name, e))?
                .map(|items| Value::Array(items.into_iter().map(Value::String).collect())),
            ColumnType::Integer => row
                .try_get::<Option<Vec<i64>>, _>(index)
                .map_err(|e| decode_error(name, e))?
                .map(|items| {
                    Value::Array(items.into_iter().map(|n| Value::Number(n.into())).collect())
                }),
            ColumnType::Boolean => row
                .try_get::<Option<Vec<bool>>, _>(index)
                .map_err(|e| decode_error(name, e))?
                .map(|items| Value::Array(items.into_iter().map(Value::Bool).collect())),
            other => {
                return Err(OperationsError::Serialization(format!(
                    "column '{name}' has unsupported array element type {}",
                    other.cast_type()
                )))
            }
        },
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Decodes a returned row into column name to value.
pub fn row_to_record(row: &PgRow, definition: &TableDefinition) -> Result<Row> {
    let mut record = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        let name = column.name();
        let spec = definition.find_column(name).ok_or_else(|| {
            OperationsError::Serialization(format!(
                "table '{}' returned unexpected column '{name}'",
                definition.name
            ))
        })?;
        record.insert(
            name.to_string(),
            decode_column(row, index, name, &spec.column_type)?,
        );
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn param(value: Value, column_type: ColumnType) -> Param {
        Param { value, column_type }
    }

    #[test]
    fn test_bind_accepts_matching_values() {
        let params = vec![
            param(json!("chartreuse"), ColumnType::String(36)),
            param(json!(10), ColumnType::Integer),
            param(json!(true), ColumnType::Boolean),
            param(json!("2014-01-03T17:59:23.634Z"), ColumnType::Date),
            param(json!({ "contrast": "high" }), ColumnType::Jsonb),
            param(json!(["user"]), ColumnType::array(ColumnType::String(16))),
            param(Value::Null, ColumnType::Integer),
        ];

        assert!(bind_all(sqlx::query("SELECT 1"), &params).is_ok());
    }

    #[test]
    fn test_bind_rejects_mismatched_values() {
        let cases = vec![
            param(json!(1), ColumnType::Text),
            param(json!("ten"), ColumnType::Integer),
            param(json!("yesterday"), ColumnType::Date),
            param(json!("user"), ColumnType::array(ColumnType::Text)),
            param(json!([1]), ColumnType::array(ColumnType::Text)),
        ];

        for case in cases {
            let result = bind_param(sqlx::query("SELECT 1"), &case);
            assert!(
                matches!(result, Err(OperationsError::InvalidData(_))),
                "{case:?} should not bind"
            );
        }
    }
}
