use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde_json::{Number, Value};

use crate::error::{OperationsError, Result};
use crate::schema::{ColumnSpec, ColumnType, TableDefinition};

use super::types::{Filter, Record, Row, UpdateRequest};

/// Formats a timestamp the way every connection reports `Date` columns.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .trunc_subsecs(6)
        .to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parses a `Date` column value, truncated to the microsecond precision of `TIMESTAMPTZ`.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc).trunc_subsecs(6))
}

fn type_mismatch(column: &ColumnSpec, value: &Value) -> OperationsError {
    OperationsError::InvalidData(format!(
        "column '{}' expects {} but got {}",
        column.name,
        column.column_type.cast_type(),
        value
    ))
}

/// Checks a value against a column's type and returns its canonical form.
///
/// `null` is passed through; nullability is checked by the callers that care.
pub fn normalize_value(column: &ColumnSpec, value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    normalize_typed(column, &column.column_type, value)
}

fn normalize_typed(column: &ColumnSpec, column_type: &ColumnType, value: &Value) -> Result<Value> {
    match column_type {
        ColumnType::String(max_len) => match value {
            Value::String(s) if s.chars().count() <= *max_len as usize => Ok(value.clone()),
            Value::String(_) => Err(OperationsError::InvalidData(format!(
                "value for column '{}' is longer than {} characters",
                column.name, max_len
            ))),
            _ => Err(type_mismatch(column, value)),
        },
        ColumnType::Text => match value {
            Value::String(_) => Ok(value.clone()),
            _ => Err(type_mismatch(column, value)),
        },
        ColumnType::Integer | ColumnType::BigSerial => value
            .as_i64()
            .map(|n| Value::Number(n.into()))
            .ok_or_else(|| type_mismatch(column, value)),
        ColumnType::Float => value
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| type_mismatch(column, value)),
        ColumnType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            _ => Err(type_mismatch(column, value)),
        },
        ColumnType::Date => value
            .as_str()
            .and_then(parse_timestamp)
            .map(|ts| Value::String(format_timestamp(&ts)))
            .ok_or_else(|| type_mismatch(column, value)),
        ColumnType::Jsonb => Ok(value.clone()),
        ColumnType::Array(inner) => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    if item.is_null() {
                        Err(OperationsError::InvalidData(format!(
                            "array column '{}' does not accept null elements",
                            column.name
                        )))
                    } else {
                        normalize_typed(column, inner, item)
                    }
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            _ => Err(type_mismatch(column, value)),
        },
    }
}

fn lookup(definition: &TableDefinition, name: &str) -> Result<ColumnSpec> {
    definition.find_column(name).ok_or_else(|| {
        OperationsError::InvalidData(format!(
            "table '{}' has no column '{}'",
            definition.name, name
        ))
    })
}

/// Validates a record for insertion and returns it normalised.
///
/// Unknown columns are rejected, and so are missing or null values for
/// `NOT NULL` columns the database does not generate.
pub fn validate_record(definition: &TableDefinition, record: &Record) -> Result<Record> {
    let mut normalized = Record::new();
    for (name, value) in record {
        let column = lookup(definition, name)?;
        normalized.insert(name.clone(), normalize_value(&column, value)?);
    }

    for column in definition.all_columns() {
        if column.allow_null || column.is_generated() {
            continue;
        }
        let present = normalized.get(&column.name).is_some_and(|v| !v.is_null());
        if !present {
            return Err(OperationsError::InvalidData(format!(
                "column '{}' of table '{}' must not be null",
                column.name, definition.name
            )));
        }
    }

    Ok(normalized)
}

/// Validates a filter and returns it normalised. Null values are allowed.
pub fn validate_filter(definition: &TableDefinition, filter: &Filter) -> Result<Filter> {
    let mut normalized = Filter::new();
    for (name, value) in filter {
        let column = lookup(definition, name)?;
        normalized.insert(name.clone(), normalize_value(&column, value)?);
    }
    Ok(normalized)
}

/// Validates a column selection.
pub fn validate_columns(definition: &TableDefinition, columns: &[String]) -> Result<()> {
    if columns.is_empty() {
        return Err(OperationsError::InvalidData(
            "at least one column must be retrieved".to_string(),
        ));
    }
    for name in columns {
        lookup(definition, name)?;
    }
    Ok(())
}

/// Returns the filter of an update, failing when there is nothing to scope it.
pub fn require_filter(request: &UpdateRequest) -> Result<&Filter> {
    match &request.filter {
        Some(filter) if !filter.is_empty() => Ok(filter),
        _ => Err(OperationsError::MissingIdentifier),
    }
}

/// Validates an update and returns its normalised attributes and filter.
pub fn validate_update(
    definition: &TableDefinition,
    request: &UpdateRequest,
) -> Result<(Record, Filter)> {
    let filter = validate_filter(definition, require_filter(request)?)?;

    if request.attributes.is_empty() {
        return Err(OperationsError::InvalidData(format!(
            "update of table '{}' changes no columns",
            definition.name
        )));
    }

    let mut attributes = Record::new();
    for (name, value) in &request.attributes {
        let column = lookup(definition, name)?;
        if column.is_generated() {
            return Err(OperationsError::InvalidData(format!(
                "column '{}' is managed by the database",
                column.name
            )));
        }
        let value = normalize_value(&column, value)?;
        if value.is_null() && !column.allow_null {
            return Err(OperationsError::InvalidData(format!(
                "column '{}' of table '{}' must not be null",
                column.name, definition.name
            )));
        }
        attributes.insert(name.clone(), value);
    }

    Ok((attributes, filter))
}

/// Returns true when every filter pair equals the row's value.
///
/// A `null` filter value matches a null or absent column.
pub fn matches_filter(row: &Row, filter: &Filter) -> bool {
    filter.iter().all(|(name, expected)| match row.get(name) {
        Some(actual) => actual == expected,
        None => expected.is_null(),
    })
}

/// Keeps only the named columns of a row, in the requested order.
pub fn project_row(row: &Row, columns: &[String]) -> Row {
    columns
        .iter()
        .map(|name| (name.clone(), row.get(name).cloned().unwrap_or(Value::Null)))
        .collect()
}

/// Describes a record's primary key, for error messages.
pub fn describe_key(definition: &TableDefinition, record: &Record) -> String {
    definition
        .primary_key()
        .iter()
        .map(|column| match record.get(&column.name) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "null".to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record_from_value;
    use serde_json::json;

    fn users() -> TableDefinition {
        TableDefinition::new("users")
            .with_column(ColumnSpec::new("id", ColumnType::String(64)).primary_key())
            .with_column(ColumnSpec::new("iterations", ColumnType::Integer))
            .with_column(ColumnSpec::new("email", ColumnType::String(32)))
            .with_column(ColumnSpec::new(
                "roles",
                ColumnType::array(ColumnType::String(16)),
            ))
            .with_column(ColumnSpec::new("signupTimestamp", ColumnType::Date))
            .with_column(ColumnSpec::new("verified", ColumnType::Boolean))
    }

    fn record(value: Value) -> Record {
        record_from_value(value)
    }

    #[test]
    fn test_validate_record_normalises_timestamps() {
        let validated = validate_record(
            &users(),
            &record(json!({
                "id": "carla",
                "signupTimestamp": "2014-01-03T12:59:23.634-05:00"
            })),
        )
        .unwrap();

        assert_eq!(
            validated["signupTimestamp"],
            json!("2014-01-03T17:59:23.634Z")
        );
    }

    #[test]
    fn test_timestamps_keep_microsecond_precision() {
        let validated = validate_record(
            &users(),
            &record(json!({
                "id": "carla",
                "signupTimestamp": "2014-01-03T17:59:23.123456789Z"
            })),
        )
        .unwrap();
        assert_eq!(
            validated["signupTimestamp"],
            json!("2014-01-03T17:59:23.123456Z")
        );

        let now = Utc::now();
        let formatted = format_timestamp(&now);
        assert_eq!(
            parse_timestamp(&formatted).map(|ts| format_timestamp(&ts)),
            Some(formatted)
        );
    }

    #[test]
    fn test_validate_record_rejects_unknown_column() {
        let result = validate_record(&users(), &record(json!({ "id": "carla", "hue": 3 })));
        assert!(matches!(result, Err(OperationsError::InvalidData(_))));
    }

    #[test]
    fn test_validate_record_requires_primary_key() {
        let result = validate_record(&users(), &record(json!({ "email": "carla@localhost" })));
        assert!(matches!(result, Err(OperationsError::InvalidData(_))));
    }

    #[test]
    fn test_validate_record_rejects_wrong_types() {
        let bad_int = validate_record(&users(), &record(json!({ "id": "c", "iterations": "ten" })));
        assert!(bad_int.is_err());

        let bad_array = validate_record(&users(), &record(json!({ "id": "c", "roles": "user" })));
        assert!(bad_array.is_err());

        let null_element =
            validate_record(&users(), &record(json!({ "id": "c", "roles": ["user", null] })));
        assert!(null_element.is_err());
    }

    #[test]
    fn test_validate_record_rejects_overlong_strings() {
        let email = "x".repeat(33);
        let result = validate_record(&users(), &record(json!({ "id": "c", "email": email })));
        assert!(result.is_err());
    }

    #[test]
    fn test_implicit_id_is_not_required() {
        let massive = TableDefinition::new("massive")
            .with_column(ColumnSpec::new("text", ColumnType::Text));
        assert!(validate_record(&massive, &record(json!({ "text": "lorem" }))).is_ok());
    }

    #[test]
    fn test_require_filter_missing_or_empty() {
        let attributes = record(json!({ "verified": false }));

        let unscoped = UpdateRequest::unscoped(attributes.clone());
        assert_eq!(
            require_filter(&unscoped),
            Err(OperationsError::MissingIdentifier)
        );

        let empty = UpdateRequest::new(attributes, Filter::new());
        assert_eq!(
            require_filter(&empty),
            Err(OperationsError::MissingIdentifier)
        );
    }

    #[test]
    fn test_require_filter_ignores_attributes() {
        let request = UpdateRequest::unscoped(Record::new());
        assert_eq!(
            require_filter(&request),
            Err(OperationsError::MissingIdentifier)
        );
    }

    #[test]
    fn test_validate_update_rejects_generated_columns() {
        let request = UpdateRequest::new(
            record(json!({ "createdAt": "2020-01-01T00:00:00Z" })),
            record(json!({ "id": "carla" })),
        );
        assert!(matches!(
            validate_update(&users(), &request),
            Err(OperationsError::InvalidData(_))
        ));
    }

    #[test]
    fn test_validate_update_accepts_scoped_change() {
        let request = UpdateRequest::new(
            record(json!({ "verified": false, "email": "carla@globalhost" })),
            record(json!({ "id": "another.user:nonadmin" })),
        );

        let (attributes, filter) = validate_update(&users(), &request).unwrap();
        assert_eq!(attributes.len(), 2);
        assert_eq!(filter["id"], json!("another.user:nonadmin"));
    }

    #[test]
    fn test_matches_filter() {
        let row = record(json!({ "id": "chartreuse", "color": "green", "colourMap": null }));

        assert!(matches_filter(&row, &record(json!({ "color": "green" }))));
        assert!(matches_filter(&row, &Filter::new()));
        assert!(matches_filter(&row, &record(json!({ "colourMap": null }))));
        assert!(matches_filter(&row, &record(json!({ "missing": null }))));
        assert!(!matches_filter(&row, &record(json!({ "color": "red" }))));
    }

    #[test]
    fn test_project_row_keeps_requested_columns() {
        let row = record(json!({ "id": "chartreuse", "color": "green" }));
        let projected = project_row(&row, &["color".to_string()]);
        assert_eq!(Value::Object(projected), json!({ "color": "green" }));
    }

    #[test]
    fn test_describe_key() {
        let key = describe_key(&users(), &record(json!({ "id": "carla" })));
        assert_eq!(key, "carla");
    }
}
