use crate::schema::{ColumnSpec, ColumnType, TableDefinition};

use super::data::{MASSIVE, PREFERENCE_SETS, RGB, USERS};

/// A table that is created but never loaded.
pub const NODATA: &str = "nodata";

pub fn rgb_table() -> TableDefinition {
    TableDefinition::new(RGB)
        .with_column(ColumnSpec::new("id", ColumnType::String(36)).primary_key())
        .with_column(ColumnSpec::new("color", ColumnType::String(36)))
        .with_column(ColumnSpec::new("colourMap", ColumnType::Jsonb))
}

pub fn preference_set_table() -> TableDefinition {
    TableDefinition::new(PREFERENCE_SETS)
        .with_column(ColumnSpec::new("name", ColumnType::String(64)).primary_key())
        .with_column(ColumnSpec::new("description", ColumnType::String(64)))
        .with_column(ColumnSpec::new("prefs_json", ColumnType::Jsonb))
}

/// Text-only table with a generated key.
pub fn massive_table() -> TableDefinition {
    TableDefinition::new(MASSIVE).with_column(ColumnSpec::new("text", ColumnType::Text))
}

pub fn users_table() -> TableDefinition {
    TableDefinition::new(USERS)
        .with_column(ColumnSpec::new("id", ColumnType::String(64)).primary_key())
        .with_column(ColumnSpec::new("rev", ColumnType::String(64)))
        .with_column(ColumnSpec::new("password_scheme", ColumnType::String(64)))
        .with_column(ColumnSpec::new("iterations", ColumnType::Integer))
        .with_column(ColumnSpec::new("username", ColumnType::String(64)))
        .with_column(ColumnSpec::new("type", ColumnType::String(16)))
        .with_column(ColumnSpec::new("name", ColumnType::String(16)))
        .with_column(ColumnSpec::new("email", ColumnType::String(32)))
        .with_column(ColumnSpec::new(
            "roles",
            ColumnType::array(ColumnType::String(16)),
        ))
        .with_column(ColumnSpec::new("signupTimestamp", ColumnType::Date))
        .with_column(ColumnSpec::new("failedLoginAttempts", ColumnType::Integer))
        .with_column(ColumnSpec::new("derived_key", ColumnType::string()))
        .with_column(ColumnSpec::new("salt", ColumnType::string()))
        .with_column(ColumnSpec::new("emailVerificationTimestamp", ColumnType::Date))
        .with_column(ColumnSpec::new("verified", ColumnType::Boolean))
}

/// Table with no declared columns at all.
pub fn nodata_table() -> TableDefinition {
    TableDefinition::new(NODATA)
}

/// Every seed table, in creation order.
pub fn table_definitions() -> Vec<TableDefinition> {
    vec![
        rgb_table(),
        preference_set_table(),
        massive_table(),
        users_table(),
        nodata_table(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::validate_definition;

    #[test]
    fn test_all_definitions_are_valid() {
        for definition in table_definitions() {
            assert!(
                validate_definition(&definition).is_ok(),
                "{} should be valid",
                definition.name
            );
        }
    }

    #[test]
    fn test_table_names_are_unique() {
        let mut names: Vec<String> = table_definitions().into_iter().map(|t| t.name).collect();
        let count = names.len();
        names.dedup();
        assert_eq!(names.len(), count);
    }

    #[test]
    fn test_massive_and_nodata_get_generated_keys() {
        assert!(massive_table().has_implicit_id());
        assert!(nodata_table().has_implicit_id());
        assert!(!rgb_table().has_implicit_id());
    }
}
