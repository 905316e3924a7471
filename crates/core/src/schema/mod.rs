mod types;

pub use types::{
    validate_definition, ColumnSpec, ColumnType, Table, TableDefinition, CREATED_AT_COLUMN,
    DELETED_AT_COLUMN, ID_COLUMN, UPDATED_AT_COLUMN,
};
