mod operations;
mod types;

pub use operations::{
    describe_key, format_timestamp, matches_filter, normalize_value, parse_timestamp,
    project_row, require_filter, validate_columns, validate_filter, validate_record,
    validate_update,
};
pub use types::{
    record_from_value, DataSets, DeleteMode, Filter, Record, Retrieval, Row, SelectQuery,
    UpdateOutcome, UpdateRequest,
};
