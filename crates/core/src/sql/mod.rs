mod builder;

pub use builder::{
    create_table, delete_rows, drop_table, insert_columns, insert_rows, quote_identifier,
    select_rows, update_rows, Param, Statement, LIST_DATABASES, MAX_BIND_PARAMS,
};
