//! Seed table models and data sets.

mod data;
mod models;

pub use data::{data_set, data_sets, MASSIVE, PREFERENCE_SETS, RGB, USERS};
pub use models::{
    massive_table, nodata_table, preference_set_table, rgb_table, table_definitions, users_table,
    NODATA,
};
