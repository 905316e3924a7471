use serde_json::Value;

use crate::error::{OperationsError, Result};
use crate::record::{DataSets, Record};

pub const RGB: &str = "rgb";
pub const PREFERENCE_SETS: &str = "roster.preferenceset";
pub const MASSIVE: &str = "massive";
pub const USERS: &str = "users";

const DATA_FILES: [(&str, &str); 4] = [
    (RGB, include_str!("../../fixtures/rgb.json")),
    (PREFERENCE_SETS, include_str!("../../fixtures/preferenceset.json")),
    (MASSIVE, include_str!("../../fixtures/massive.json")),
    (USERS, include_str!("../../fixtures/users.json")),
];

fn parse(name: &str, source: &str) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_str(source)
        .map_err(|e| OperationsError::Serialization(format!("data set '{name}': {e}")))?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(record) => Ok(record),
                other => Err(OperationsError::Serialization(format!(
                    "data set '{name}' contains a non-object entry: {other}"
                ))),
            })
            .collect(),
        _ => Err(OperationsError::Serialization(format!(
            "data set '{name}' is not an array"
        ))),
    }
}

/// The records of one seed data set, or `None` if there is no such set.
pub fn data_set(name: &str) -> Option<Result<Vec<Record>>> {
    DATA_FILES
        .iter()
        .find(|(set, _)| *set == name)
        .map(|(set, source)| parse(set, source))
}

/// Every seed data set.
pub fn data_sets() -> Result<DataSets> {
    DATA_FILES
        .iter()
        .map(|(name, source)| Ok((name.to_string(), parse(name, source)?)))
        .collect()
}
