use serde_json::Value;
use std::path::Path;

use super::{read_json_value, RawEntry};
use crate::error::{PipelineError, Result};

/// Parse a JSON dictionary file and iterate its entries.
///
/// `root_key` is a dotted path (`data.item_manufacturing`) to the dictionary.
pub(super) fn read_entries(
    path: &Path,
    root_key: Option<&str>,
) -> Result<impl Iterator<Item = RawEntry>> {
    let mut value = read_json_value(path)?;

    if let Some(root_key) = root_key {
        for key in root_key.split('.') {
            value = match value {
                Value::Object(mut map) => map.remove(key).ok_or_else(|| {
                    PipelineError::malformed(path, format!("missing root key '{}'", root_key))
                })?,
                _ => {
                    return Err(PipelineError::malformed(
                        path,
                        format!("'{}' is not below an object", root_key),
                    ))
                }
            };
        }
    }

    match value {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| RawEntry::Json { key, value })),
        _ => Err(PipelineError::malformed(path, "expected a JSON object of records")),
    }
}
