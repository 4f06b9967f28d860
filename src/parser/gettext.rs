use serde_json::Value;
use std::path::{Path, PathBuf};

use super::{read_json_value, RawEntry};
use crate::error::{PipelineError, Result};

/// Read one message catalog file of a language (`{"<id>": "<text>"}`).
pub(super) fn read_entries(
    path: &Path,
    lang: &str,
) -> Result<impl Iterator<Item = Result<RawEntry>>> {
    let map = match read_json_value(path)? {
        Value::Object(map) => map,
        _ => return Err(PipelineError::malformed(path, "expected a message catalog object")),
    };

    let path: PathBuf = path.to_path_buf();
    let lang = lang.to_string();

    Ok(map.into_iter().map(move |(id, text)| {
        if id.parse::<i64>().is_err() {
            let reason = format!("message id '{}' is not numeric", id);
            return Err(PipelineError::malformed(&path, reason));
        }
        match text {
            Value::String(text) => Ok(RawEntry::Gettext {
                lang: lang.clone(),
                id,
                text,
            }),
            _ => Err(PipelineError::malformed(&path, format!("message {id} is not a string"))),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_catalog_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("0.json");
        fs::write(&path, r#"{"1": "Frigate", "2": "Destroyer"}"#).unwrap();

        let entries: Vec<_> = read_entries(&path, "en")
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_non_string_message_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("0.json");
        fs::write(&path, r#"{"1": 5}"#).unwrap();

        let results: Vec<_> = read_entries(&path, "en").unwrap().collect();
        assert!(matches!(results[0], Err(PipelineError::MalformedSource { .. })));
    }

    #[test]
    fn test_non_numeric_id_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("0.json");
        fs::write(&path, r#"{"abc": "x"}"#).unwrap();

        let results: Vec<_> = read_entries(&path, "en").unwrap().collect();
        assert!(results[0].is_err());
    }
}
