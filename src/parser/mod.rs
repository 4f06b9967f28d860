//! Raw loaders for the three source formats shipped with the game.
//!
//! Every format is read into a format-specific [`RawEntry`] and converted at
//! once into the uniform [`RawRecord`], so builders never branch on format.

mod gettext;
mod json;
pub mod record;
mod script;

pub use record::{as_int, RawRecord};

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{PipelineError, Result};

/// Declared format of an input file
#[derive(Debug, Clone, PartialEq)]
pub enum SourceFormat {
    /// Python class bodies of `NAME = <int>` constants
    ScriptLiteral,
    /// A JSON object of records, optionally below a dotted root key
    Json { root_key: Option<&'static str> },
    /// A per-language message catalog (`{"<id>": "<text>"}`)
    Gettext { lang: String },
}

impl SourceFormat {
    pub fn json() -> Self {
        SourceFormat::Json { root_key: None }
    }

    pub fn json_at(root_key: &'static str) -> Self {
        SourceFormat::Json {
            root_key: Some(root_key),
        }
    }
}

/// A source entry in its native shape
#[derive(Debug)]
pub enum RawEntry {
    Script {
        class: String,
        name: String,
        value: i64,
    },
    Json {
        key: String,
        value: Value,
    },
    Gettext {
        lang: String,
        id: String,
        text: String,
    },
}

impl RawEntry {
    fn into_record(self, source: &Rc<Path>) -> RawRecord {
        match self {
            RawEntry::Script { class, name, value } => RawRecord::new(
                source.clone(),
                value.to_string(),
                json!({ "table": class, "name": name }),
            ),
            RawEntry::Json { key, value } => RawRecord::new(source.clone(), key, value),
            RawEntry::Gettext { lang, id, text } => {
                RawRecord::new(source.clone(), id, json!({ "lang": lang, "text": text }))
            }
        }
    }
}

/// Lazy, single-pass sequence of records
pub type Records = Box<dyn Iterator<Item = Result<RawRecord>>>;

/// Open `path` and stream its records.
///
/// Fails with `MalformedSource` when the file's shape does not match `format`.
/// Restarting requires calling this again.
pub fn read_records(path: &Path, format: &SourceFormat) -> Result<Records> {
    let source: Rc<Path> = Rc::from(path);

    let entries: Box<dyn Iterator<Item = Result<RawEntry>>> = match format {
        SourceFormat::ScriptLiteral => Box::new(script::read_entries(path)?),
        SourceFormat::Json { root_key } => Box::new(json::read_entries(path, *root_key)?.map(Ok)),
        SourceFormat::Gettext { lang } => Box::new(gettext::read_entries(path, lang)?),
    };

    let records = entries.map(move |entry| entry.map(|e| e.into_record(&source)));
    Ok(Box::new(records))
}

/// Read every record of a file into memory
pub fn collect_records(path: &Path, format: &SourceFormat) -> Result<Vec<RawRecord>> {
    read_records(path, format)?.collect()
}

/// Read a whole JSON document, for files that are not record dictionaries
pub fn read_json_value(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| PipelineError::malformed(path, e.to_string()))
}

/// List `<prefix><digits>.json` files in a directory, ordered by number
pub fn numbered_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::io(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let number = name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(".json"))
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u64>().ok());

        if let Some(number) = number {
            files.push((number, entry.path()));
        }
    }

    files.sort();
    Ok(files.into_iter().map(|(_, path)| path).collect())
}
