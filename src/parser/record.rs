use serde_json::{Map, Value};
use std::path::Path;
use std::rc::Rc;

use crate::error::{PipelineError, Result};
use crate::resolver::RawId;

/// One record read from a source file, before any interpretation.
///
/// `key` is the record's native identifier (dictionary key, message id or
/// constant value); `fields` is the record body.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub source: Rc<Path>,
    pub key: String,
    pub fields: Value,
}

impl RawRecord {
    pub fn new(source: Rc<Path>, key: impl Into<String>, fields: Value) -> Self {
        Self {
            source,
            key: key.into(),
            fields,
        }
    }

    /// Build an error pointing at this record
    pub fn malformed(&self, reason: impl AsRef<str>) -> PipelineError {
        let reason = format!("record {}: {}", self.key, reason.as_ref());
        PipelineError::malformed(&self.source, reason)
    }

    /// The record key as an integer id
    pub fn id(&self) -> Result<i64> {
        self.key
            .parse::<i64>()
            .map_err(|_| self.malformed("key is not an integer id"))
    }

    pub fn raw_id(&self) -> RawId {
        RawId::from_key(&self.key)
    }

    /// The record body as an object
    pub fn object(&self) -> Result<&Map<String, Value>> {
        self.fields
            .as_object()
            .ok_or_else(|| self.malformed("expected an object"))
    }

    /// A field value; `null` counts as absent
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self.fields.get(field) {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        }
    }

    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn int(&self, field: &str) -> Result<i64> {
        self.opt_int(field)?
            .ok_or_else(|| self.malformed(format!("missing field '{}'", field)))
    }

    pub fn opt_int(&self, field: &str) -> Result<Option<i64>> {
        match self.get(field) {
            None => Ok(None),
            Some(v) => as_int(v)
                .map(Some)
                .ok_or_else(|| self.malformed(format!("field '{}' is not an integer", field))),
        }
    }

    /// Integer field where `0` means "no reference"
    pub fn opt_ref(&self, field: &str) -> Result<Option<i64>> {
        Ok(self.opt_int(field)?.filter(|v| *v != 0))
    }

    pub fn opt_float(&self, field: &str) -> Result<Option<f64>> {
        match self.get(field) {
            None => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.malformed(format!("field '{}' is not a number", field))),
        }
    }

    pub fn str(&self, field: &str) -> Result<&str> {
        self.opt_str(field)?
            .ok_or_else(|| self.malformed(format!("missing field '{}'", field)))
    }

    pub fn opt_str(&self, field: &str) -> Result<Option<&str>> {
        match self.get(field) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| self.malformed(format!("field '{}' is not a string", field))),
        }
    }

    /// Boolean field, also accepting `0`/`1`; absent fields use `default`
    pub fn bool_or(&self, field: &str, default: bool) -> Result<bool> {
        match self.get(field) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(v) => match as_int(v) {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                _ => Err(self.malformed(format!("field '{}' is not a boolean", field))),
            },
        }
    }

    /// A list field re-encoded as JSON text; absent lists become `[]`
    pub fn list_text(&self, field: &str) -> Result<String> {
        match self.get(field) {
            None => Ok("[]".to_string()),
            Some(v @ Value::Array(_)) => Ok(v.to_string()),
            Some(_) => Err(self.malformed(format!("field '{}' is not a list", field))),
        }
    }

    /// A list field whose elements are all integers
    pub fn int_list(&self, field: &str) -> Result<Vec<i64>> {
        match self.get(field) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    as_int(v).ok_or_else(|| {
                        self.malformed(format!("field '{}' contains a non-integer", field))
                    })
                })
                .collect(),
            Some(_) => Err(self.malformed(format!("field '{}' is not a list", field))),
        }
    }

    /// A nested `{x, y, z}` object
    pub fn position(&self, field: &str) -> Result<Option<(f64, f64, f64)>> {
        let Some(obj) = self.get(field) else {
            return Ok(None);
        };
        let coord = |axis: &str| {
            obj.get(axis)
                .and_then(|v| v.as_f64())
                .ok_or_else(|| self.malformed(format!("field '{field}.{axis}' is not a number")))
        };
        Ok(Some((coord("x")?, coord("y")?, coord("z")?)))
    }
}

/// Lenient integer conversion: integral floats and numeric strings are accepted
pub fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(fields: Value) -> RawRecord {
        RawRecord::new(Rc::from(Path::new("test.json")), "10", fields)
    }

    #[test]
    fn test_int_accessors() {
        let r = record(json!({"a": 5, "b": "7", "c": 2.0, "d": null, "e": "x"}));
        assert_eq!(r.int("a").unwrap(), 5);
        assert_eq!(r.int("b").unwrap(), 7);
        assert_eq!(r.int("c").unwrap(), 2);
        assert_eq!(r.opt_int("d").unwrap(), None);
        assert!(r.int("e").is_err());
        assert!(r.int("missing").is_err());
    }

    #[test]
    fn test_opt_ref_treats_zero_as_none() {
        let r = record(json!({"unit_id": 0, "other": 4}));
        assert_eq!(r.opt_ref("unit_id").unwrap(), None);
        assert_eq!(r.opt_ref("other").unwrap(), Some(4));
    }

    #[test]
    fn test_bool_or() {
        let r = record(json!({"a": true, "b": 0, "c": "yes"}));
        assert!(r.bool_or("a", false).unwrap());
        assert!(!r.bool_or("b", true).unwrap());
        assert!(r.bool_or("missing", true).unwrap());
        assert!(r.bool_or("c", false).is_err());
    }

    #[test]
    fn test_list_text_defaults_to_empty() {
        let r = record(json!({"ships": [1, 2]}));
        assert_eq!(r.list_text("ships").unwrap(), "[1,2]");
        assert_eq!(r.list_text("none").unwrap(), "[]");
    }

    #[test]
    fn test_id_requires_numeric_key() {
        let r = RawRecord::new(Rc::from(Path::new("t.json")), "abc", json!({}));
        assert!(r.id().is_err());
        assert_eq!(record(json!({})).id().unwrap(), 10);
    }

    #[test]
    fn test_position() {
        let r = record(json!({"center": {"x": 1.0, "y": 2, "z": -3.5}}));
        assert_eq!(r.position("center").unwrap(), Some((1.0, 2.0, -3.5)));
        assert_eq!(r.position("position").unwrap(), None);
    }
}
