use serde_json::Value;
use tracing::info;

use super::{persist_all, Batch};
use crate::config::SourceLayout;
use crate::error::Result;
use crate::parser::{as_int, numbered_files, read_records, RawRecord, SourceFormat};
use crate::resolver::{EntityKind, RawId, Resolver};
use crate::schema::{TableSchema, ITEM_ATTRIBUTES, ITEM_EFFECTS};
use crate::sql_values;
use crate::writer::{Entity, ModeWriter, SqlValue};

#[derive(Debug, Clone, PartialEq)]
pub struct ItemAttribute {
    pub item_id: i64,
    pub attribute_id: i64,
    pub value: f64,
}

impl Entity for ItemAttribute {
    fn table() -> &'static TableSchema {
        &ITEM_ATTRIBUTES
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![self.item_id, self.attribute_id, self.value]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemEffect {
    pub item_id: i64,
    pub effect_id: i64,
    pub is_default: bool,
}

impl Entity for ItemEffect {
    fn table() -> &'static TableSchema {
        &ITEM_EFFECTS
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![self.item_id, self.effect_id, self.is_default]
    }
}

#[derive(Debug, Default)]
pub struct ItemAttrsBatch {
    pub attributes: Vec<ItemAttribute>,
    pub effects: Vec<ItemEffect>,
}

impl Batch for ItemAttrsBatch {
    fn persist(&self, writer: &ModeWriter) -> Result<u64> {
        persist_all(writer, &[&self.attributes, &self.effects])
    }

    fn len(&self) -> usize {
        self.attributes.len() + self.effects.len()
    }
}

/// Resolve the item of a `{item: {target: value}}` record and each of its
/// targets. Unknown items or targets are skipped with a warning.
fn resolved_pairs<'r>(
    record: &'r RawRecord,
    target: EntityKind,
    resolver: &Resolver,
) -> Result<Vec<(i64, i64, &'r Value)>> {
    let context = format!("{} of item {}", target, record.key);
    let resolved = resolver.resolve_optional(EntityKind::Item, record.raw_id(), &context);
    let Some(item_id) = resolved else {
        return Ok(Vec::new());
    };

    let mut pairs = Vec::new();
    for (key, value) in record.object()? {
        if let Some(target_id) = resolver.resolve_optional(target, RawId::from_key(key), &context) {
            pairs.push((item_id, target_id, value));
        }
    }
    Ok(pairs)
}

pub fn build(layout: &SourceLayout, resolver: &Resolver) -> Result<ItemAttrsBatch> {
    let mut attributes = Vec::new();
    for path in numbered_files(&layout.dogma_dir(), "type_attributes_")? {
        for record in read_records(&path, &SourceFormat::json())? {
            let record = record?;
            let pairs = resolved_pairs(&record, EntityKind::Attribute, resolver)?;
            for (item_id, attribute_id, value) in pairs {
                let Some(value) = value.as_f64() else {
                    let reason = format!("value of attribute {attribute_id} is not a number");
                    return Err(record.malformed(reason));
                };
                attributes.push(ItemAttribute {
                    item_id,
                    attribute_id,
                    value,
                });
            }
        }
    }

    let mut effects = Vec::new();
    for record in read_records(&layout.type_effects(), &SourceFormat::json())? {
        let record = record?;
        for (item_id, effect_id, value) in resolved_pairs(&record, EntityKind::Effect, resolver)? {
            let is_default = match value {
                Value::Bool(b) => *b,
                other => as_int(other).unwrap_or(0) != 0,
            };
            effects.push(ItemEffect {
                item_id,
                effect_id,
                is_default,
            });
        }
    }

    attributes.sort_by_key(|a| (a.item_id, a.attribute_id));
    effects.sort_by_key(|e| (e.item_id, e.effect_id));

    info!(
        "Built {} item attributes, {} item effects",
        attributes.len(),
        effects.len()
    );
    Ok(ItemAttrsBatch {
        attributes,
        effects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_unknown_references_skip_rows() {
        let dir = TempDir::new().unwrap();
        let layout = SourceLayout::new(dir.path());
        fs::create_dir_all(layout.dogma_dir()).unwrap();
        fs::write(
            layout.dogma_dir().join("type_attributes_1.json"),
            r#"{"10000": {"4": 1067000.0, "999": 1.0}, "12345": {"4": 2.0}}"#,
        )
        .unwrap();
        fs::write(layout.type_effects(), r#"{"10000": {"11": 1, "12": 0}}"#).unwrap();

        let mut resolver = Resolver::new();
        resolver.register(EntityKind::Item, 10000_i64, 10000);
        resolver.register(EntityKind::Attribute, 4_i64, 4);
        resolver.register(EntityKind::Effect, 11_i64, 11);

        let batch = build(&layout, &resolver).unwrap();
        assert_eq!(
            batch.attributes,
            vec![ItemAttribute {
                item_id: 10000,
                attribute_id: 4,
                value: 1067000.0,
            }]
        );
        assert_eq!(batch.effects.len(), 1);
        assert!(batch.effects[0].is_default);
    }
}
