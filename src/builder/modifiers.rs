//! Modifier definitions, their values, and the per-slot item modifiers
//! expanded from both.

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{persist_all, Batch};
use crate::config::SourceLayout;
use crate::error::Result;
use crate::parser::{as_int, collect_records, SourceFormat};
use crate::resolver::{EntityKind, Resolver};
use crate::schema::{TableSchema, ITEM_MODIFIERS, MODIFIER_DEFINITIONS, MODIFIER_VALUES};
use crate::sql_values;
use crate::writer::{Entity, ModeWriter, SqlValue};

#[derive(Debug, Clone, Default, Deserialize)]
struct DefinitionSource {
    #[serde(default)]
    change_types: Vec<Value>,
    attribute_only: Option<bool>,
    #[serde(default)]
    change_ranges: Vec<Value>,
    #[serde(default)]
    change_range_module_names: Vec<Value>,
    #[serde(default)]
    attribute_ids: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ValueSource {
    #[serde(default)]
    attributes: Vec<Value>,
    type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModifierDefinition {
    pub id: i64,
    pub code: String,
    pub change_types: String,
    pub attribute_only: Option<bool>,
    pub change_ranges: String,
    pub change_range_module_names: String,
    pub attribute_ids: String,
}

impl Entity for ModifierDefinition {
    fn table() -> &'static TableSchema {
        &MODIFIER_DEFINITIONS
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![
            self.id,
            &self.code,
            &self.change_types,
            self.attribute_only,
            &self.change_ranges,
            &self.change_range_module_names,
            &self.attribute_ids,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModifierValue {
    pub code: String,
    pub definition_id: i64,
    pub type_name: String,
    pub attributes: String,
}

impl Entity for ModifierValue {
    fn table() -> &'static TableSchema {
        &MODIFIER_VALUES
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![&self.code, self.definition_id, &self.type_name, &self.attributes]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemModifier {
    pub code: String,
    pub slot: i64,
    pub definition_id: i64,
    pub type_code: String,
    pub change_type: Option<String>,
    pub attribute_only: Option<bool>,
    pub change_range: Option<String>,
    pub attribute_id: i64,
    pub attribute_value: f64,
}

impl Entity for ItemModifier {
    fn table() -> &'static TableSchema {
        &ITEM_MODIFIERS
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![
            &self.code,
            self.slot,
            self.definition_id,
            &self.type_code,
            self.change_type.clone(),
            self.attribute_only,
            self.change_range.clone(),
            self.attribute_id,
            self.attribute_value,
        ]
    }
}

#[derive(Debug, Default)]
pub struct ModifierBatch {
    pub definitions: Vec<ModifierDefinition>,
    pub values: Vec<ModifierValue>,
    pub item_modifiers: Vec<ItemModifier>,
}

impl Batch for ModifierBatch {
    /// The modifier tables are rebuilt as a whole
    fn persist(&self, writer: &ModeWriter) -> Result<u64> {
        writer.clear(&MODIFIER_DEFINITIONS)?;
        persist_all(
            writer,
            &[&self.definitions, &self.values, &self.item_modifiers],
        )
    }

    fn len(&self) -> usize {
        self.definitions.len() + self.values.len() + self.item_modifiers.len()
    }
}

fn list_text(values: &[Value]) -> String {
    Value::Array(values.to_vec()).to_string()
}

fn element_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Expand one modifier value into a row per slot of its definition
fn expand_slots(
    value: &ModifierValue,
    definition: &ModifierDefinition,
    source: &DefinitionSource,
    attributes: &[Value],
    resolver: &Resolver,
) -> Vec<ItemModifier> {
    let context = format!("modifier {}", value.code);
    let mut rows = Vec::new();

    for (slot, raw_attribute) in source.attribute_ids.iter().enumerate() {
        let Some(attribute_value) = attributes.get(slot).and_then(Value::as_f64) else {
            continue;
        };
        let Some(raw_attribute) = as_int(raw_attribute) else {
            warn!("{}: slot {} has no attribute id, skipped", context, slot);
            continue;
        };
        let resolved = resolver.resolve_optional(EntityKind::Attribute, raw_attribute, &context);
        let Some(attribute_id) = resolved else {
            continue;
        };

        rows.push(ItemModifier {
            code: value.code.clone(),
            slot: slot as i64,
            definition_id: definition.id,
            type_code: value.type_name.clone(),
            change_type: element_text(source.change_types.get(slot)),
            attribute_only: definition.attribute_only,
            change_range: element_text(source.change_ranges.get(slot)),
            attribute_id,
            attribute_value,
        });
    }
    rows
}

pub fn build(layout: &SourceLayout, resolver: &mut Resolver) -> Result<ModifierBatch> {
    let path = layout.cal_code_modifier();

    // Map iteration is ordered by code, which fixes the definition ids
    let mut sources = Vec::new();
    for record in collect_records(&path, &SourceFormat::json_at("data.meta"))? {
        let source: DefinitionSource = serde_json::from_value(record.fields.clone())
            .map_err(|e| record.malformed(e.to_string()))?;
        sources.push((record.key, source));
    }

    let mut definitions = Vec::with_capacity(sources.len());
    for (idx, (code, source)) in sources.iter().enumerate() {
        let id = idx as i64 + 1;
        resolver.register(EntityKind::ModifierDefinition, code.as_str(), id);
        definitions.push(ModifierDefinition {
            id,
            code: code.clone(),
            change_types: list_text(&source.change_types),
            attribute_only: source.attribute_only,
            change_ranges: list_text(&source.change_ranges),
            change_range_module_names: list_text(&source.change_range_module_names),
            attribute_ids: list_text(&source.attribute_ids),
        });
    }

    let mut values = Vec::new();
    let mut item_modifiers = Vec::new();
    for record in collect_records(&path, &SourceFormat::json_at("data.code"))? {
        let source: ValueSource = serde_json::from_value(record.fields.clone())
            .map_err(|e| record.malformed(e.to_string()))?;
        let Some(type_name) = source.type_name else {
            warn!("modifier {}: no type name, skipped", record.key);
            continue;
        };
        let context = format!("modifier {}", record.key);
        let Some(definition_id) =
            resolver.resolve_optional(EntityKind::ModifierDefinition, type_name.as_str(), &context)
        else {
            continue;
        };

        let value = ModifierValue {
            code: record.key.clone(),
            definition_id,
            type_name,
            attributes: list_text(&source.attributes),
        };
        let idx = (definition_id - 1) as usize;
        item_modifiers.extend(expand_slots(
            &value,
            &definitions[idx],
            &sources[idx].1,
            &source.attributes,
            resolver,
        ));
        values.push(value);
    }

    info!(
        "Built {} modifier definitions, {} values, {} item modifiers",
        definitions.len(),
        values.len(),
        item_modifiers.len()
    );
    Ok(ModifierBatch {
        definitions,
        values,
        item_modifiers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_values_expand_into_slots() {
        let dir = TempDir::new().unwrap();
        let layout = SourceLayout::new(dir.path());
        let path = layout.cal_code_modifier();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{"data": {
                "meta": {
                    "ArmorHP": {"change_types": ["PostPercent", "PostAdd"], "attribute_only": true,
                                "change_ranges": ["Ship", "Ship"], "attribute_ids": [265, 999]},
                    "Shield": {"change_types": ["PostAdd"], "attribute_ids": [263]}
                },
                "code": {
                    "mod_1": {"attributes": [0.05, 10], "type_name": "ArmorHP"},
                    "mod_2": {"attributes": [null], "type_name": "Shield"},
                    "mod_3": {"attributes": [1], "type_name": "Unknown"}
                }
            }}"#,
        )
        .unwrap();

        let mut resolver = Resolver::new();
        resolver.register(EntityKind::Attribute, 265_i64, 265);
        resolver.register(EntityKind::Attribute, 263_i64, 263);

        let batch = build(&layout, &mut resolver).unwrap();
        assert_eq!(batch.definitions.len(), 2);
        assert_eq!(batch.definitions[0].code, "ArmorHP");
        assert_eq!(batch.definitions[0].id, 1);
        assert_eq!(batch.definitions[0].attribute_ids, "[265,999]");

        // mod_3 has no definition
        assert_eq!(batch.values.len(), 2);

        // 999 is not an attribute, mod_2 has no value
        assert_eq!(batch.item_modifiers.len(), 1);
        let row = &batch.item_modifiers[0];
        assert_eq!(row.code, "mod_1");
        assert_eq!(row.slot, 0);
        assert_eq!(row.change_type.as_deref(), Some("PostPercent"));
        assert_eq!(row.attribute_value, 0.05);
        assert_eq!(row.attribute_only, Some(true));
    }
}
