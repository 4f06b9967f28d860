use tracing::info;

use super::{json_text, opt_bool, opt_string, persist_all, Batch};
use crate::config::SourceLayout;
use crate::error::Result;
use crate::parser::{collect_records, SourceFormat};
use crate::resolver::{EntityKind, Resolver};
use crate::schema::{TableSchema, ATTRIBUTES, EFFECTS};
use crate::sql_values;
use crate::writer::{Entity, ModeWriter, SqlValue};

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub id: i64,
    pub name: Option<String>,
    pub category: Option<i64>,
    pub available: Option<bool>,
    pub charge_recharge_time_id: Option<i64>,
    pub default_value: Option<f64>,
    pub high_is_good: Option<bool>,
    pub max_attribute_id: Option<i64>,
    /// JSON text
    pub operator: Option<String>,
    pub stackable: Option<bool>,
    /// JSON text
    pub to_attr_id: Option<String>,
    pub unit_id: Option<i64>,
    pub formula: Option<String>,
}

impl Entity for Attribute {
    fn table() -> &'static TableSchema {
        &ATTRIBUTES
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![
            self.id,
            self.name.clone(),
            self.category,
            self.available,
            self.charge_recharge_time_id,
            self.default_value,
            self.high_is_good,
            self.max_attribute_id,
            self.operator.clone(),
            self.stackable,
            self.to_attr_id.clone(),
            self.unit_id,
            self.formula.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    pub id: i64,
    pub name: Option<String>,
    pub category: Option<i64>,
    pub disallow_auto_repeat: Option<bool>,
    pub guid: Option<String>,
    pub is_assistance: Option<bool>,
    pub is_offensive: Option<bool>,
    pub is_warp_safe: Option<bool>,
    pub electronic_chance: Option<f64>,
    pub falloff_attribute_id: Option<i64>,
    pub fitting_usage_chance_attribute_id: Option<i64>,
    pub discharge_attribute_id: Option<i64>,
    pub duration_attribute_id: Option<i64>,
    pub range_attribute_id: Option<i64>,
    pub range_chance: Option<f64>,
    pub tracking_speed_attribute_id: Option<i64>,
}

impl Entity for Effect {
    fn table() -> &'static TableSchema {
        &EFFECTS
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![
            self.id,
            self.name.clone(),
            self.category,
            self.disallow_auto_repeat,
            self.guid.clone(),
            self.is_assistance,
            self.is_offensive,
            self.is_warp_safe,
            self.electronic_chance,
            self.falloff_attribute_id,
            self.fitting_usage_chance_attribute_id,
            self.discharge_attribute_id,
            self.duration_attribute_id,
            self.range_attribute_id,
            self.range_chance,
            self.tracking_speed_attribute_id,
        ]
    }
}

#[derive(Debug, Default)]
pub struct AttrsBatch {
    pub attributes: Vec<Attribute>,
    pub effects: Vec<Effect>,
}

impl Batch for AttrsBatch {
    fn persist(&self, writer: &ModeWriter) -> Result<u64> {
        persist_all(writer, &[&self.attributes, &self.effects])
    }

    fn len(&self) -> usize {
        self.attributes.len() + self.effects.len()
    }
}

pub fn build(layout: &SourceLayout, resolver: &mut Resolver) -> Result<AttrsBatch> {
    let attribute_records = collect_records(&layout.attributes(), &SourceFormat::json())?;
    for record in &attribute_records {
        let id = record.id()?;
        resolver.register(EntityKind::Attribute, id, id);
    }

    let mut attributes = Vec::with_capacity(attribute_records.len());
    for record in &attribute_records {
        let id = record.id()?;
        let context = format!("attribute {}", id);
        let unit_id = match record.opt_ref("unit_id")? {
            Some(unit) => resolver.resolve_optional(EntityKind::Unit, unit, &context),
            None => None,
        };

        attributes.push(Attribute {
            id,
            name: opt_string(record, "attribute_name")?,
            category: record.opt_int("attribute_category")?,
            available: opt_bool(record, "available")?,
            charge_recharge_time_id: record.opt_int("charge_recharge_time_id")?,
            default_value: record.opt_float("default_value")?,
            high_is_good: opt_bool(record, "high_is_good")?,
            max_attribute_id: record.opt_int("max_attribute_id")?,
            operator: json_text(record, "operator"),
            stackable: opt_bool(record, "stackable")?,
            to_attr_id: json_text(record, "to_attr_id"),
            unit_id,
            formula: opt_string(record, "attribute_formula")?,
        });
    }

    let mut effects = Vec::new();
    for record in collect_records(&layout.effects(), &SourceFormat::json())? {
        let id = record.id()?;
        let context = format!("effect {}", id);
        let attribute = |field: &str| -> Result<Option<i64>> {
            Ok(record
                .opt_ref(field)?
                .and_then(|raw| resolver.resolve_optional(EntityKind::Attribute, raw, &context)))
        };

        let effect = Effect {
            id,
            name: opt_string(&record, "effect_name")?,
            category: record.opt_int("effect_category")?,
            disallow_auto_repeat: opt_bool(&record, "disallow_auto_repeat")?,
            guid: opt_string(&record, "guid")?,
            is_assistance: opt_bool(&record, "is_assistance")?,
            is_offensive: opt_bool(&record, "is_offensive")?,
            is_warp_safe: opt_bool(&record, "is_warp_safe")?,
            electronic_chance: record.opt_float("electronic_chance")?,
            falloff_attribute_id: attribute("falloff_attribute_id")?,
            fitting_usage_chance_attribute_id: attribute("fitting_usage_chance_attribute_id")?,
            discharge_attribute_id: attribute("discharge_attribute_id")?,
            duration_attribute_id: attribute("duration_attribute_id")?,
            range_attribute_id: attribute("range_attribute_id")?,
            range_chance: record.opt_float("range_chance")?,
            tracking_speed_attribute_id: attribute("tracking_speed_attribute_id")?,
        };
        effects.push(effect);
    }
    attributes.sort_by_key(|a| a.id);
    effects.sort_by_key(|e| e.id);
    for effect in &effects {
        resolver.register(EntityKind::Effect, effect.id, effect.id);
    }

    info!(
        "Built {} attributes, {} effects",
        attributes.len(),
        effects.len()
    );
    Ok(AttrsBatch {
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
    fn test_optional_links_are_skipped() {
        let dir = TempDir::new().unwrap();
        let layout = SourceLayout::new(dir.path());
        fs::create_dir_all(layout.dogma_dir()).unwrap();
        fs::write(
            layout.attributes(),
            r#"{
                "4": {
                    "attribute_name": "mass",
                    "unit_id": 2,
                    "operator": [1, 2],
                    "high_is_good": 1
                },
                "9": {"attribute_name": "hp", "unit_id": 0},
                "37": {"attribute_name": "maxVelocity", "unit_id": 99}
            }"#,
        )
        .unwrap();
        fs::write(
            layout.effects(),
            r#"{"11": {
                "effect_name": "online",
                "duration_attribute_id": 4,
                "range_attribute_id": 500,
                "falloff_attribute_id": 0
            }}"#,
        )
        .unwrap();

        let mut resolver = Resolver::new();
        resolver.register(EntityKind::Unit, 2_i64, 2);
        let batch = build(&layout, &mut resolver).unwrap();

        assert_eq!(batch.attributes.len(), 3);
        let mass = &batch.attributes[0];
        assert_eq!(mass.unit_id, Some(2));
        assert_eq!(mass.operator.as_deref(), Some("[1,2]"));
        assert_eq!(mass.high_is_good, Some(true));
        assert_eq!(batch.attributes[1].unit_id, None);
        assert_eq!(batch.attributes[2].unit_id, None);

        let effect = &batch.effects[0];
        assert_eq!(effect.duration_attribute_id, Some(4));
        assert_eq!(effect.range_attribute_id, None);
        assert_eq!(effect.falloff_attribute_id, None);
        assert!(resolver.contains(EntityKind::Effect, 11_i64));
    }
}
