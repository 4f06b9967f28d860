//! Manufacturing blueprints and their material costs.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::info;

use super::{persist_all, Batch};
use crate::config::SourceLayout;
use crate::error::Result;
use crate::parser::{as_int, collect_records, RawRecord, SourceFormat};
use crate::resolver::{EntityKind, RawId, Resolver};
use crate::schema::{TableSchema, BLUEPRINTS, BLUEPRINT_COSTS};
use crate::sql_values;
use crate::writer::{Entity, ModeWriter, SqlValue};

/// Material category of a blueprint cost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostType {
    Module,
    Pi,
    Minerals,
    Ship,
    Component,
    Blueprint,
    Datacore,
    Salvage,
}

impl CostType {
    /// Map a `<kind>_species` list name to its cost type
    pub fn from_species(key: &str) -> Option<Self> {
        Some(match key {
            "module_species" => CostType::Module,
            "planetary_material_species" => CostType::Pi,
            "minerals_species" => CostType::Minerals,
            "ship_species" => CostType::Ship,
            "component_species" => CostType::Component,
            "blueprint_species" => CostType::Blueprint,
            "datacore_species" => CostType::Datacore,
            "salvage_material_species" => CostType::Salvage,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CostType::Module => "module",
            CostType::Pi => "pi",
            CostType::Minerals => "minerals",
            CostType::Ship => "ship",
            CostType::Component => "component",
            CostType::Blueprint => "blueprint",
            CostType::Datacore => "datacore",
            CostType::Salvage => "salvage",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ManufacturingEntry {
    blueprint: i64,
    product_type_id: i64,
    output_num: Option<i64>,
    skill_level: Option<i64>,
    #[serde(default)]
    material_amend_att: i64,
    decryptor_mul: Option<f64>,
    money: Option<i64>,
    time: Option<i64>,
    #[serde(default)]
    time_amend_att: i64,
    #[serde(rename = "type")]
    kind: Option<i64>,
    #[serde(default)]
    material: BTreeMap<String, Value>,
    /// The `*_species` lists, among anything else
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl ManufacturingEntry {
    /// Cost type of a material, from the species list containing it
    fn cost_type(&self, material: i64) -> Option<CostType> {
        self.extra.iter().find_map(|(key, list)| {
            let cost_type = CostType::from_species(key)?;
            let listed = list
                .as_array()?
                .iter()
                .any(|v| as_int(v) == Some(material));
            listed.then_some(cost_type)
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Blueprint {
    pub id: i64,
    pub product_id: i64,
    pub output_num: Option<i64>,
    pub skill_level: Option<i64>,
    pub material_amend_attr: Option<i64>,
    pub decryptor_mul: Option<f64>,
    pub money: Option<i64>,
    pub time: Option<i64>,
    pub time_amend_attr: Option<i64>,
    pub kind: Option<i64>,
}

impl Entity for Blueprint {
    fn table() -> &'static TableSchema {
        &BLUEPRINTS
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![
            self.id,
            self.product_id,
            self.output_num,
            self.skill_level,
            self.material_amend_attr,
            self.decryptor_mul,
            self.money,
            self.time,
            self.time_amend_attr,
            self.kind,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlueprintCost {
    pub blueprint_id: i64,
    pub resource_id: i64,
    pub amount: i64,
    pub cost_type: Option<CostType>,
}

impl Entity for BlueprintCost {
    fn table() -> &'static TableSchema {
        &BLUEPRINT_COSTS
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![
            self.blueprint_id,
            self.resource_id,
            self.amount,
            self.cost_type.map(|c| c.as_str()),
        ]
    }
}

#[derive(Debug, Default)]
pub struct BlueprintBatch {
    pub blueprints: Vec<Blueprint>,
    pub costs: Vec<BlueprintCost>,
}

impl Batch for BlueprintBatch {
    fn persist(&self, writer: &ModeWriter) -> Result<u64> {
        persist_all(writer, &[&self.blueprints, &self.costs])
    }

    fn len(&self) -> usize {
        self.blueprints.len() + self.costs.len()
    }
}

/// Amend attribute reference; `0` means none, anything else must resolve
fn amend_attribute(resolver: &Resolver, raw: i64) -> Result<Option<i64>> {
    if raw == 0 {
        return Ok(None);
    }
    resolver.resolve(EntityKind::Attribute, raw).map(Some)
}

fn build_entry(record: &RawRecord, resolver: &Resolver) -> Result<(Blueprint, Vec<BlueprintCost>)> {
    let product = record.id()?;
    let entry: ManufacturingEntry =
        serde_json::from_value(record.fields.clone()).map_err(|e| record.malformed(e.to_string()))?;

    if entry.product_type_id != product {
        return Err(record.malformed(format!(
            "product type {} does not match the product {}",
            entry.product_type_id, product
        )));
    }

    let product_id = resolver.resolve(EntityKind::Item, product)?;
    let blueprint_id = resolver.resolve(EntityKind::Item, entry.blueprint)?;

    let blueprint = Blueprint {
        id: blueprint_id,
        product_id,
        output_num: entry.output_num,
        skill_level: entry.skill_level,
        material_amend_attr: amend_attribute(resolver, entry.material_amend_att)?,
        decryptor_mul: entry.decryptor_mul,
        money: entry.money,
        time: entry.time,
        time_amend_attr: amend_attribute(resolver, entry.time_amend_att)?,
        kind: entry.kind,
    };

    let mut costs = Vec::with_capacity(entry.material.len());
    for (material, amount) in &entry.material {
        let resource_id = resolver.resolve(EntityKind::Item, RawId::from_key(material))?;
        let Some(amount) = as_int(amount) else {
            let reason = format!("amount of material {material} is not an integer");
            return Err(record.malformed(reason));
        };
        costs.push(BlueprintCost {
            blueprint_id,
            resource_id,
            amount,
            cost_type: entry.cost_type(resource_id),
        });
    }

    Ok((blueprint, costs))
}

/// Build every blueprint; any unresolved item or attribute aborts the mode
pub fn build(layout: &SourceLayout, resolver: &Resolver) -> Result<BlueprintBatch> {
    let mut batch = BlueprintBatch::default();

    let format = SourceFormat::json_at("data.item_manufacturing");
    for record in collect_records(&layout.industry(), &format)? {
        let (blueprint, costs) = build_entry(&record, resolver)?;
        batch.blueprints.push(blueprint);
        batch.costs.extend(costs);
    }
    batch.blueprints.sort_by_key(|b| b.id);
    batch.costs.sort_by_key(|c| (c.blueprint_id, c.resource_id));

    info!(
        "Built {} blueprints with {} costs",
        batch.blueprints.len(),
        batch.costs.len()
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::fs;
    use tempfile::TempDir;

    fn layout(industry: &str) -> (TempDir, SourceLayout) {
        let dir = TempDir::new().unwrap();
        let layout = SourceLayout::new(dir.path());
        let path = layout.industry();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, industry).unwrap();
        (dir, layout)
    }

    fn resolver() -> Resolver {
        let mut resolver = Resolver::new();
        for item in [587_i64, 691, 34, 35] {
            resolver.register(EntityKind::Item, item, item);
        }
        resolver.register(EntityKind::Attribute, 1500_i64, 1500);
        resolver
    }

    #[test]
    fn test_blueprint_with_costs() {
        let (_dir, layout) = layout(
            r#"{"data": {"item_manufacturing": {"587": {
                "blueprint": 691, "product_type_id": 587, "output_num": 1, "skill_level": 1,
                "material_amend_att": 1500, "decryptor_mul": 1.0, "money": 12000, "time": 600,
                "time_amend_att": 0, "type": 1,
                "material": {"34": 2000, "35": 500},
                "minerals_species": [34, 35]
            }}}}"#,
        );
        let batch = build(&layout, &resolver()).unwrap();

        assert_eq!(batch.blueprints.len(), 1);
        let bp = &batch.blueprints[0];
        assert_eq!((bp.id, bp.product_id), (691, 587));
        assert_eq!(bp.material_amend_attr, Some(1500));
        assert_eq!(bp.time_amend_attr, None);

        assert_eq!(batch.costs.len(), 2);
        assert_eq!(batch.costs[0].amount, 2000);
        assert_eq!(batch.costs[0].cost_type, Some(CostType::Minerals));
    }

    #[test]
    fn test_unknown_material_aborts() {
        let (_dir, layout) = layout(
            r#"{"data": {"item_manufacturing": {"587": {
                "blueprint": 691, "product_type_id": 587, "material": {"77777": 1}
            }}}}"#,
        );
        match build(&layout, &resolver()).unwrap_err() {
            PipelineError::UnresolvedReference { kind, raw_id } => {
                assert_eq!(kind, EntityKind::Item);
                assert_eq!(raw_id, RawId::Int(77777));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mismatched_product_is_malformed() {
        let source = r#"{"data": {"item_manufacturing": {
            "587": {"blueprint": 691, "product_type_id": 588}
        }}}"#;
        let (_dir, layout) = layout(source);
        let err = build(&layout, &resolver()).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedSource { .. }));
    }
}
