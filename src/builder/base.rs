//! Units, categories, groups and types: the catalogs every item hangs off.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

use super::localization::localize;
use super::{persist_all, Batch};
use crate::config::SourceLayout;
use crate::error::Result;
use crate::parser::{as_int, collect_records, RawRecord, SourceFormat};
use crate::resolver::{EntityKind, Resolver};
use crate::schema::{TableSchema, CATEGORIES, GROUPS, TYPES, UNITS};
use crate::sql_values;
use crate::writer::{Entity, ModeWriter, SqlValue};

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub id: i64,
    pub description: Option<String>,
    pub display_name: Option<String>,
    pub unit_name: Option<String>,
}

impl Entity for Unit {
    fn table() -> &'static TableSchema {
        &UNITS
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![
            self.id,
            self.description.clone(),
            self.display_name.clone(),
            self.unit_name.clone()
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: i64,
    /// Constant name from the item type script
    pub name: Option<String>,
    pub name_key: Option<i64>,
    pub source_name: Option<String>,
}

impl Entity for Category {
    fn table() -> &'static TableSchema {
        &CATEGORIES
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![self.id, self.name.clone(), self.name_key, self.source_name.clone()]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: i64,
    pub name: Option<String>,
    pub category_id: Option<i64>,
    pub name_key: Option<i64>,
    pub source_name: Option<String>,
    pub anchorable: Option<bool>,
    pub anchored: Option<bool>,
    pub fittable_non_singleton: Option<bool>,
    pub icon_path: Option<String>,
    pub use_base_price: Option<bool>,
}

impl Entity for Group {
    fn table() -> &'static TableSchema {
        &GROUPS
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![
            self.id,
            self.name.clone(),
            self.category_id,
            self.name_key,
            self.source_name.clone(),
            self.anchorable,
            self.anchored,
            self.fittable_non_singleton,
            self.icon_path.clone(),
            self.use_base_price,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemType {
    pub id: i64,
    pub short_id: Option<i64>,
    pub name: Option<String>,
    pub group_id: Option<i64>,
}

impl Entity for ItemType {
    fn table() -> &'static TableSchema {
        &TYPES
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![self.id, self.short_id, self.name.clone(), self.group_id]
    }
}

#[derive(Debug, Default)]
pub struct BaseBatch {
    pub units: Vec<Unit>,
    pub categories: Vec<Category>,
    pub groups: Vec<Group>,
    pub types: Vec<ItemType>,
}

impl Batch for BaseBatch {
    fn persist(&self, writer: &ModeWriter) -> Result<u64> {
        persist_all(
            writer,
            &[&self.units, &self.categories, &self.groups, &self.types],
        )
    }

    fn len(&self) -> usize {
        self.units.len() + self.categories.len() + self.groups.len() + self.types.len()
    }
}

#[derive(Debug, Deserialize)]
struct GroupFlags {
    anchorable: Option<bool>,
    anchored: Option<bool>,
    fittable_non_singleton: Option<bool>,
    icon_path: Option<String>,
    use_base_price: Option<bool>,
}

/// Constant names from the item type script, per class
#[derive(Debug, Default)]
struct ScriptNames {
    categories: BTreeMap<i64, String>,
    groups: BTreeMap<i64, String>,
    types: BTreeMap<i64, String>,
}

fn read_script_names(layout: &SourceLayout) -> Result<ScriptNames> {
    let mut names = ScriptNames::default();
    for record in collect_records(&layout.item_type_script(), &SourceFormat::ScriptLiteral)? {
        let id = record.id()?;
        let name = record.str("name")?.to_string();
        match record.str("table")? {
            "CategoryIds" => names.categories.insert(id, name),
            "GroupIds" => names.groups.insert(id, name),
            "ItemTypeIds" => names.types.insert(id, name),
            _ => None,
        };
    }
    Ok(names)
}

/// Localize an optional `zh_name`; an unknown name aborts the mode
fn localized_name(
    record: &RawRecord,
    resolver: &Resolver,
) -> Result<(Option<i64>, Option<String>, Option<String>)> {
    match record.opt_str("zh_name")? {
        None => Ok((None, None, None)),
        Some(zh_name) => {
            let text = localize(resolver, zh_name)?;
            Ok((text.key, Some(text.source), text.english))
        }
    }
}

pub fn build(layout: &SourceLayout, resolver: &mut Resolver) -> Result<BaseBatch> {
    let names = read_script_names(layout)?;

    let mut units = collect_records(&layout.units(), &SourceFormat::json())?
        .iter()
        .map(|record| {
            Ok(Unit {
                id: record.id()?,
                description: record.opt_str("description")?.map(str::to_string),
                display_name: record.opt_str("display_name")?.map(str::to_string),
                unit_name: record.opt_str("unit_name")?.map(str::to_string),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    units.sort_by_key(|u| u.id);
    for unit in &units {
        resolver.register(EntityKind::Unit, unit.id, unit.id);
    }

    // Categories list their groups; groups do not name their category
    let mut group_category: BTreeMap<i64, i64> = BTreeMap::new();
    let mut category_rows: BTreeMap<i64, Category> = BTreeMap::new();
    for record in collect_records(&layout.categories(), &SourceFormat::json())? {
        let id = record.id()?;
        let (name_key, source_name, _) = localized_name(&record, resolver)?;
        for group in record.int_list("group_ids")? {
            group_category.insert(group, id);
        }
        category_rows.insert(
            id,
            Category {
                id,
                name: names.categories.get(&id).cloned(),
                name_key,
                source_name,
            },
        );
    }
    for (id, code) in &names.categories {
        category_rows.entry(*id).or_insert_with(|| Category {
            id: *id,
            name: Some(code.clone()),
            name_key: None,
            source_name: None,
        });
    }
    for category in category_rows.values() {
        resolver.register(EntityKind::Category, category.id, category.id);
        if let Some(code) = &category.name {
            resolver.set_code(EntityKind::Category, category.id, code.as_str());
        }
    }

    let mut group_rows: BTreeMap<i64, Group> = BTreeMap::new();
    for record in collect_records(&layout.groups(), &SourceFormat::json())? {
        let id = record.id()?;
        let (name_key, source_name, english) = localized_name(&record, resolver)?;
        let flags: GroupFlags = serde_json::from_value(record.fields.clone())
            .map_err(|e| record.malformed(e.to_string()))?;
        let code = names.groups.get(&id).cloned();
        if let Some(display) = english.or_else(|| code.clone()) {
            resolver.set_name(EntityKind::Group, id, display);
        }
        group_rows.insert(
            id,
            Group {
                id,
                name: code,
                category_id: None,
                name_key,
                source_name,
                anchorable: flags.anchorable,
                anchored: flags.anchored,
                fittable_non_singleton: flags.fittable_non_singleton,
                icon_path: flags.icon_path,
                use_base_price: flags.use_base_price,
            },
        );
    }
    for (id, code) in &names.groups {
        group_rows.entry(*id).or_insert_with(|| Group {
            id: *id,
            name: Some(code.clone()),
            category_id: None,
            name_key: None,
            source_name: None,
            anchorable: None,
            anchored: None,
            fittable_non_singleton: None,
            icon_path: None,
            use_base_price: None,
        });
        if resolver.name(EntityKind::Group, *id).is_none() {
            resolver.set_name(EntityKind::Group, *id, code.as_str());
        }
    }
    for group in group_rows.values_mut() {
        group.category_id = group_category
            .get(&group.id)
            .copied()
            .filter(|c| resolver.contains(EntityKind::Category, *c));
        resolver.register(EntityKind::Group, group.id, group.id);
        if let Some(category) = group.category_id {
            resolver.set_parent(EntityKind::Group, group.id, category);
        }
        if let Some(code) = &group.name {
            resolver.set_code(EntityKind::Group, group.id, code.as_str());
        }
    }

    // Types come from the script constants and the per-group type lists
    let mut type_group: BTreeMap<i64, i64> = BTreeMap::new();
    for record in collect_records(&layout.item_types_by_group(), &SourceFormat::json())? {
        let group = record.id()?;
        let members = record
            .fields
            .as_array()
            .ok_or_else(|| record.malformed("expected a list of type ids"))?;
        for member in members {
            let Some(type_id) = as_int(member) else {
                return Err(record.malformed("type id is not an integer"));
            };
            type_group.insert(type_id, group);
        }
    }

    let mut short_ids: BTreeMap<i64, i64> = BTreeMap::new();
    let mapping = SourceFormat::json_at("data.type_id");
    for record in collect_records(&layout.type_id_mapping(), &mapping)? {
        let short = record.id()?;
        let Some(long) = as_int(&record.fields) else {
            return Err(record.malformed("type id is not an integer"));
        };
        short_ids.insert(long, short);
    }

    let mut type_ids: BTreeSet<i64> = type_group.keys().copied().collect();
    type_ids.extend(names.types.keys());
    let mut types = Vec::with_capacity(type_ids.len());
    for id in type_ids {
        let group_id = match type_group.get(&id) {
            Some(group) if resolver.contains(EntityKind::Group, *group) => Some(*group),
            Some(group) => {
                warn!("type {}: unknown group {}, stored without group", id, group);
                None
            }
            None => None,
        };
        let short_id = short_ids.get(&id).copied();

        resolver.register(EntityKind::Type, id, id);
        if let Some(group) = group_id {
            resolver.set_parent(EntityKind::Type, id, group);
        }
        if let Some(short_id) = short_id {
            resolver.set_short_id(id, short_id);
        }

        types.push(ItemType {
            id,
            short_id,
            name: names.types.get(&id).cloned(),
            group_id,
        });
    }

    let batch = BaseBatch {
        units,
        categories: category_rows.into_values().collect(),
        groups: group_rows.into_values().collect(),
        types,
    };
    info!(
        "Built {} units, {} categories, {} groups, {} types",
        batch.units.len(),
        batch.categories.len(),
        batch.groups.len(),
        batch.types.len()
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    const SCRIPT: &str = "class CategoryIds:
    Ship = 6

class GroupIds:
    Frigate = 25

class ItemTypeIds:
    Rifter = 587
";

    fn write(path: std::path::PathBuf, content: impl ToString) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content.to_string()).unwrap();
    }

    fn fixture(group_name: &str) -> (TempDir, SourceLayout) {
        let dir = TempDir::new().unwrap();
        let layout = SourceLayout::new(dir.path());
        write(layout.item_type_script(), SCRIPT);
        let unit = json!({"description": "Length", "display_name": "m", "unit_name": "Length"});
        write(layout.units(), json!({ "1": unit }));
        write(
            layout.categories(),
            json!({"6": {"zh_name": "舰船", "group_ids": [25]}}),
        );
        let group = json!({"zh_name": group_name, "anchorable": false, "use_base_price": true});
        write(layout.groups(), json!({ "25": group }));
        write(layout.item_types_by_group(), json!({"25": [587, 588]}));
        write(
            layout.type_id_mapping(),
            json!({"data": {"type_id": {"12": 588}}}),
        );
        (dir, layout)
    }

    fn resolver() -> Resolver {
        let mut resolver = Resolver::new();
        resolver.register(EntityKind::LocalizedString, "舰船", 1);
        resolver.register(EntityKind::LocalizedString, "护卫舰", 2);
        resolver.set_english(2, "Frigate");
        resolver
    }

    #[test]
    fn test_build_links_catalogs() {
        let (_dir, layout) = fixture("护卫舰");
        let mut resolver = resolver();
        let batch = build(&layout, &mut resolver).unwrap();

        assert_eq!(batch.units.len(), 1);
        assert_eq!(batch.categories[0].name.as_deref(), Some("Ship"));
        assert_eq!(batch.categories[0].name_key, Some(1));
        assert_eq!(batch.groups[0].category_id, Some(6));
        assert_eq!(batch.groups[0].use_base_price, Some(true));
        assert_eq!(batch.types.len(), 2);
        assert_eq!(batch.types[1].short_id, Some(12));

        assert_eq!(resolver.parent(EntityKind::Type, 587), Some(25));
        assert_eq!(resolver.parent(EntityKind::Group, 25), Some(6));
        assert_eq!(resolver.name(EntityKind::Group, 25), Some("Frigate"));
        assert_eq!(resolver.code(EntityKind::Group, 25), Some("Frigate"));
        assert_eq!(resolver.short_id(588), Some(12));
    }

    #[test]
    fn test_unknown_group_name_aborts() {
        let (_dir, layout) = fixture("不存在");
        let err = build(&layout, &mut resolver()).unwrap_err();
        match err {
            PipelineError::UnresolvedReference { kind, .. } => {
                assert_eq!(kind, EntityKind::LocalizedString)
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
