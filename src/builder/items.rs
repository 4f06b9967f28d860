//! Items, merged from the item and item dogma files, and their nanocore data.

use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, info};

use super::localization::localize;
use super::{json_text, opt_bool, opt_string, persist_all, Batch};
use crate::config::SourceLayout;
use crate::error::{PipelineError, Result};
use crate::parser::{collect_records, numbered_files, RawRecord, SourceFormat};
use crate::resolver::{EntityKind, RawId, Resolver};
use crate::schema::{TableSchema, ITEMS, ITEM_NANOCORES};
use crate::sql_values;
use crate::writer::{Entity, ModeWriter, SqlValue};

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub type_id: i64,
    pub group_id: i64,
    pub category_id: i64,
    pub short_type_id: Option<i64>,
    /// English name
    pub name: Option<String>,
    pub name_key: Option<i64>,
    pub desc_key: Option<i64>,
    pub source_name: Option<String>,
    pub source_desc: Option<String>,
    pub market_group_id: Option<i64>,
    pub can_be_jettisoned: Option<bool>,
    pub published: bool,
    pub main_cal_code: Option<String>,
    pub online_cal_code: Option<String>,
    pub active_cal_code: Option<String>,
    pub volume: Option<f64>,
    pub mass: Option<f64>,
    pub capacity: Option<f64>,
    pub exp: f64,
    pub lock_skin: Option<String>,
    pub product: Option<i64>,
    /// JSON lists, `[]` when absent
    pub desc_special: String,
    pub npc_cal_codes: String,
    pub corp_camera: String,
    pub ability_list: String,
    pub normal_debris: String,
    pub ship_bonus_code_list: String,
    pub ship_bonus_skill_list: String,
}

impl Entity for Item {
    fn table() -> &'static TableSchema {
        &ITEMS
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![
            self.id,
            self.type_id,
            self.group_id,
            self.category_id,
            self.short_type_id,
            self.name.clone(),
            self.name_key,
            self.desc_key,
            self.source_name.clone(),
            self.source_desc.clone(),
            self.market_group_id,
            self.can_be_jettisoned,
            self.published,
            self.main_cal_code.clone(),
            self.online_cal_code.clone(),
            self.active_cal_code.clone(),
            self.volume,
            self.mass,
            self.capacity,
            self.exp,
            self.lock_skin.clone(),
            self.product,
            &self.desc_special,
            &self.npc_cal_codes,
            &self.corp_camera,
            &self.ability_list,
            &self.normal_debris,
            &self.ship_bonus_code_list,
            &self.ship_bonus_skill_list,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemNanocore {
    pub item_id: i64,
    pub film_group: Option<String>,
    pub film_quality: Option<i64>,
    /// JSON lists
    pub available_ships: String,
    pub selectable_modifier_items: String,
    pub trainable_modifier_items: String,
}

impl Entity for ItemNanocore {
    fn table() -> &'static TableSchema {
        &ITEM_NANOCORES
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![
            self.item_id,
            self.film_group.clone(),
            self.film_quality,
            &self.available_ships,
            &self.selectable_modifier_items,
            &self.trainable_modifier_items,
        ]
    }
}

#[derive(Debug, Default)]
pub struct ItemsBatch {
    pub items: Vec<Item>,
    pub nanocores: Vec<ItemNanocore>,
}

impl Batch for ItemsBatch {
    fn persist(&self, writer: &ModeWriter) -> Result<u64> {
        persist_all(writer, &[&self.items, &self.nanocores])
    }

    fn len(&self) -> usize {
        self.items.len() + self.nanocores.len()
    }
}

/// Read every numbered item file, with the matching item dogma fields merged in
fn read_items(layout: &SourceLayout) -> Result<Vec<RawRecord>> {
    let mut dogma: HashMap<String, Map<String, Value>> = HashMap::new();
    let dogma_dir = layout.item_dogma_dir();
    if dogma_dir.is_dir() {
        for path in numbered_files(&dogma_dir, "")? {
            for record in collect_records(&path, &SourceFormat::json())? {
                if let Value::Object(fields) = record.fields {
                    dogma.entry(record.key).or_default().extend(fields);
                }
            }
        }
    }

    let mut items = Vec::new();
    for path in numbered_files(&layout.items_dir(), "")? {
        for mut record in collect_records(&path, &SourceFormat::json())? {
            let extra = dogma.remove(&record.key);
            if let (Some(extra), Value::Object(fields)) = (extra, &mut record.fields) {
                for (key, value) in extra {
                    fields.entry(key).or_insert(value);
                }
            }
            items.push(record);
        }
    }

    if !dogma.is_empty() {
        debug!("{} item dogma entries without an item", dogma.len());
    }
    Ok(items)
}

fn json_list(record: &RawRecord, field: &str) -> String {
    json_text(record, field).unwrap_or_else(|| "[]".to_string())
}

fn build_item(record: &RawRecord, resolver: &Resolver) -> Result<Item> {
    let id = record.id()?;
    let type_id = resolver.resolve(EntityKind::Type, record.opt_int("type_id")?.unwrap_or(id))?;
    let Some(group_id) = resolver.parent(EntityKind::Type, type_id) else {
        let raw_id = RawId::Text(format!("group of type {type_id}"));
        return Err(PipelineError::unresolved(EntityKind::Group, raw_id));
    };
    let Some(category_id) = resolver.parent(EntityKind::Group, group_id) else {
        let raw_id = RawId::Text(format!("category of group {group_id}"));
        return Err(PipelineError::unresolved(EntityKind::Category, raw_id));
    };

    let (name_key, source_name, name) = match record.opt_str("zh_name")? {
        Some(zh_name) => {
            let text = localize(resolver, zh_name)?;
            (text.key, Some(text.source), text.english)
        }
        None => (None, None, None),
    };

    let source_desc = record.opt_str("zh_desc")?.map(str::to_string);
    let desc_key = match source_desc.as_deref() {
        Some(desc) if !desc.is_empty() => {
            let context = format!("item {id} description");
            resolver.resolve_optional(EntityKind::LocalizedString, desc, &context)
        }
        _ => None,
    };

    Ok(Item {
        id,
        type_id,
        group_id,
        category_id,
        short_type_id: resolver.short_id(type_id),
        name,
        name_key,
        desc_key,
        source_name,
        source_desc,
        market_group_id: record.opt_int("market_group_id")?,
        can_be_jettisoned: opt_bool(record, "can_be_jettisoned")?,
        published: record.bool_or("published", false)?,
        main_cal_code: opt_string(record, "main_cal_code")?,
        online_cal_code: opt_string(record, "online_cal_code")?,
        active_cal_code: opt_string(record, "active_cal_code")?,
        volume: record.opt_float("volume")?,
        mass: record.opt_float("mass")?,
        capacity: record.opt_float("capacity")?,
        exp: record.opt_float("mining_exp_gain")?.unwrap_or(0.0),
        lock_skin: opt_string(record, "lock_skin")?,
        product: record.opt_int("product")?,
        desc_special: json_list(record, "desc_special"),
        npc_cal_codes: json_list(record, "npc_cal_codes"),
        corp_camera: json_list(record, "corp_camera"),
        ability_list: json_list(record, "ability_list"),
        normal_debris: json_list(record, "normal_debris"),
        ship_bonus_code_list: json_list(record, "ship_bonus_code_list"),
        ship_bonus_skill_list: json_list(record, "ship_bonus_skill_list"),
    })
}

pub fn build(layout: &SourceLayout, resolver: &mut Resolver) -> Result<ItemsBatch> {
    let mut items = Vec::new();
    for record in read_items(layout)? {
        items.push(build_item(&record, resolver)?);
    }
    items.sort_by_key(|item| item.id);

    for item in &items {
        resolver.register(EntityKind::Item, item.id, item.id);
        resolver.set_parent(EntityKind::Item, item.id, item.group_id);
    }

    let mut nanocores = Vec::new();
    let nanocore_path = layout.item_nanocore();
    if nanocore_path.exists() {
        for record in collect_records(&nanocore_path, &SourceFormat::json())? {
            let context = format!("nanocore {}", record.key);
            let resolved = resolver.resolve_optional(EntityKind::Item, record.raw_id(), &context);
            let Some(item_id) = resolved else {
                continue;
            };
            nanocores.push(ItemNanocore {
                item_id,
                film_group: opt_string(&record, "film_group")?,
                film_quality: record.opt_int("film_quality")?,
                available_ships: json_list(&record, "available_ship"),
                selectable_modifier_items: json_list(&record, "main_affix"),
                trainable_modifier_items: json_list(&record, "sub_affix"),
            });
        }
    }
    nanocores.sort_by_key(|n| n.item_id);

    info!("Built {} items, {} nanocores", items.len(), nanocores.len());
    Ok(ItemsBatch { items, nanocores })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn resolver() -> Resolver {
        let mut resolver = Resolver::new();
        resolver.register(EntityKind::LocalizedString, "裂谷级", 1);
        resolver.register(EntityKind::LocalizedString, "一艘护卫舰", 2);
        resolver.set_english(1, "Rifter");
        resolver.register(EntityKind::Category, 6_i64, 6);
        resolver.register(EntityKind::Group, 25_i64, 25);
        resolver.set_parent(EntityKind::Group, 25, 6);
        resolver.register(EntityKind::Type, 587_i64, 587);
        resolver.set_parent(EntityKind::Type, 587, 25);
        resolver.set_short_id(587, 3);
        resolver
    }

    fn layout(items: Value) -> (TempDir, SourceLayout) {
        let dir = TempDir::new().unwrap();
        let layout = SourceLayout::new(dir.path());
        fs::create_dir_all(layout.item_dogma_dir()).unwrap();
        fs::write(layout.items_dir().join("1.json"), items.to_string()).unwrap();
        fs::write(
            layout.item_dogma_dir().join("1.json"),
            r#"{"10000": {"volume": 27289.0, "mass": 1067000.0, "mining_exp_gain": 4.5}}"#,
        )
        .unwrap();
        let nanocore = json!({
            "10000": {"film_group": "a", "film_quality": 2, "available_ship": [1]},
            "99": {"film_quality": 1}
        });
        fs::write(layout.item_nanocore(), nanocore.to_string()).unwrap();
        (dir, layout)
    }

    #[test]
    fn test_items_merge_dogma_and_resolve_catalogs() {
        let (_dir, layout) = layout(json!({
            "10000": {
                "zh_name": "裂谷级",
                "zh_desc": "一艘护卫舰",
                "type_id": 587,
                "published": true
            }
        }));
        let mut resolver = resolver();
        let batch = build(&layout, &mut resolver).unwrap();

        let item = &batch.items[0];
        assert_eq!(item.group_id, 25);
        assert_eq!(item.category_id, 6);
        assert_eq!(item.short_type_id, Some(3));
        assert_eq!(item.name.as_deref(), Some("Rifter"));
        assert_eq!(item.name_key, Some(1));
        assert_eq!(item.desc_key, Some(2));
        assert_eq!(item.volume, Some(27289.0));
        assert_eq!(item.exp, 4.5);
        assert!(item.published);

        assert_eq!(batch.nanocores.len(), 1);
        assert_eq!(batch.nanocores[0].available_ships, "[1]");
        assert_eq!(batch.nanocores[0].trainable_modifier_items, "[]");
        assert_eq!(resolver.parent(EntityKind::Item, 10000), Some(25));
    }

    #[test]
    fn test_list_columns_default_to_empty() {
        let (_dir, layout) = layout(json!({
            "10000": {"zh_name": "裂谷级", "type_id": 587, "npc_cal_codes": ["a", "b"]}
        }));
        let batch = build(&layout, &mut resolver()).unwrap();

        let item = &batch.items[0];
        assert_eq!(item.npc_cal_codes, r#"["a","b"]"#);
        assert_eq!(item.desc_special, "[]");
        assert_eq!(item.ship_bonus_skill_list, "[]");
        assert_eq!(item.values().len(), ITEMS.column_names().len());
    }

    #[test]
    fn test_unknown_description_is_kept_without_key() {
        let (_dir, layout) = layout(json!({
            "10000": {"zh_name": "裂谷级", "zh_desc": "未知", "type_id": 587}
        }));
        let batch = build(&layout, &mut resolver()).unwrap();
        assert_eq!(batch.items[0].desc_key, None);
        assert_eq!(batch.items[0].source_desc.as_deref(), Some("未知"));
    }

    #[test]
    fn test_unknown_name_aborts() {
        let (_dir, layout) = layout(json!({"10000": {"zh_name": "未知", "type_id": 587}}));
        let err = build(&layout, &mut resolver()).unwrap_err();
        assert!(matches!(err, PipelineError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_type_without_group_aborts() {
        let (_dir, layout) = layout(json!({"10000": {"zh_name": "裂谷级", "type_id": 588}}));
        let mut resolver = resolver();
        resolver.register(EntityKind::Type, 588_i64, 588);
        let err = build(&layout, &mut resolver).unwrap_err();
        match err {
            PipelineError::UnresolvedReference { kind, .. } => assert_eq!(kind, EntityKind::Group),
            other => panic!("unexpected error: {other}"),
        }
    }
}
