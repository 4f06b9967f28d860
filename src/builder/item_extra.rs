//! Repackaged volumes and reprocessing yields.

use rusqlite::Connection;
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

use super::{persist_all, Batch};
use crate::config::SourceLayout;
use crate::error::Result;
use crate::parser::{as_int, collect_records, RawRecord, SourceFormat};
use crate::resolver::{EntityKind, Resolver};
use crate::schema::{TableSchema, REPACKAGE_VOLUME, REPROCESS};
use crate::sql_values;
use crate::writer::reader::{item_volumes, ItemVolume};
use crate::writer::{Entity, ModeWriter, SqlValue};

/// Which value a repackaged volume was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeSource {
    Type,
    Group,
    Base,
}

impl VolumeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeSource::Type => "type",
            VolumeSource::Group => "group",
            VolumeSource::Base => "base",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepackageVolume {
    pub item_id: i64,
    pub volume: f64,
    pub source: VolumeSource,
}

impl Entity for RepackageVolume {
    fn table() -> &'static TableSchema {
        &REPACKAGE_VOLUME
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![self.item_id, self.volume, self.source.as_str()]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reprocess {
    pub item_id: i64,
    pub result_id: i64,
    pub quantity: i64,
}

impl Entity for Reprocess {
    fn table() -> &'static TableSchema {
        &REPROCESS
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![self.item_id, self.result_id, self.quantity]
    }
}

#[derive(Debug, Default)]
pub struct ItemExtraBatch {
    pub volumes: Vec<RepackageVolume>,
    pub reprocess: Vec<Reprocess>,
}

impl Batch for ItemExtraBatch {
    fn persist(&self, writer: &ModeWriter) -> Result<u64> {
        persist_all(writer, &[&self.volumes, &self.reprocess])
    }

    fn len(&self) -> usize {
        self.volumes.len() + self.reprocess.len()
    }
}

/// Pick the repackaged volume of one item: type override, then group
/// override, then the item's own volume.
pub fn repackaged_volume(
    item: &ItemVolume,
    type_overrides: &HashMap<i64, f64>,
    group_overrides: &HashMap<i64, f64>,
) -> Option<RepackageVolume> {
    let (volume, source) = if let Some(v) = type_overrides.get(&item.type_id) {
        (*v, VolumeSource::Type)
    } else if let Some(v) = group_overrides.get(&item.group_id) {
        (*v, VolumeSource::Group)
    } else {
        (item.volume?, VolumeSource::Base)
    };

    Some(RepackageVolume {
        item_id: item.id,
        volume,
        source,
    })
}

fn read_overrides(layout: &SourceLayout, root_key: &'static str) -> Result<HashMap<i64, f64>> {
    collect_records(&layout.repackage_volume(), &SourceFormat::json_at(root_key))?
        .into_iter()
        .map(|record| {
            let id = record.id()?;
            let volume = record
                .fields
                .as_f64()
                .ok_or_else(|| record.malformed("volume is not a number"))?;
            Ok((id, volume))
        })
        .collect()
}

/// Reprocess slots of one item: `item_idN` paired with `item_numberN`
pub fn reprocess_slots(record: &RawRecord) -> Vec<(Option<i64>, i64)> {
    let Some(fields) = record.fields.as_object() else {
        return Vec::new();
    };

    let mut slots: BTreeMap<u32, (Option<i64>, i64)> = BTreeMap::new();
    for (key, value) in fields {
        let Some(slot) = key
            .strip_prefix("item_number")
            .and_then(|n| n.parse::<u32>().ok())
        else {
            continue;
        };
        let quantity = as_int(value).unwrap_or(0);
        let result = fields.get(&format!("item_id{}", slot)).and_then(as_int);
        slots.insert(slot, (result, quantity));
    }
    slots.into_values().collect()
}

pub fn build(
    layout: &SourceLayout,
    resolver: &Resolver,
    conn: &Connection,
) -> Result<ItemExtraBatch> {
    let type_overrides = read_overrides(layout, "data.type_ids")?;
    let group_overrides = read_overrides(layout, "data.group_ids")?;

    let volumes: Vec<RepackageVolume> = item_volumes(conn)?
        .iter()
        .filter_map(|item| repackaged_volume(item, &type_overrides, &group_overrides))
        .collect();

    let mut reprocess = Vec::new();
    let reprocess_format = SourceFormat::json_at("data.item_baseartifice");
    for record in collect_records(&layout.reprocess(), &reprocess_format)? {
        let context = format!("reprocess {}", record.key);
        let resolved = resolver.resolve_optional(EntityKind::Item, record.raw_id(), &context);
        let Some(item_id) = resolved else {
            continue;
        };

        for (result, quantity) in reprocess_slots(&record) {
            if quantity <= 0 {
                continue;
            }
            let Some(result) = result else {
                warn!("{context}: quantity {quantity} without an item id, skipped");
                continue;
            };
            let resolved = resolver.resolve_optional(EntityKind::Item, result, &context);
            let Some(result_id) = resolved else {
                continue;
            };
            reprocess.push(Reprocess {
                item_id,
                result_id,
                quantity,
            });
        }
    }
    reprocess.sort_by_key(|r| (r.item_id, r.result_id));

    info!(
        "Built {} repackaged volumes, {} reprocess yields",
        volumes.len(),
        reprocess.len()
    );
    Ok(ItemExtraBatch { volumes, reprocess })
}
