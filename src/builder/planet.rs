//! Planetary resources and where they can be exploited.

use std::collections::BTreeMap;
use tracing::{info, warn};

use super::{persist_all, Batch};
use crate::config::SourceLayout;
use crate::error::Result;
use crate::parser::{as_int, collect_records, RawRecord, SourceFormat};
use crate::resolver::{EntityKind, Resolver};
use crate::schema::{TableSchema, PLANET_EXPLOITS};
use crate::sql_values;
use crate::writer::{Entity, ModeWriter, SqlValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Richness {
    Poor,
    Medium,
    Rich,
    Perfect,
}

impl Richness {
    /// Richness of a 1-based index
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            1 => Some(Richness::Poor),
            2 => Some(Richness::Medium),
            3 => Some(Richness::Rich),
            4 => Some(Richness::Perfect),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Richness::Poor => "poor",
            Richness::Medium => "medium",
            Richness::Rich => "rich",
            Richness::Perfect => "perfect",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanetExploit {
    pub planet_id: i64,
    pub resource_id: i64,
    pub richness: Richness,
    pub richness_value: Option<f64>,
    pub output: Option<f64>,
    pub location_index: Option<i64>,
}

impl Entity for PlanetExploit {
    fn table() -> &'static TableSchema {
        &PLANET_EXPLOITS
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![
            self.planet_id,
            self.resource_id,
            self.richness.as_str(),
            self.richness_value,
            self.output,
            self.location_index,
        ]
    }
}

#[derive(Debug, Default)]
pub struct PlanetBatch {
    pub exploits: Vec<PlanetExploit>,
}

impl Batch for PlanetBatch {
    fn persist(&self, writer: &ModeWriter) -> Result<u64> {
        persist_all(writer, &[&self.exploits])
    }

    fn len(&self) -> usize {
        self.exploits.len()
    }
}

fn build_planet(record: &RawRecord, resolver: &Resolver) -> Result<Vec<PlanetExploit>> {
    let planet_id = resolver.resolve(EntityKind::Planet, record.int("planet_id")?)?;
    let Some(resources) = record.get("resource_info").and_then(|v| v.as_object()) else {
        return Err(record.malformed("field 'resource_info' is not an object"));
    };

    let mut exploits = Vec::with_capacity(resources.len());
    for (key, resource) in resources {
        let field = |name: &str| resource.get(name).filter(|v| !v.is_null());
        let int = |name: &str| -> Result<i64> {
            let Some(value) = field(name).and_then(as_int) else {
                let reason = format!("resource {key}: '{name}' is not an integer");
                return Err(record.malformed(reason));
            };
            Ok(value)
        };

        let index = int("richness_index")?;
        let richness = Richness::from_index(index).ok_or_else(|| {
            record.malformed(format!("resource {key}: richness index {index} is out of range"))
        })?;

        exploits.push(PlanetExploit {
            planet_id,
            resource_id: resolver.resolve(EntityKind::Item, int("resource_type_id")?)?,
            richness,
            richness_value: field("richness_value").and_then(|v| v.as_f64()),
            output: field("init_output").and_then(|v| v.as_f64()),
            location_index: field("location_index").and_then(as_int),
        });
    }
    Ok(exploits)
}

/// Build the resources of every planet; an unknown planet or resource aborts
pub fn build(layout: &SourceLayout, resolver: &Resolver) -> Result<PlanetBatch> {
    let mut by_key = BTreeMap::new();
    let records = collect_records(&layout.planet_exploit(), &SourceFormat::json())?;
    for record in &records {
        for exploit in build_planet(record, resolver)? {
            let key = (exploit.planet_id, exploit.resource_id);
            if by_key.insert(key, exploit).is_some() {
                warn!(
                    "Planet {} lists resource {} more than once, keeping the last entry",
                    key.0, key.1
                );
            }
        }
    }
    let exploits: Vec<PlanetExploit> = by_key.into_values().collect();

    info!(
        "Built {} planet resources from {} planets",
        exploits.len(),
        records.len()
    );
    Ok(PlanetBatch { exploits })
}
