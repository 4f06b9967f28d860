//! Regions, constellations, solar systems, celestials, stargates and the
//! connections between systems.

use rusqlite::Connection;
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

use super::{persist_all, Batch};
use crate::config::SourceLayout;
use crate::error::Result;
use crate::graph::ConnectionAssembler;
use crate::parser::{collect_records, RawRecord, SourceFormat};
use crate::resolver::{EntityKind, Resolver};
use crate::schema::{
    TableSchema, CELESTIALS, CONSTELLATIONS, REGIONS, SOLAR_SYSTEMS, STARGATES, SYSTEM_CONNECTIONS,
};
use crate::sql_values;
use crate::writer::reader::{stargate_links, system_connections};
use crate::writer::{Entity, ModeWriter, SqlValue};

type Position = Option<(f64, f64, f64)>;

fn coords(position: Position) -> (Option<f64>, Option<f64>, Option<f64>) {
    match position {
        Some((x, y, z)) => (Some(x), Some(y), Some(z)),
        None => (None, None, None),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: i64,
    pub name: Option<String>,
    pub position: Position,
    pub faction_id: Option<i64>,
    pub radius: Option<f64>,
    pub wormhole_class_id: Option<i64>,
}

impl Entity for Region {
    fn table() -> &'static TableSchema {
        &REGIONS
    }

    fn values(&self) -> Vec<SqlValue> {
        let (x, y, z) = coords(self.position);
        sql_values![
            self.id,
            self.name.clone(),
            x,
            y,
            z,
            self.faction_id,
            self.radius,
            self.wormhole_class_id,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constellation {
    pub id: i64,
    pub region_id: i64,
    pub name: Option<String>,
    pub position: Position,
    pub faction_id: Option<i64>,
    pub radius: Option<f64>,
    pub wormhole_class_id: Option<i64>,
}

impl Entity for Constellation {
    fn table() -> &'static TableSchema {
        &CONSTELLATIONS
    }

    fn values(&self) -> Vec<SqlValue> {
        let (x, y, z) = coords(self.position);
        sql_values![
            self.id,
            self.region_id,
            self.name.clone(),
            x,
            y,
            z,
            self.faction_id,
            self.radius,
            self.wormhole_class_id,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolarSystem {
    pub id: i64,
    pub constellation_id: i64,
    pub region_id: i64,
    pub name: Option<String>,
    pub position: Position,
    pub security: Option<f64>,
    pub faction_id: Option<i64>,
    pub radius: Option<f64>,
}

impl Entity for SolarSystem {
    fn table() -> &'static TableSchema {
        &SOLAR_SYSTEMS
    }

    fn values(&self) -> Vec<SqlValue> {
        let (x, y, z) = coords(self.position);
        sql_values![
            self.id,
            self.constellation_id,
            self.region_id,
            self.name.clone(),
            x,
            y,
            z,
            self.security,
            self.faction_id,
            self.radius,
        ]
    }
}

/// Kind of a celestial, from its group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CelestialKind {
    Star,
    Planet,
    Moon,
    AsteroidBelt,
    Stargate,
    Other,
}

impl CelestialKind {
    /// Kind for a group constant name
    pub fn from_group_code(code: Option<&str>) -> Self {
        match code {
            Some("Sun") => CelestialKind::Star,
            Some("Planet") => CelestialKind::Planet,
            Some("Moon") => CelestialKind::Moon,
            Some("AsteroidBelt") => CelestialKind::AsteroidBelt,
            Some("Stargate") => CelestialKind::Stargate,
            _ => CelestialKind::Other,
        }
    }

    /// Moons and belts are named after the body they orbit
    fn named_after_orbit(self) -> bool {
        matches!(self, CelestialKind::Moon | CelestialKind::AsteroidBelt)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CelestialKind::Star => "star",
            CelestialKind::Planet => "planet",
            CelestialKind::Moon => "moon",
            CelestialKind::AsteroidBelt => "asteroid_belt",
            CelestialKind::Stargate => "stargate",
            CelestialKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Celestial {
    pub id: i64,
    pub system_id: i64,
    pub kind: CelestialKind,
    pub name: Option<String>,
    pub type_id: i64,
    pub group_id: Option<i64>,
    pub orbit_id: Option<i64>,
    pub position: Position,
    pub radius: Option<f64>,
    pub celestial_index: Option<i64>,
    pub orbit_index: Option<i64>,
}

impl Entity for Celestial {
    fn table() -> &'static TableSchema {
        &CELESTIALS
    }

    fn values(&self) -> Vec<SqlValue> {
        let (x, y, z) = coords(self.position);
        sql_values![
            self.id,
            self.system_id,
            self.kind.as_str(),
            self.name.clone(),
            self.type_id,
            self.group_id,
            self.orbit_id,
            x,
            y,
            z,
            self.radius,
            self.celestial_index,
            self.orbit_index,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stargate {
    pub id: i64,
    pub system_id: i64,
    pub destination_id: Option<i64>,
    pub destination_system_id: i64,
}

impl Entity for Stargate {
    fn table() -> &'static TableSchema {
        &STARGATES
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![
            self.id,
            self.system_id,
            self.destination_id,
            self.destination_system_id
        ]
    }
}

/// An undirected connection, stored with `system_a < system_b`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SystemConnection {
    pub system_a: i64,
    pub system_b: i64,
}

impl Entity for SystemConnection {
    fn table() -> &'static TableSchema {
        &SYSTEM_CONNECTIONS
    }

    fn values(&self) -> Vec<SqlValue> {
        sql_values![self.system_a, self.system_b]
    }
}

#[derive(Debug, Default)]
pub struct UniverseBatch {
    pub regions: Vec<Region>,
    pub constellations: Vec<Constellation>,
    pub systems: Vec<SolarSystem>,
    pub celestials: Vec<Celestial>,
    pub stargates: Vec<Stargate>,
    pub connections: Vec<SystemConnection>,
}

impl Batch for UniverseBatch {
    /// Connections are rebuilt each run; edges from an earlier run are not kept
    fn persist(&self, writer: &ModeWriter) -> Result<u64> {
        writer.clear(&SYSTEM_CONNECTIONS)?;
        persist_all(
            writer,
            &[
                &self.regions,
                &self.constellations,
                &self.systems,
                &self.celestials,
                &self.stargates,
                &self.connections,
            ],
        )
    }

    fn len(&self) -> usize {
        self.regions.len()
            + self.constellations.len()
            + self.systems.len()
            + self.celestials.len()
            + self.stargates.len()
            + self.connections.len()
    }
}

/// Roman numeral of a celestial index; `0` has none
pub fn roman(mut n: i64) -> String {
    const NUMERALS: [(i64, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];

    let mut out = String::new();
    for (value, numeral) in NUMERALS {
        while n >= value {
            out.push_str(numeral);
            n -= value;
        }
    }
    out
}

/// Universe names, keyed by id, translated from the universe text file
fn read_names(layout: &SourceLayout, resolver: &Resolver) -> Result<HashMap<i64, String>> {
    let mut names = HashMap::new();
    for record in collect_records(&layout.universe_text(), &SourceFormat::json())? {
        if let Some(source) = record.opt_str("name")? {
            names.insert(record.id()?, resolver.translate(source).to_string());
        }
    }
    Ok(names)
}

/// Records of a file, ordered by numeric id
fn sorted_records(path: &std::path::Path) -> Result<Vec<(i64, RawRecord)>> {
    let mut records = collect_records(path, &SourceFormat::json())?
        .into_iter()
        .map(|record| Ok((record.id()?, record)))
        .collect::<Result<Vec<_>>>()?;
    records.sort_by_key(|(id, _)| *id);
    Ok(records)
}

/// Raw fields kept per celestial for naming
struct CelestialSource {
    system_id: i64,
    group_id: Option<i64>,
    kind: CelestialKind,
    orbit_id: Option<i64>,
    celestial_index: Option<i64>,
    orbit_index: Option<i64>,
}

/// Name a celestial the way the game client does.
///
/// Moons and asteroid belts are named after the celestial they orbit,
/// everything else after its system and celestial index.
fn celestial_name(
    id: i64,
    sources: &BTreeMap<i64, CelestialSource>,
    resolver: &Resolver,
    depth: u8,
) -> Option<String> {
    let source = sources.get(&id)?;
    let orbit_index = source.orbit_index.filter(|i| *i != 0);
    if let (Some(orbit_index), Some(orbit_id)) = (orbit_index, source.orbit_id) {
        if source.kind.named_after_orbit() && depth < 4 {
            let orbit = celestial_name(orbit_id, sources, resolver, depth + 1)?;
            let group = match source.group_id {
                Some(g) => group_label(resolver, g),
                None => String::new(),
            };
            return Some(format!("{orbit} - {group} {orbit_index}"));
        }
    }

    let system = resolver.name(EntityKind::SolarSystem, source.system_id)?;
    let index = roman(source.celestial_index.unwrap_or(0));
    Some(format!("{system} {index}").trim_end().to_string())
}

fn group_label(resolver: &Resolver, group_id: i64) -> String {
    match resolver.name(EntityKind::Group, group_id) {
        Some(name) => name.to_string(),
        None => group_id.to_string(),
    }
}

pub fn build(
    layout: &SourceLayout,
    resolver: &mut Resolver,
    synthesize: bool,
) -> Result<UniverseBatch> {
    let names = read_names(layout, resolver)?;
    let name_of = |id: i64| names.get(&id).cloned();
    let mut batch = UniverseBatch::default();

    for (id, record) in sorted_records(&layout.regions())? {
        resolver.register(EntityKind::Region, id, id);
        if let Some(name) = name_of(id) {
            resolver.set_name(EntityKind::Region, id, name);
        }
        batch.regions.push(Region {
            id,
            name: name_of(id),
            position: record.position("center")?,
            faction_id: record.opt_int("faction_id")?,
            radius: record.opt_float("radius")?,
            wormhole_class_id: record.opt_int("wormhole_class_id")?,
        });
    }

    for (id, record) in sorted_records(&layout.constellations())? {
        let region_id = resolver.resolve(EntityKind::Region, record.int("region_id")?)?;
        resolver.register(EntityKind::Constellation, id, id);
        resolver.set_parent(EntityKind::Constellation, id, region_id);
        batch.constellations.push(Constellation {
            id,
            region_id,
            name: name_of(id),
            position: record.position("center")?,
            faction_id: record.opt_int("faction_id")?,
            radius: record.opt_float("radius")?,
            wormhole_class_id: record.opt_int("wormhole_class_id")?,
        });
    }

    let system_records = sorted_records(&layout.solar_systems())?;
    for (id, record) in &system_records {
        let id = *id;
        let constellation = record.int("constellation_id")?;
        let constellation_id = resolver.resolve(EntityKind::Constellation, constellation)?;
        let region_id = resolver.resolve(EntityKind::Region, record.int("region_id")?)?;
        resolver.register(EntityKind::SolarSystem, id, id);
        resolver.set_parent(EntityKind::SolarSystem, id, constellation_id);
        if let Some(name) = name_of(id) {
            resolver.set_name(EntityKind::SolarSystem, id, name);
        }
        batch.systems.push(SolarSystem {
            id,
            constellation_id,
            region_id,
            name: name_of(id),
            position: record.position("center")?,
            security: record.opt_float("security")?,
            faction_id: record.opt_int("faction_id")?,
            radius: record.opt_float("radius")?,
        });
    }

    // Stars
    for (id, record) in sorted_records(&layout.stars())? {
        let system_id = resolver.resolve(EntityKind::SolarSystem, record.int("solar_system_id")?)?;
        let type_id = resolver.resolve(EntityKind::Type, record.int("type_id")?)?;
        let spectral_class = record
            .get("statistics")
            .and_then(|s| s.get("spectral_class"))
            .and_then(|s| s.as_str());
        let name = match spectral_class {
            Some(class) => format!("Sun {}", class),
            None => "Sun".to_string(),
        };
        batch.celestials.push(Celestial {
            id,
            system_id,
            kind: CelestialKind::Star,
            name: Some(name),
            type_id,
            group_id: resolver.parent(EntityKind::Type, type_id),
            orbit_id: None,
            position: Some((0.0, 0.0, 0.0)),
            radius: record.opt_float("radius")?,
            celestial_index: None,
            orbit_index: None,
        });
    }

    // Planets, moons, belts and the rest; names need the whole set
    let mut sources = BTreeMap::new();
    let mut pending = Vec::new();
    for (id, record) in sorted_records(&layout.celestials())? {
        let system_id = resolver.resolve(EntityKind::SolarSystem, record.int("solar_system_id")?)?;
        let type_id = resolver.resolve(EntityKind::Type, record.int("type_id")?)?;
        let group_id = resolver.parent(EntityKind::Type, type_id);
        let group_code = group_id.and_then(|g| resolver.code(EntityKind::Group, g));
        let kind = CelestialKind::from_group_code(group_code);
        let source = CelestialSource {
            system_id,
            group_id,
            kind,
            orbit_id: record.opt_ref("orbit_id")?,
            celestial_index: record.opt_int("celestial_index")?,
            orbit_index: record.opt_int("orbit_index")?,
        };
        pending.push(Celestial {
            id,
            system_id,
            kind,
            name: None,
            type_id,
            group_id,
            orbit_id: source.orbit_id,
            position: record.position("position")?,
            radius: record.opt_float("radius")?,
            celestial_index: source.celestial_index,
            orbit_index: source.orbit_index,
        });
        sources.insert(id, source);
    }
    for mut celestial in pending {
        celestial.name = match celestial.kind {
            CelestialKind::Stargate => name_of(celestial.id),
            _ => celestial_name(celestial.id, &sources, resolver, 0),
        };
        batch.celestials.push(celestial);
    }

    // Stargates are celestials too; they keep their localized name
    for (id, record) in sorted_records(&layout.stargates())? {
        let origin = record.int("from_solar_system_id")?;
        let system_id = resolver.resolve(EntityKind::SolarSystem, origin)?;
        if !sources.contains_key(&id) {
            let type_id = resolver.resolve(EntityKind::Type, record.int("type_id")?)?;
            batch.celestials.push(Celestial {
                id,
                system_id,
                kind: CelestialKind::Stargate,
                name: name_of(id),
                type_id,
                group_id: resolver.parent(EntityKind::Type, type_id),
                orbit_id: None,
                position: record.position("position")?,
                radius: record.opt_float("radius")?,
                celestial_index: None,
                orbit_index: None,
            });
        }

        let destination = record.int("to_solar_system_id")?;
        let context = format!("stargate {id}");
        let resolved = resolver.resolve_optional(EntityKind::SolarSystem, destination, &context);
        let Some(destination_system_id) = resolved else {
            continue;
        };
        batch.stargates.push(Stargate {
            id,
            system_id,
            destination_id: record.opt_int("to_stargate_id")?,
            destination_system_id,
        });
    }

    batch.celestials.sort_by_key(|c| c.id);
    for celestial in &batch.celestials {
        resolver.register(EntityKind::Celestial, celestial.id, celestial.id);
        resolver.set_parent(EntityKind::Celestial, celestial.id, celestial.system_id);
        if let Some(name) = &celestial.name {
            resolver.set_name(EntityKind::Celestial, celestial.id, name.as_str());
        }
        if celestial.kind == CelestialKind::Planet {
            resolver.register(EntityKind::Planet, celestial.id, celestial.id);
        }
    }

    // Each system lists its neighbours
    let mut assembler = ConnectionAssembler::new();
    for (id, record) in &system_records {
        let region = resolver.region_of_system(*id);
        assembler.add_fragment(region, *id, record.int_list("neighbours")?, resolver);
    }
    let assembly = assembler.assemble(synthesize, resolver);
    batch.connections = connections(assembly.edges);

    info!(
        "Built {} regions, {} constellations, {} systems",
        batch.regions.len(),
        batch.constellations.len(),
        batch.systems.len()
    );
    info!(
        "Built {} celestials, {} stargates, {} connections ({} warnings)",
        batch.celestials.len(),
        batch.stargates.len(),
        batch.connections.len(),
        assembly.warnings.len()
    );
    Ok(batch)
}

fn connections(edges: impl IntoIterator<Item = (i64, i64)>) -> Vec<SystemConnection> {
    edges
        .into_iter()
        .map(|(system_a, system_b)| SystemConnection { system_a, system_b })
        .collect()
}

/// Merge stargate links of every region into the stored connections
pub fn build_cobalt(
    resolver: &Resolver,
    conn: &Connection,
    synthesize: bool,
) -> Result<UniverseBatch> {
    let mut assembler = ConnectionAssembler::new();

    // Stored pairs are already reconciled
    for (a, b) in system_connections(conn)? {
        assembler.add_direction(a, b);
        assembler.add_direction(b, a);
    }
    let links = stargate_links(conn)?;
    if links.is_empty() {
        warn!("No stargates stored, nothing to merge");
    }
    for (from, to) in links {
        assembler.add_direction(from, to);
    }

    let assembly = assembler.assemble(synthesize, resolver);
    info!(
        "Merged stargates into {} connections ({} warnings)",
        assembly.edges.len(),
        assembly.warnings.len()
    );
    Ok(UniverseBatch {
        connections: connections(assembly.edges),
        ..UniverseBatch::default()
    })
}
