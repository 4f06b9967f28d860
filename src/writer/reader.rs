//! Reading persisted rows back, for modes whose prerequisites were loaded in
//! an earlier run.

use rusqlite::Connection;
use tracing::info;

use crate::error::Result;
use crate::pipeline::Mode;
use crate::resolver::{EntityKind, Resolver};

/// Register everything `mode` persisted so later builders can resolve it
pub fn hydrate(conn: &Connection, mode: Mode, resolver: &mut Resolver) -> Result<()> {
    match mode {
        Mode::Lang => hydrate_strings(conn, resolver)?,
        Mode::Base => hydrate_base(conn, resolver)?,
        Mode::Attrs => {
            register_ids(
                conn,
                "SELECT id FROM attributes",
                EntityKind::Attribute,
                resolver,
            )?;
            register_ids(conn, "SELECT id FROM effects", EntityKind::Effect, resolver)?;
        }
        Mode::Items => hydrate_items(conn, resolver)?,
        Mode::Modifier => {
            let mut stmt = conn.prepare("SELECT id, code FROM modifier_definitions")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (id, code) = row?;
                resolver.register(EntityKind::ModifierDefinition, code, id);
            }
        }
        Mode::Universe => hydrate_universe(conn, resolver)?,
        // Nothing depends on the rows of these modes
        Mode::ItemExtra | Mode::ItemAttrs | Mode::Bps | Mode::Cobalt | Mode::PlanetExploit => {}
    }

    info!("Loaded {} data from the database", mode);
    Ok(())
}

fn register_ids(
    conn: &Connection,
    sql: &str,
    kind: EntityKind,
    resolver: &mut Resolver,
) -> Result<()> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt.query_map([], |row| row.get::<_, i64>(0))?;
    for id in ids {
        let id = id?;
        resolver.register(kind, id, id);
    }
    Ok(())
}

fn hydrate_strings(conn: &Connection, resolver: &mut Resolver) -> Result<()> {
    let mut stmt = conn.prepare("SELECT id, source, text_en FROM localised_strings ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, Option<String>>(2)?,
        ))
    })?;

    for row in rows {
        let (id, source, en) = row?;
        if let Some(source) = source {
            resolver.register_first(EntityKind::LocalizedString, source, id);
        }
        if let Some(en) = en {
            resolver.set_english(id, en);
        }
    }

    info!(
        "Loaded {} localized strings into the cache",
        resolver.count(EntityKind::LocalizedString)
    );
    Ok(())
}

fn hydrate_base(conn: &Connection, resolver: &mut Resolver) -> Result<()> {
    register_ids(conn, "SELECT id FROM units", EntityKind::Unit, resolver)?;

    let mut stmt = conn.prepare("SELECT id, name FROM categories")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?))
    })?;
    for row in rows {
        let (id, name) = row?;
        resolver.register(EntityKind::Category, id, id);
        if let Some(name) = name {
            resolver.set_code(EntityKind::Category, id, name);
        }
    }

    let mut stmt = conn.prepare(
        "SELECT g.id, g.name, g.category_id, s.text_en
         FROM groups g LEFT JOIN localised_strings s ON s.id = g.name_key",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, Option<i64>>(2)?,
            row.get::<_, Option<String>>(3)?,
        ))
    })?;
    for row in rows {
        let (id, code, category, display) = row?;
        resolver.register(EntityKind::Group, id, id);
        if let Some(category) = category {
            resolver.set_parent(EntityKind::Group, id, category);
        }
        if let Some(display) = display.or_else(|| code.clone()) {
            resolver.set_name(EntityKind::Group, id, display);
        }
        if let Some(code) = code {
            resolver.set_code(EntityKind::Group, id, code);
        }
    }

    let mut stmt = conn.prepare("SELECT id, short_id, group_id FROM types")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, Option<i64>>(1)?,
            row.get::<_, Option<i64>>(2)?,
        ))
    })?;
    for row in rows {
        let (id, short_id, group) = row?;
        resolver.register(EntityKind::Type, id, id);
        if let Some(short_id) = short_id {
            resolver.set_short_id(id, short_id);
        }
        if let Some(group) = group {
            resolver.set_parent(EntityKind::Type, id, group);
        }
    }

    Ok(())
}

fn hydrate_items(conn: &Connection, resolver: &mut Resolver) -> Result<()> {
    let mut stmt = conn.prepare("SELECT id, group_id FROM items")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;
    for row in rows {
        let (id, group) = row?;
        resolver.register(EntityKind::Item, id, id);
        resolver.set_parent(EntityKind::Item, id, group);
    }
    Ok(())
}

fn hydrate_universe(conn: &Connection, resolver: &mut Resolver) -> Result<()> {
    let mut stmt = conn.prepare("SELECT id, name FROM regions")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?))
    })?;
    for row in rows {
        let (id, name) = row?;
        resolver.register(EntityKind::Region, id, id);
        if let Some(name) = name {
            resolver.set_name(EntityKind::Region, id, name);
        }
    }

    for (sql, kind) in [
        ("SELECT id, region_id, name FROM constellations", EntityKind::Constellation),
        ("SELECT id, constellation_id, name FROM solar_systems", EntityKind::SolarSystem),
        ("SELECT id, system_id, name FROM celestials", EntityKind::Celestial),
    ] {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;
        for row in rows {
            let (id, parent, name) = row?;
            resolver.register(kind, id, id);
            resolver.set_parent(kind, id, parent);
            if let Some(name) = name {
                resolver.set_name(kind, id, name);
            }
        }
    }

    register_ids(
        conn,
        "SELECT id FROM celestials WHERE kind = 'planet'",
        EntityKind::Planet,
        resolver,
    )?;

    Ok(())
}

/// Id, type, group and volume of a stored item
#[derive(Debug, Clone, PartialEq)]
pub struct ItemVolume {
    pub id: i64,
    pub type_id: i64,
    pub group_id: i64,
    pub volume: Option<f64>,
}

/// Volume data of every stored item, by id
pub fn item_volumes(conn: &Connection) -> Result<Vec<ItemVolume>> {
    let mut stmt = conn.prepare("SELECT id, type_id, group_id, volume FROM items ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(ItemVolume {
            id: row.get(0)?,
            type_id: row.get(1)?,
            group_id: row.get(2)?,
            volume: row.get(3)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Directed (system, destination system) pairs of every stored stargate
pub fn stargate_links(conn: &Connection) -> Result<Vec<(i64, i64)>> {
    let mut stmt =
        conn.prepare("SELECT system_id, destination_system_id FROM stargates ORDER BY id")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Stored system connections as (system_a, system_b) pairs
pub fn system_connections(conn: &Connection) -> Result<Vec<(i64, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT system_a, system_b FROM system_connections
         ORDER BY system_a, system_b",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Store;

    #[test]
    fn test_hydrate_universe_links_parents() {
        let store = Store::open_in_memory().unwrap();
        store
            .connection()
            .execute_batch(
                "INSERT INTO types (id, name) VALUES (9, 'PlanetTemperate');
                 INSERT INTO regions (id, name) VALUES (1, 'Domain');
                 INSERT INTO constellations (id, region_id, name) VALUES (2, 1, 'Throne Worlds');
                 INSERT INTO solar_systems (id, constellation_id, region_id, name)
                 VALUES (3, 2, 1, 'Amarr');
                 INSERT INTO celestials (id, system_id, kind, type_id, name)
                 VALUES (4, 3, 'planet', 9, 'Amarr I');",
            )
            .unwrap();

        let mut resolver = Resolver::new();
        hydrate(store.connection(), Mode::Universe, &mut resolver).unwrap();

        assert_eq!(resolver.resolve(EntityKind::SolarSystem, 3_i64).unwrap(), 3);
        assert_eq!(resolver.region_of_system(3), Some(1));
        assert_eq!(resolver.resolve(EntityKind::Planet, 4_i64).unwrap(), 4);
        assert_eq!(resolver.name(EntityKind::SolarSystem, 3), Some("Amarr"));
    }

    #[test]
    fn test_hydrate_strings_keeps_lowest_id() {
        let store = Store::open_in_memory().unwrap();
        store
            .connection()
            .execute_batch(
                "INSERT INTO localised_strings (id, source, text_en)
                 VALUES (5, '护卫舰', 'Frigate'), (9, '护卫舰', 'Frigates');",
            )
            .unwrap();

        let mut resolver = Resolver::new();
        hydrate(store.connection(), Mode::Lang, &mut resolver).unwrap();

        let id = resolver.resolve(EntityKind::LocalizedString, "护卫舰");
        assert_eq!(id.unwrap(), 5);
        assert_eq!(resolver.translate("护卫舰"), "Frigate");
    }
}
