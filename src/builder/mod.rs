//! Entity builders, one per mode.
//!
//! A builder reads the mode's input files, resolves every cross-file
//! reference through the shared [`Resolver`] and returns the complete set of
//! rows for the mode. Nothing is written until the whole batch is built, so an
//! aborted mode never leaves partial rows behind.

pub mod attributes;
pub mod base;
pub mod blueprints;
pub mod item_attrs;
pub mod item_extra;
pub mod items;
pub mod localization;
pub mod modifiers;
pub mod planet;
pub mod universe;

use rusqlite::Connection;
use serde_json::Value;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::parser::RawRecord;
use crate::pipeline::Mode;
use crate::resolver::Resolver;
use crate::writer::{Entity, ModeWriter};

/// Rows built by one mode, ready to be written
pub trait Batch {
    /// Write every table of the batch, parents before children
    fn persist(&self, writer: &ModeWriter) -> Result<u64>;

    /// Total number of rows in the batch
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build the rows of `mode`.
///
/// `conn` gives read access to rows committed by earlier modes.
pub fn build(
    mode: Mode,
    config: &PipelineConfig,
    resolver: &mut Resolver,
    conn: &Connection,
) -> Result<Box<dyn Batch>> {
    let layout = &config.layout;
    Ok(match mode {
        Mode::Lang => Box::new(localization::build(layout, &config.languages, resolver)?),
        Mode::Base => Box::new(base::build(layout, resolver)?),
        Mode::Attrs => Box::new(attributes::build(layout, resolver)?),
        Mode::Items => Box::new(items::build(layout, resolver)?),
        Mode::ItemExtra => Box::new(item_extra::build(layout, resolver, conn)?),
        Mode::ItemAttrs => Box::new(item_attrs::build(layout, resolver)?),
        Mode::Modifier => Box::new(modifiers::build(layout, resolver)?),
        Mode::Bps => Box::new(blueprints::build(layout, resolver)?),
        Mode::Universe => Box::new(universe::build(
            layout,
            resolver,
            config.synthesize_reverse_edges,
        )?),
        Mode::Cobalt => Box::new(universe::build_cobalt(
            resolver,
            conn,
            config.synthesize_reverse_edges,
        )?),
        Mode::PlanetExploit => Box::new(planet::build(layout, resolver)?),
    })
}

/// Persist several tables in order and sum their row counts
pub(crate) fn persist_all(writer: &ModeWriter, tables: &[&dyn PersistTable]) -> Result<u64> {
    let mut total = 0;
    for table in tables {
        total += table.persist_into(writer)?;
    }
    Ok(total)
}

/// Object-safe view of a `Vec<E: Entity>`
pub(crate) trait PersistTable {
    fn persist_into(&self, writer: &ModeWriter) -> Result<u64>;
}

impl<E: Entity> PersistTable for Vec<E> {
    fn persist_into(&self, writer: &ModeWriter) -> Result<u64> {
        writer.persist(self)
    }
}

/// Any JSON value re-encoded as text
pub(crate) fn json_text(record: &RawRecord, field: &str) -> Option<String> {
    record.get(field).map(|v| v.to_string())
}

/// Boolean field that may be absent
pub(crate) fn opt_bool(record: &RawRecord, field: &str) -> Result<Option<bool>> {
    if record.has(field) {
        record.bool_or(field, false).map(Some)
    } else {
        Ok(None)
    }
}

/// Text field; numbers and booleans are kept in their JSON spelling
pub(crate) fn opt_string(record: &RawRecord, field: &str) -> Result<Option<String>> {
    match record.get(field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
        Some(_) => Err(record.malformed(format!("field '{}' is not text", field))),
    }
}
