//! Reference resolution between raw source identifiers and stored ids.
//!
//! Builders register every entity they produce under the identifier its source
//! file uses; later builders resolve their foreign keys through the same
//! `Resolver`. One instance lives for a single run and is passed explicitly.

use std::collections::HashMap;
use std::fmt;
use tracing::warn;

use crate::error::{PipelineError, Result};

/// Kinds of entities that can be referenced across files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    LocalizedString,
    Unit,
    Category,
    Group,
    Type,
    Attribute,
    Effect,
    Item,
    ModifierDefinition,
    Region,
    Constellation,
    SolarSystem,
    Celestial,
    /// Celestials of planet kind, registered in addition to `Celestial`
    Planet,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::LocalizedString => "localized string",
            EntityKind::Unit => "unit",
            EntityKind::Category => "category",
            EntityKind::Group => "group",
            EntityKind::Type => "type",
            EntityKind::Attribute => "attribute",
            EntityKind::Effect => "effect",
            EntityKind::Item => "item",
            EntityKind::ModifierDefinition => "modifier definition",
            EntityKind::Region => "region",
            EntityKind::Constellation => "constellation",
            EntityKind::SolarSystem => "solar system",
            EntityKind::Celestial => "celestial",
            EntityKind::Planet => "planet",
        };
        f.write_str(name)
    }
}

/// An identifier as it appears in a source file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RawId {
    Int(i64),
    Text(String),
}

impl RawId {
    /// Parse a dictionary key: numeric keys become `Int`, anything else `Text`
    pub fn from_key(key: &str) -> Self {
        key.parse::<i64>()
            .map(RawId::Int)
            .unwrap_or_else(|_| RawId::Text(key.to_string()))
    }
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawId::Int(i) => write!(f, "{}", i),
            RawId::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i64> for RawId {
    fn from(value: i64) -> Self {
        RawId::Int(value)
    }
}

impl From<&str> for RawId {
    fn from(value: &str) -> Self {
        RawId::Text(value.to_string())
    }
}

impl From<String> for RawId {
    fn from(value: String) -> Self {
        RawId::Text(value)
    }
}

/// Id lookup tables for one pipeline run
#[derive(Debug, Default)]
pub struct Resolver {
    ids: HashMap<EntityKind, HashMap<RawId, i64>>,
    /// (kind, internal id) -> internal id of the containing entity
    parents: HashMap<(EntityKind, i64), i64>,
    /// (kind, internal id) -> display name
    names: HashMap<(EntityKind, i64), String>,
    /// (kind, internal id) -> constant name from the game scripts
    codes: HashMap<(EntityKind, i64), String>,
    /// localized string id -> English text
    english: HashMap<i64, String>,
    /// type id -> short type id
    short_ids: HashMap<i64, i64>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `raw_id` of `kind` maps to `internal_id`.
    ///
    /// Returns the previously registered id if the raw id was already known.
    pub fn register(
        &mut self,
        kind: EntityKind,
        raw_id: impl Into<RawId>,
        internal_id: i64,
    ) -> Option<i64> {
        self.ids
            .entry(kind)
            .or_default()
            .insert(raw_id.into(), internal_id)
    }

    /// Register only if the raw id is not known yet. Returns true if inserted.
    pub fn register_first(
        &mut self,
        kind: EntityKind,
        raw_id: impl Into<RawId>,
        internal_id: i64,
    ) -> bool {
        let table = self.ids.entry(kind).or_default();
        let raw_id = raw_id.into();
        if table.contains_key(&raw_id) {
            return false;
        }
        table.insert(raw_id, internal_id);
        true
    }

    /// Look up a registered id; a missing mapping is an error.
    pub fn resolve(&self, kind: EntityKind, raw_id: impl Into<RawId>) -> Result<i64> {
        let raw_id = raw_id.into();
        self.lookup(kind, &raw_id)
            .ok_or(PipelineError::UnresolvedReference { kind, raw_id })
    }

    /// Resolve an optional link: an unknown id is logged and skipped.
    pub fn resolve_optional(
        &self,
        kind: EntityKind,
        raw_id: impl Into<RawId>,
        context: &str,
    ) -> Option<i64> {
        let raw_id = raw_id.into();
        match self.lookup(kind, &raw_id) {
            Some(id) => Some(id),
            None => {
                warn!("{context}: unresolved {kind} reference {raw_id}, skipped");
                None
            }
        }
    }

    pub fn contains(&self, kind: EntityKind, raw_id: impl Into<RawId>) -> bool {
        self.lookup(kind, &raw_id.into()).is_some()
    }

    fn lookup(&self, kind: EntityKind, raw_id: &RawId) -> Option<i64> {
        self.ids.get(&kind).and_then(|t| t.get(raw_id)).copied()
    }

    /// Number of registered raw ids of a kind
    pub fn count(&self, kind: EntityKind) -> usize {
        self.ids.get(&kind).map(|t| t.len()).unwrap_or(0)
    }

    pub fn set_parent(&mut self, kind: EntityKind, id: i64, parent: i64) {
        self.parents.insert((kind, id), parent);
    }

    pub fn parent(&self, kind: EntityKind, id: i64) -> Option<i64> {
        self.parents.get(&(kind, id)).copied()
    }

    pub fn set_name(&mut self, kind: EntityKind, id: i64, name: impl Into<String>) {
        self.names.insert((kind, id), name.into());
    }

    pub fn name(&self, kind: EntityKind, id: i64) -> Option<&str> {
        self.names.get(&(kind, id)).map(|s| s.as_str())
    }

    pub fn set_code(&mut self, kind: EntityKind, id: i64, code: impl Into<String>) {
        self.codes.insert((kind, id), code.into());
    }

    pub fn code(&self, kind: EntityKind, id: i64) -> Option<&str> {
        self.codes.get(&(kind, id)).map(|s| s.as_str())
    }

    pub fn set_short_id(&mut self, type_id: i64, short_id: i64) {
        self.short_ids.insert(type_id, short_id);
    }

    pub fn short_id(&self, type_id: i64) -> Option<i64> {
        self.short_ids.get(&type_id).copied()
    }

    pub fn set_english(&mut self, string_id: i64, text: impl Into<String>) {
        self.english.insert(string_id, text.into());
    }

    pub fn english(&self, string_id: i64) -> Option<&str> {
        self.english.get(&string_id).map(|s| s.as_str())
    }

    /// Translate a source string to English, falling back to the source itself
    pub fn translate<'a>(&'a self, source: &'a str) -> &'a str {
        let raw_id = RawId::Text(source.to_string());
        self.lookup(EntityKind::LocalizedString, &raw_id)
            .and_then(|id| self.english(id))
            .unwrap_or(source)
    }

    /// Region of a solar system, via its constellation
    pub fn region_of_system(&self, system_id: i64) -> Option<i64> {
        let constellation = self.parent(EntityKind::SolarSystem, system_id)?;
        self.parent(EntityKind::Constellation, constellation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_resolve() {
        let mut resolver = Resolver::new();
        resolver.register(EntityKind::Item, 100_i64, 100);
        resolver.register(EntityKind::LocalizedString, "护卫舰", 7);

        assert_eq!(resolver.resolve(EntityKind::Item, 100_i64).unwrap(), 100);
        let id = resolver.resolve(EntityKind::LocalizedString, "护卫舰");
        assert_eq!(id.unwrap(), 7);
    }

    #[test]
    fn test_kinds_are_separate_namespaces() {
        let mut resolver = Resolver::new();
        resolver.register(EntityKind::Item, 5_i64, 5);

        let err = resolver.resolve(EntityKind::Attribute, 5_i64).unwrap_err();
        match err {
            PipelineError::UnresolvedReference { kind, raw_id } => {
                assert_eq!(kind, EntityKind::Attribute);
                assert_eq!(raw_id, RawId::Int(5));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_optional_returns_none() {
        let resolver = Resolver::new();
        let id = resolver.resolve_optional(EntityKind::Unit, 3_i64, "attribute 1");
        assert_eq!(id, None);
    }

    #[test]
    fn test_register_first_keeps_original() {
        let mut resolver = Resolver::new();
        assert!(resolver.register_first(EntityKind::LocalizedString, "a", 1));
        assert!(!resolver.register_first(EntityKind::LocalizedString, "a", 2));
        let id = resolver.resolve(EntityKind::LocalizedString, "a");
        assert_eq!(id.unwrap(), 1);
    }

    #[test]
    fn test_region_of_system_follows_parents() {
        let mut resolver = Resolver::new();
        resolver.set_parent(EntityKind::SolarSystem, 30, 20);
        resolver.set_parent(EntityKind::Constellation, 20, 10);
        assert_eq!(resolver.region_of_system(30), Some(10));
        assert_eq!(resolver.region_of_system(31), None);
    }

    #[test]
    fn test_translate_falls_back_to_source() {
        let mut resolver = Resolver::new();
        resolver.register(EntityKind::LocalizedString, "源", 1);
        resolver.set_english(1, "Source");
        assert_eq!(resolver.translate("源"), "Source");
        assert_eq!(resolver.translate("未知"), "未知");
    }

    #[test]
    fn test_raw_id_from_key() {
        assert_eq!(RawId::from_key("42"), RawId::Int(42));
        assert_eq!(RawId::from_key("abc"), RawId::Text("abc".into()));
    }
}
