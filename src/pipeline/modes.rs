use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{PipelineError, Result};

/// A unit of loading work, writing one group of tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mode {
    Lang,
    Base,
    Attrs,
    Items,
    ItemExtra,
    ItemAttrs,
    Modifier,
    Bps,
    Universe,
    Cobalt,
    PlanetExploit,
}

impl Mode {
    /// Every mode, in canonical order
    pub const ALL: [Mode; 11] = [
        Mode::Lang,
        Mode::Base,
        Mode::Attrs,
        Mode::Items,
        Mode::ItemExtra,
        Mode::ItemAttrs,
        Mode::Modifier,
        Mode::Bps,
        Mode::Universe,
        Mode::Cobalt,
        Mode::PlanetExploit,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Lang => "lang",
            Mode::Base => "base",
            Mode::Attrs => "attrs",
            Mode::Items => "items",
            Mode::ItemExtra => "item_extra",
            Mode::ItemAttrs => "item_attrs",
            Mode::Modifier => "modifier",
            Mode::Bps => "bps",
            Mode::Universe => "universe",
            Mode::Cobalt => "cobalt",
            Mode::PlanetExploit => "planet_exploit",
        }
    }

    /// Modes whose data must exist before this one runs
    pub fn prerequisites(&self) -> &'static [Mode] {
        match self {
            Mode::Lang => &[],
            Mode::Base => &[Mode::Lang],
            Mode::Attrs => &[Mode::Lang, Mode::Base],
            Mode::Items => &[Mode::Lang, Mode::Base],
            Mode::ItemExtra => &[Mode::Items, Mode::Base],
            Mode::ItemAttrs => &[Mode::Items, Mode::Attrs],
            Mode::Modifier => &[Mode::Attrs],
            Mode::Bps => &[Mode::Items, Mode::Attrs],
            Mode::Universe => &[Mode::Base, Mode::Lang],
            Mode::Cobalt => &[Mode::Universe],
            Mode::PlanetExploit => &[Mode::Universe, Mode::Items],
        }
    }

    /// The table whose rows prove that this mode has been loaded
    pub fn primary_table(&self) -> &'static str {
        match self {
            Mode::Lang => "localised_strings",
            Mode::Base => "types",
            Mode::Attrs => "attributes",
            Mode::Items => "items",
            Mode::ItemExtra => "repackage_volume",
            Mode::ItemAttrs => "item_attributes",
            Mode::Modifier => "modifier_definitions",
            Mode::Bps => "blueprints",
            Mode::Universe => "solar_systems",
            Mode::Cobalt => "system_connections",
            Mode::PlanetExploit => "planet_exploits",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Mode::Lang => "Localized strings from the gettext catalogs",
            Mode::Base => "Categories, groups, types and units",
            Mode::Attrs => "Dogma attributes and effects",
            Mode::Items => "Items and nanocores",
            Mode::ItemExtra => "Repackaged volumes and reprocessing yields",
            Mode::ItemAttrs => "Item attribute values and effects",
            Mode::Modifier => "Modifier definitions, values and item modifiers",
            Mode::Bps => "Manufacturing blueprints and costs",
            Mode::Universe => "Regions, constellations, systems, celestials and connections",
            Mode::Cobalt => "Stargate connections merged into the system graph",
            Mode::PlanetExploit => "Planetary resources",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        Mode::ALL
            .iter()
            .copied()
            .find(|mode| mode.name() == s.trim())
            .ok_or_else(|| PipelineError::UnknownMode(s.to_string()))
    }
}

/// Order the requested modes so that prerequisites run first.
///
/// Prerequisites that were not requested are not added; the caller checks
/// them against the store. Ties follow the canonical order, so the result
/// does not depend on the order modes were listed in.
pub fn plan(requested: &[Mode]) -> Result<Vec<Mode>> {
    let included: HashSet<Mode> = requested.iter().copied().collect();
    let mut result = Vec::new();
    let mut visited: HashSet<Mode> = HashSet::new();
    let mut visiting: HashSet<Mode> = HashSet::new();

    for mode in Mode::ALL {
        if included.contains(&mode) && !visited.contains(&mode) {
            visit(mode, &included, &mut visited, &mut visiting, &mut result)?;
        }
    }

    Ok(result)
}

fn visit(
    mode: Mode,
    included: &HashSet<Mode>,
    visited: &mut HashSet<Mode>,
    visiting: &mut HashSet<Mode>,
    result: &mut Vec<Mode>,
) -> Result<()> {
    if visiting.contains(&mode) {
        return Err(PipelineError::CircularDependency(mode));
    }
    if visited.contains(&mode) {
        return Ok(());
    }

    visiting.insert(mode);

    for dep in mode.prerequisites() {
        if included.contains(dep) {
            visit(*dep, included, visited, visiting, result)?;
        }
    }

    visiting.remove(&mode);
    visited.insert(mode);
    result.push(mode);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(order: &[Mode], mode: Mode) -> usize {
        order.iter().position(|m| *m == mode).unwrap()
    }

    #[test]
    fn test_prerequisites_come_first() {
        let order = plan(&Mode::ALL).unwrap();
        assert_eq!(order.len(), Mode::ALL.len());

        for mode in &order {
            for dep in mode.prerequisites() {
                let (before, after) = (position(&order, *dep), position(&order, *mode));
                assert!(before < after, "{dep} before {mode}");
            }
        }
    }

    #[test]
    fn test_listing_order_does_not_matter() {
        let a = plan(&[Mode::PlanetExploit, Mode::Items, Mode::Universe, Mode::Lang]).unwrap();
        let b = plan(&[Mode::Lang, Mode::Universe, Mode::PlanetExploit, Mode::Items]).unwrap();
        assert_eq!(a, b);
        assert!(position(&a, Mode::Universe) < position(&a, Mode::PlanetExploit));
    }

    #[test]
    fn test_unrequested_prerequisites_are_not_added() {
        let order = plan(&[Mode::Bps]).unwrap();
        assert_eq!(order, vec![Mode::Bps]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let order = plan(&[Mode::Lang, Mode::Lang]).unwrap();
        assert_eq!(order, vec![Mode::Lang]);
    }

    #[test]
    fn test_parse_mode_names() {
        for mode in Mode::ALL {
            assert_eq!(mode.name().parse::<Mode>().unwrap(), mode);
        }
        let err = "cobalt_edge".parse::<Mode>().unwrap_err();
        assert!(matches!(err, PipelineError::UnknownMode(_)));
    }
}
