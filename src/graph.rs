//! Solar system connectivity, merged from per-region fragments.
//!
//! Each region's data lists the neighbours of its own systems, so an edge
//! between two regions is usually reported twice (once per side) and
//! occasionally only once. Edges are stored as unordered pairs
//! `(min, max)`; a direction whose reverse was never reported is a
//! half-edge, kept or dropped by `synthesize_reverse_edges`.

use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;

use crate::resolver::{EntityKind, RawId, Resolver};

/// Something in the fragments that did not fit the graph, never fatal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityWarning {
    /// A connection was reported in only one direction
    HalfEdge {
        from: i64,
        to: i64,
        cross_region: bool,
        kept: bool,
    },
    /// A fragment end that is not a known solar system
    UnresolvedEnd { region: Option<i64>, raw_id: RawId },
    SelfLoop { system: i64 },
}

impl fmt::Display for ConnectivityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectivityWarning::HalfEdge {
                from,
                to,
                cross_region,
                kept,
            } => write!(
                f,
                "connection {} -> {} has no reverse{} ({})",
                from,
                to,
                if *cross_region { " across regions" } else { "" },
                if *kept { "kept" } else { "dropped" }
            ),
            ConnectivityWarning::UnresolvedEnd { region, raw_id } => match region {
                Some(region) => write!(f, "unknown solar system {} in region {}", raw_id, region),
                None => write!(f, "unknown solar system {}", raw_id),
            },
            ConnectivityWarning::SelfLoop { system } => {
                write!(f, "solar system {} lists itself as a neighbour", system)
            }
        }
    }
}

/// Result of merging all fragments
#[derive(Debug, Default)]
pub struct Assembly {
    /// Normalized `(min, max)` pairs
    pub edges: BTreeSet<(i64, i64)>,
    pub warnings: Vec<ConnectivityWarning>,
}

/// Collects directed fragments and reconciles them into undirected edges
#[derive(Debug, Default)]
pub struct ConnectionAssembler {
    /// Observed directions `from -> to`
    directions: BTreeSet<(i64, i64)>,
    warnings: Vec<ConnectivityWarning>,
}

impl ConnectionAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the neighbours one system reports.
    ///
    /// Ends that do not resolve to a solar system, and self-loops, are
    /// recorded as warnings and ignored.
    pub fn add_fragment<I>(
        &mut self,
        region: Option<i64>,
        from: impl Into<RawId>,
        neighbours: I,
        resolver: &Resolver,
    ) where
        I: IntoIterator,
        I::Item: Into<RawId>,
    {
        let from = from.into();
        let Some(from_id) = resolver.resolve(EntityKind::SolarSystem, from.clone()).ok() else {
            self.warnings.push(ConnectivityWarning::UnresolvedEnd {
                region,
                raw_id: from,
            });
            return;
        };

        for neighbour in neighbours {
            let neighbour = neighbour.into();
            match resolver.resolve(EntityKind::SolarSystem, neighbour.clone()) {
                Ok(to_id) => self.add_direction(from_id, to_id),
                Err(_) => self.warnings.push(ConnectivityWarning::UnresolvedEnd {
                    region,
                    raw_id: neighbour,
                }),
            }
        }
    }

    /// Add one already resolved direction
    pub fn add_direction(&mut self, from: i64, to: i64) {
        if from == to {
            let warning = ConnectivityWarning::SelfLoop { system: from };
            self.warnings.push(warning);
            return;
        }
        self.directions.insert((from, to));
    }

    /// Merge every direction into normalized edges.
    ///
    /// `synthesize` keeps connections reported in only one direction.
    pub fn assemble(self, synthesize: bool, resolver: &Resolver) -> Assembly {
        let mut assembly = Assembly {
            edges: BTreeSet::new(),
            warnings: self.warnings,
        };

        for &(from, to) in &self.directions {
            let pair = (from.min(to), from.max(to));
            if self.directions.contains(&(to, from)) {
                assembly.edges.insert(pair);
                continue;
            }

            let from_region = resolver.region_of_system(from);
            let to_region = resolver.region_of_system(to);
            let cross_region =
                from_region.is_none() || to_region.is_none() || from_region != to_region;
            assembly.warnings.push(ConnectivityWarning::HalfEdge {
                from,
                to,
                cross_region,
                kept: synthesize,
            });
            if synthesize {
                assembly.edges.insert(pair);
            }
        }

        for warning in &assembly.warnings {
            warn!("{}", warning);
        }
        assembly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> Resolver {
        let mut resolver = Resolver::new();
        // Region 1 holds systems 10 and 11, region 2 holds 20
        for (system, constellation, region) in [(10, 100, 1), (11, 100, 1), (20, 200, 2)] {
            resolver.register(EntityKind::SolarSystem, system, system);
            resolver.set_parent(EntityKind::SolarSystem, system, constellation);
            resolver.set_parent(EntityKind::Constellation, constellation, region);
        }
        resolver
    }

    #[test]
    fn test_both_directions_collapse_to_one_edge() {
        let resolver = resolver();
        let mut assembler = ConnectionAssembler::new();
        assembler.add_fragment(Some(1), 11_i64, [20_i64], &resolver);
        assembler.add_fragment(Some(2), 20_i64, [11_i64], &resolver);

        let assembly = assembler.assemble(true, &resolver);
        let edges: Vec<_> = assembly.edges.into_iter().collect();
        assert_eq!(edges, vec![(11, 20)]);
        assert!(assembly.warnings.is_empty());
    }

    #[test]
    fn test_half_edge_synthesized_or_dropped() {
        let resolver = resolver();
        let build = || {
            let mut assembler = ConnectionAssembler::new();
            assembler.add_fragment(Some(1), 11_i64, [20_i64], &resolver);
            assembler
        };

        let kept = build().assemble(true, &resolver);
        assert!(kept.edges.contains(&(11, 20)));
        assert_eq!(
            kept.warnings,
            vec![ConnectivityWarning::HalfEdge {
                from: 11,
                to: 20,
                cross_region: true,
                kept: true,
            }]
        );

        let dropped = build().assemble(false, &resolver);
        assert!(dropped.edges.is_empty());
        assert_eq!(dropped.warnings.len(), 1);
    }

    #[test]
    fn test_unresolved_ends_and_self_loops_are_dropped() {
        let resolver = resolver();
        let mut assembler = ConnectionAssembler::new();
        assembler.add_fragment(Some(1), 10_i64, [10_i64, 99_i64, 11_i64], &resolver);
        assembler.add_fragment(Some(1), 11_i64, [10_i64], &resolver);
        assembler.add_fragment(Some(1), 98_i64, [10_i64], &resolver);

        let assembly = assembler.assemble(true, &resolver);
        assert_eq!(assembly.edges.len(), 1);
        assert!(assembly.edges.contains(&(10, 11)));
        assert_eq!(assembly.warnings.len(), 3);
        assert!(assembly
            .warnings
            .contains(&ConnectivityWarning::SelfLoop { system: 10 }));
    }

    #[test]
    fn test_same_region_half_edge_is_not_cross_region() {
        let resolver = resolver();
        let mut assembler = ConnectionAssembler::new();
        assembler.add_direction(10, 11);
        let assembly = assembler.assemble(true, &resolver);
        match &assembly.warnings[0] {
            ConnectivityWarning::HalfEdge { cross_region, .. } => assert!(!cross_region),
            other => panic!("unexpected warning: {other}"),
        }
    }
}
