//! Runs the requested modes against a store.
//!
//! A run plans the modes, checks that every prerequisite is either
//! scheduled or already loaded, reads the prerequisites that are not part of
//! the run back into the resolver, and then builds and writes each mode in
//! its own transaction.

mod modes;

pub use modes::{plan, Mode};

use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{info, info_span};

use crate::builder;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::resolver::Resolver;
use crate::ui::{Phase, Ui};
use crate::writer::reader::hydrate;
use crate::writer::Store;

/// What one mode wrote
#[derive(Debug, Clone)]
pub struct ModeReport {
    pub mode: Mode,
    pub rows: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub modes: Vec<ModeReport>,
}

impl RunSummary {
    pub fn total_rows(&self) -> u64 {
        self.modes.iter().map(|m| m.rows).sum()
    }
}

/// Fail on the first scheduled mode with a prerequisite that is neither
/// scheduled nor loaded. With `drop` set the store counts as empty.
fn check_prerequisites(order: &[Mode], store: &Store, drop: bool) -> Result<()> {
    for mode in order {
        for prerequisite in mode.prerequisites() {
            if order.contains(prerequisite) {
                continue;
            }
            if drop || !store.has_rows(prerequisite.primary_table())? {
                return Err(PipelineError::MissingDependency {
                    mode: *mode,
                    missing: *prerequisite,
                });
            }
        }
    }
    Ok(())
}

/// Unscheduled modes whose data the scheduled ones need, directly or not
fn modes_to_hydrate(order: &[Mode]) -> Vec<Mode> {
    let mut needed = BTreeSet::new();
    let mut stack: Vec<Mode> = order.to_vec();
    while let Some(mode) = stack.pop() {
        for prerequisite in mode.prerequisites() {
            if needed.insert(*prerequisite) {
                stack.push(*prerequisite);
            }
        }
    }
    needed.into_iter().filter(|m| !order.contains(m)).collect()
}

/// Load `requested` into `store`
pub fn run(
    config: &PipelineConfig,
    store: &mut Store,
    requested: &[Mode],
    ui: &mut impl Ui,
) -> Result<RunSummary> {
    ui.set_phase(Phase::Checking);
    let order = plan(requested)?;
    check_prerequisites(&order, store, config.drop)?;
    let names: Vec<&str> = order.iter().map(|m| m.name()).collect();
    info!("Running modes: {}", names.join(", "));

    if config.drop {
        ui.log("Dropping and recreating all tables");
        store.drop_and_recreate()?;
    }

    let mut resolver = Resolver::new();
    let hydrated = modes_to_hydrate(&order);
    if !hydrated.is_empty() {
        ui.set_phase(Phase::Hydrating);
        for mode in &hydrated {
            ui.set_info(format!("Reading {} from the database", mode));
            hydrate(store.connection(), *mode, &mut resolver)?;
        }
    }

    ui.set_phase(Phase::Loading);
    ui.schedule(&order);
    let mut summary = RunSummary::default();
    for mode in &order {
        let _span = info_span!("mode", mode = mode.name()).entered();
        ui.mode_started(*mode);

        let start = Instant::now();
        let writer = store.begin()?;
        let batch = builder::build(*mode, config, &mut resolver, writer.connection())?;
        let rows = batch.persist(&writer)?;
        writer.commit()?;

        let report = ModeReport {
            mode: *mode,
            rows,
            elapsed: start.elapsed(),
        };
        info!(
            "Mode {} wrote {} rows in {:.1}s",
            mode,
            rows,
            report.elapsed.as_secs_f64()
        );
        ui.mode_finished(&report);
        summary.modes.push(report);
    }

    ui.set_phase(Phase::Optimizing);
    store.optimize()?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::SilentUi;

    #[test]
    fn test_missing_prerequisite_fails_before_writing() {
        let mut store = Store::open_in_memory().unwrap();
        let config = PipelineConfig::new("/nonexistent");

        let err = run(&config, &mut store, &[Mode::Items], &mut SilentUi::new()).unwrap_err();
        match err {
            PipelineError::MissingDependency { mode, missing } => {
                assert_eq!(mode, Mode::Items);
                assert_eq!(missing, Mode::Lang);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_hydrate_transitive_prerequisites() {
        let modes = modes_to_hydrate(&[Mode::Bps]);
        assert_eq!(modes, [Mode::Lang, Mode::Base, Mode::Attrs, Mode::Items]);

        let modes = modes_to_hydrate(&[Mode::Lang, Mode::Base]);
        assert!(modes.is_empty());
    }

    #[test]
    fn test_drop_ignores_stored_prerequisites() {
        let mut store = Store::open_in_memory().unwrap();
        let sql = "INSERT INTO localised_strings (id, source) VALUES (1, 'a')";
        store.connection().execute(sql, []).unwrap();

        let mut config = PipelineConfig::new("/nonexistent");
        config.drop = true;
        let err = run(&config, &mut store, &[Mode::Base], &mut SilentUi::new()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingDependency { .. }));

        // Nothing was dropped
        assert_eq!(store.row_count("localised_strings").unwrap(), 1);
    }
}
