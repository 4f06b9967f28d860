use anyhow::{bail, Context, Result};
use echoes_sde_to_sqlite::{
    cli::{Cli, Commands},
    config::{default_database_path, PipelineConfig},
    filter::select_modes,
    pipeline::{self, plan, Mode, RunSummary},
    schema::table_names,
    ui::{Phase, SilentUi, UiApp},
    writer::Store,
};
use std::time::Instant;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    // ECHOES_LOG_FORMAT=json switches to machine-readable output
    let log_format = std::env::var("ECHOES_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_env("ECHOES_LOG")
        .unwrap_or_else(|_| "echoes_sde_to_sqlite=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn summary_text(summary: &RunSummary) -> String {
    summary
        .modes
        .iter()
        .map(|m| {
            let secs = m.elapsed.as_secs_f64();
            format!("{:<16}{:>10} rows  {:>6.1}s", m.mode.name(), m.rows, secs)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // The terminal UI owns the screen, so logs stay off while it runs
    if !matches!(cli.command, Commands::Load { tui: true, .. }) {
        init_tracing();
    }

    match cli.command {
        Commands::Load {
            input_dir,
            output_db,
            mode,
            skip,
            drop,
            no_synthesize,
            batch_size,
            languages,
            tui,
        } => {
            let start = Instant::now();
            let modes = select_modes(mode, skip)?;

            let output_db = match output_db.or_else(default_database_path) {
                Some(path) => path,
                None => bail!("No output database given and no user data directory found"),
            };

            let mut config = PipelineConfig::new(&input_dir);
            config.drop = drop;
            config.synthesize_reverse_edges = !no_synthesize;
            config.batch_size = batch_size;
            if let Some(languages) = languages {
                config.languages = languages;
            }

            for (mode, label, path) in config.layout.missing(&modes) {
                let path = path.display();
                warn!("{mode}: input '{label}' not found at {path}");
            }

            let mut store = Store::open(&output_db)
                .with_context(|| format!("Failed to open database {:?}", output_db))?
                .with_batch_size(config.batch_size);

            let summary = if tui {
                let mut ui = UiApp::new(output_db.display().to_string())?;
                match pipeline::run(&config, &mut store, &modes, &mut ui) {
                    Ok(summary) => {
                        ui.finish(Phase::Complete, &summary_text(&summary))?;
                        summary
                    }
                    Err(e) => {
                        ui.finish(Phase::Failed, &e.to_string())?;
                        return Err(e).with_context(|| format!("Loading {:?} failed", input_dir));
                    }
                }
            } else {
                pipeline::run(&config, &mut store, &modes, &mut SilentUi::new())
                    .with_context(|| format!("Loading {:?} failed", input_dir))?
            };

            println!("{}", summary_text(&summary));
            println!(
                "\nLoaded {:?} ({} rows) from {:?} in {:.1}s",
                output_db,
                summary.total_rows(),
                input_dir,
                start.elapsed().as_secs_f64()
            );
        }

        Commands::Check { input_dir, mode } => {
            let modes = select_modes(mode, None)?;
            let config = PipelineConfig::new(&input_dir);
            let missing = config.layout.missing(&modes);

            if missing.is_empty() {
                println!("All inputs found under {:?}", input_dir);
            } else {
                println!("Missing inputs:\n");
                for (mode, label, path) in &missing {
                    println!("  {:<16}{:<22}{}", mode.name(), label, path.display());
                }
                bail!("{} inputs missing under {:?}", missing.len(), input_dir);
            }
        }

        Commands::ListModes => {
            println!("Modes in run order:\n");
            for mode in plan(&Mode::ALL)? {
                println!("  {:<16}{}", mode.name(), mode.description());
            }
        }

        Commands::ListTables => {
            println!("Available tables:\n");
            for name in table_names() {
                println!("  {}", name);
            }
        }
    }

    Ok(())
}
