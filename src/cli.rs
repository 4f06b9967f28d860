use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "echoes-sde-to-sqlite")]
#[command(version, about = "Convert EVE Echoes static data to a SQLite database")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load an extracted static data tree into SQLite
    Load {
        /// Root of the extracted game data
        input_dir: PathBuf,

        /// Output SQLite database path (defaults to the user data directory)
        output_db: Option<PathBuf>,

        /// Only run these modes (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        mode: Option<Vec<String>>,

        /// Run every mode except these (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        skip: Option<Vec<String>>,

        /// Drop and recreate every table before loading
        #[arg(short, long)]
        drop: bool,

        /// Drop connections that only one system reports instead of keeping them
        #[arg(long)]
        no_synthesize: bool,

        /// Rows per insert statement batch
        #[arg(short, long, default_value_t = crate::config::DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Translations to load besides the source language (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        languages: Option<Vec<String>>,

        /// Show a terminal UI while loading
        #[arg(long)]
        tui: bool,
    },

    /// List input files the selected modes need but cannot find
    Check {
        /// Root of the extracted game data
        input_dir: PathBuf,

        /// Only check these modes (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        mode: Option<Vec<String>>,
    },

    /// List all modes in run order
    ListModes,

    /// List all table names
    ListTables,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_arguments() {
        let cli = Cli::try_parse_from([
            "echoes-sde-to-sqlite",
            "load",
            "data",
            "out.db",
            "--mode",
            "lang,base",
            "--drop",
            "--no-synthesize",
        ])
        .unwrap();

        match cli.command {
            Commands::Load {
                input_dir,
                output_db,
                mode,
                drop,
                no_synthesize,
                batch_size,
                ..
            } => {
                assert_eq!(input_dir, PathBuf::from("data"));
                assert_eq!(output_db, Some(PathBuf::from("out.db")));
                assert_eq!(mode, Some(vec!["lang".to_string(), "base".to_string()]));
                assert!(drop);
                assert!(no_synthesize);
                assert_eq!(batch_size, crate::config::DEFAULT_BATCH_SIZE);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
