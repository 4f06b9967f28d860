pub mod builder;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod graph;
pub mod parser;
pub mod pipeline;
pub mod resolver;
pub mod schema;
pub mod ui;
pub mod writer;

pub use cli::{Cli, Commands};
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{run, Mode, RunSummary};
pub use ui::{Phase, SilentUi, Ui, UiApp};
