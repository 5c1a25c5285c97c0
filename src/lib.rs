pub mod cli;
pub mod commands;
pub mod formats;
pub mod logging;
pub mod model;
pub mod runtime;
pub mod segmentation;
pub mod workflow;

pub fn run_cli() -> Result<(), String> {
    cli::run_cli()
}
