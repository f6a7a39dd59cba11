use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod archive;
mod assets;
mod cli;
mod config;
mod document;
mod error;
mod expand;
mod pattern;
mod references;
mod substitute;
mod util;
mod workflow;

use cli::ExportArgs;
use expand::Latexpand;
use workflow::{run_export, ExportPlan};

const LOG_ENV: &str = "LATEXPORT_LOG";

fn main() -> Result<()> {
    let args = ExportArgs::parse();
    init_tracing(args.verbose);

    let cwd = std::env::current_dir().context("resolve working directory")?;
    let plan = ExportPlan::from_args(&args, &cwd)?;
    let expander = Latexpand::from_env()?;
    run_export(&plan, &expander, args.json)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
