use anyhow::Result;
use clap::Parser;

mod analytics;
mod cli;
mod discover;
mod loader;
mod merge;
mod pool;
mod report;
mod schema;
mod util;
mod validate;
mod workflow;

use cli::{Command, RootArgs};

fn main() -> Result<()> {
    init_tracing();
    let args = RootArgs::parse();
    match args.command {
        Command::Merge(args) => workflow::run_merge(&args),
        Command::Validate(args) => exit_on_errors(workflow::run_validate(&args)?),
        Command::Run(args) => exit_on_errors(workflow::run_pipeline(&args)?),
    }
}

/// Any error-level finding fails the process; warnings never do.
fn exit_on_errors(report: validate::ValidationReport) -> Result<()> {
    if report.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
