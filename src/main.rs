mod cli;
mod commands;
mod config;
mod converter;
mod coverage;
mod enhancer;
mod guidance;
mod model;
mod parser;
mod segmenter;
mod storage;
mod util;
mod validator;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::config::PipelineConfig;

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = PipelineConfig::resolve(&cli.pipeline)?;

    match cli.command {
        Commands::Parse(args) => commands::parse::run(&config, args),
        Commands::Segment(args) => commands::segment::run(&config, args),
        Commands::Convert(args) => commands::convert::run(&config, args),
        Commands::Enhance(args) => commands::enhance::run(&config, args),
        Commands::Validate(args) => commands::validate::run(&config, args),
        Commands::Coverage(args) => commands::coverage::run(&config, args),
        Commands::RunAll(args) => commands::run_all::run(&config, args),
        Commands::List(args) => commands::list::run(&config, args),
        Commands::Status(args) => commands::status::run(&config, args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
