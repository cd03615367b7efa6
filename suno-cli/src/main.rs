use std::process;

use clap::Parser;
use tracing::{Level, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

mod batch;
mod cli;
mod commands;
mod config;
mod convert;
mod error;
mod filename;
mod pipeline;
mod tags;
#[cfg(test)]
mod testutil;

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = commands::dispatch(args).await {
        let code = e.exit_code();
        if e.is_interrupted() {
            error!("cancelled");
        } else {
            eprintln!("Error: {}", error::describe(&e));
        }
        process::exit(code);
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_level(verbose))
        .init();
}
