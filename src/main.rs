use clap::Parser;
use color_eyre::eyre::{Report, Result};
use perfect_phylogeny::cli::verbosity::Verbosity;
use perfect_phylogeny::cli::{Cli, Command};
use perfect_phylogeny::{run, simulate};
use std::env;

fn setup(verbosity: Verbosity) -> Result<(), Report> {
    color_eyre::install()?;

    // Set default logging level if RUST_LOG is not set.
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", verbosity.to_string())
    }

    env_logger::init();

    Ok(())
}

fn main() -> Result<(), Report> {
    // Parse CLI parameters
    let args = Cli::parse();

    // Misc setup actions like logging
    setup(args.verbosity)?;

    match args.command {
        Command::Run(args) => {
            run::run(&args)?;
        }
        Command::Conflicts(args) => {
            run::conflicts(&args)?;
        }
        Command::Simulate(args) => {
            simulate::simulate(&args)?;
        }
    }

    Ok(())
}
