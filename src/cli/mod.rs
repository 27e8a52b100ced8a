pub mod conflicts;
pub mod run;
pub mod simulate;
pub mod verbosity;

use crate::cli::verbosity::Verbosity;
use clap::{Parser, Subcommand};

/// Reconstruct perfect phylogenies from binary cells-by-mutations matrices.
#[derive(Debug, Parser)]
#[clap(name = "perfect-phylogeny", author, version)]
#[clap(verbatim_doc_comment)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,

    /// Set the output verbosity level.
    #[clap(short = 'v', long, global = true, default_value_t = Verbosity::default())]
    pub verbosity: Verbosity,
}

/// Reconstruct perfect phylogenies from binary cells-by-mutations matrices.
#[derive(Debug, Subcommand)]
#[clap(verbatim_doc_comment)]
pub enum Command {
    /// Reconstruct a phylogeny from a mutation matrix.
    Run(run::Args),

    /// Write the pairwise conflict matrix of a mutation matrix.
    Conflicts(conflicts::Args),

    /// Simulate a random mutation matrix.
    Simulate(simulate::Args),
}
