use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Simulate a random mutation matrix.
///
/// Cells are placed on a random perfect phylogeny, then each entry
/// is flipped with probability --noise.
#[derive(Clone, Debug, Deserialize, Parser, Serialize)]
#[clap(verbatim_doc_comment)]
pub struct Args {
    /// Number of cells (rows).
    #[clap(short = 'c', long, default_value_t = Args::default().cells)]
    pub cells: usize,

    /// Number of mutations (columns).
    #[clap(short = 'm', long, default_value_t = Args::default().mutations)]
    pub mutations: usize,

    /// Probability of flipping each entry after simulation.
    ///
    /// 0 guarantees a perfect phylogeny.
    #[clap(short = 'n', long, default_value_t = Args::default().noise)]
    pub noise: f64,

    /// Random seed.
    ///
    /// If not provided, will be random.
    #[clap(short = 's', long)]
    pub seed: Option<u64>,

    /// Output mutation matrix.
    #[clap(required = true)]
    pub output: PathBuf,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            cells: 25,
            mutations: 25,
            noise: 0.0,
            seed: None,
            output: PathBuf::new(),
        }
    }
}
