use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Write the pairwise conflict matrix of a mutation matrix.
#[derive(Clone, Debug, Deserialize, Parser, Serialize)]
#[clap(verbatim_doc_comment)]
pub struct Args {
    /// Input mutation matrix.
    #[clap(required = true)]
    pub input: PathBuf,

    /// Output table.
    ///
    /// The delimiter is chosen from the extension (.tsv or .csv).
    #[clap(required = true)]
    pub output: PathBuf,

    /// Number of CPU threads to use.
    #[clap(short = 't', long, default_value_t = Args::default().threads)]
    pub threads: usize,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            input: PathBuf::new(),
            output: PathBuf::new(),
            threads: 1,
        }
    }
}
