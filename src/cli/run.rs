use crate::conflict::reduce::Method;
use crate::phylogeny::build::Builder;
use crate::phylogeny::PhylogenyExportFormat;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reconstruct a phylogeny from a mutation matrix.
///
/// The matrix is a text file: the cell count, the mutation count,
/// then one row of 0/1 values per cell.
#[derive(Clone, Debug, Deserialize, Parser, Serialize)]
#[clap(verbatim_doc_comment)]
pub struct Args {
    /// Input mutation matrix.
    #[clap(required = true)]
    pub input: PathBuf,

    /// Output phylogeny.
    ///
    /// The format is chosen from the extension (.dot, .json, .nwk) unless --format is given.
    #[clap(required = true)]
    pub output: PathBuf,

    /// Conflict reduction method: maximum or sort.
    #[clap(default_value_t = Args::default().method)]
    pub method: Method,

    /// Tree construction strategy: precomputed, online or naive.
    #[clap(short = 'b', long, default_value_t = Args::default().builder)]
    pub builder: Builder,

    /// Output format: dot, json or newick.
    #[clap(short = 'f', long)]
    pub format: Option<PhylogenyExportFormat>,

    /// Write a JSON summary of the run to this path.
    #[clap(short = 's', long)]
    pub summary: Option<PathBuf>,

    /// Number of CPU threads to use.
    #[clap(short = 't', long, default_value_t = Args::default().threads)]
    pub threads: usize,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            input: PathBuf::new(),
            output: PathBuf::new(),
            method: Method::default(),
            builder: Builder::default(),
            format: None,
            summary: None,
            threads: 1,
        }
    }
}
