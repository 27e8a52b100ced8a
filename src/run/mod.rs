use crate::cli;
use crate::conflict::reduce::Method;
use crate::conflict::ConflictMatrix;
use crate::matrix::MutationMatrix;
use crate::phylogeny::build::{reconstruct, Builder, Reconstruction};
use crate::phylogeny::PhylogenyExportFormat;

use color_eyre::eyre::{Report, Result, WrapErr};
use itertools::Itertools;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

// ----------------------------------------------------------------------------
// Summary

/// Machine-readable record of a reconstruction run.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Summary {
    pub args: cli::run::Args,
    pub cells: usize,
    pub mutations: usize,
    pub builder: Builder,
    pub method: Option<Method>,
    pub removed: Vec<usize>,
    pub order: Vec<usize>,
    pub perfect: bool,
    pub nodes: usize,
    pub leaves: usize,
}

impl Summary {
    pub fn new(
        args: &cli::run::Args,
        matrix: &MutationMatrix,
        reconstruction: &Reconstruction,
    ) -> Self {
        Summary {
            args: args.clone(),
            cells: matrix.cells,
            mutations: matrix.mutations,
            builder: reconstruction.builder,
            method: reconstruction.method,
            removed: reconstruction.removed.clone(),
            order: reconstruction.order().to_vec(),
            perfect: reconstruction.phylogeny.is_perfect(),
            nodes: reconstruction.phylogeny.num_nodes(),
            leaves: reconstruction.phylogeny.get_leaves().len(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), Report> {
        let mut file = File::create(path)
            .wrap_err_with(|| format!("Failed to create file: {path:?}"))?;
        let output = serde_json::to_string_pretty(self)
            .wrap_err_with(|| format!("Failed to parse summary: {self:?}"))?;
        file.write_all(format!("{output}\n").as_bytes())
            .wrap_err_with(|| format!("Failed to write file: {path:?}"))?;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Threads

/// Configure the global rayon pool, capped at the threads the system has.
pub fn set_threads(threads: usize) -> Result<(), Report> {
    // check how many threads are available on the system
    let default_thread_pool = rayon::ThreadPoolBuilder::new()
        .build()
        .wrap_err("Failed to build thread pool.")?;
    let available_threads = default_thread_pool.current_num_threads();
    info!("Number of threads available: {available_threads}");

    let mut num_threads = threads.max(1);
    if num_threads > available_threads {
        warn!("--threads {num_threads} is greater than the available threads.");
        num_threads = available_threads;
    }

    info!("Using {} thread(s).", num_threads);
    let result = rayon::ThreadPoolBuilder::new().num_threads(num_threads).build_global();

    // the global pool can only be built once per process, later calls
    // (ex. from several tests) keep the first configuration
    if result.is_err() {
        warn!("Failed to build global thread pool.");
    }

    Ok(())
}

// ----------------------------------------------------------------------------
// Run

/// Reconstruct a phylogeny from a mutation matrix file and export it.
pub fn run(args: &cli::run::Args) -> Result<Reconstruction, Report> {
    set_threads(args.threads)?;

    info!("Loading mutation matrix: {:?}", args.input);
    let matrix = MutationMatrix::read(&args.input)?;

    let reconstruction = reconstruct(&matrix, args.builder, args.method)?;
    debug!("Reconstruction:\n{}", reconstruction.pretty_print());

    if reconstruction.removed.is_empty() {
        info!("Perfect phylogeny found!");
    } else {
        info!(
            "Conflicts present, removed {} mutations: {}",
            reconstruction.num_removed(),
            reconstruction.removed.iter().join(", ")
        );
    }
    if !reconstruction.phylogeny.is_perfect() {
        warn!("Phylogeny is not perfect, some mutations label more than one node.");
    }

    let format = match args.format {
        Some(format) => format,
        None => PhylogenyExportFormat::from_path(&args.output)?,
    };
    reconstruction.phylogeny.export(&args.output, format)?;

    if let Some(path) = &args.summary {
        info!("Exporting summary: {path:?}");
        Summary::new(args, &matrix, &reconstruction).write(path)?;
    }

    Ok(reconstruction)
}

/// Compute the pairwise conflict matrix of a mutation matrix file and write it as a table.
pub fn conflicts(args: &cli::conflicts::Args) -> Result<ConflictMatrix, Report> {
    set_threads(args.threads)?;

    info!("Loading mutation matrix: {:?}", args.input);
    let matrix = MutationMatrix::read(&args.input)?;

    let conflicts = ConflictMatrix::from_matrix(&matrix);
    info!(
        "Found {} conflicting pairs among {} mutations.",
        conflicts.total() / 2,
        matrix.mutations
    );

    let labels = (0..matrix.mutations).collect_vec();
    info!("Exporting conflict matrix: {:?}", args.output);
    conflicts.to_table(&labels)?.write(&args.output)?;

    Ok(conflicts)
}
