use crate::cli;
use crate::matrix::MutationMatrix;

use color_eyre::eyre::{eyre, Report, Result};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Simulate a mutation matrix and write it to file.
pub fn simulate(args: &cli::simulate::Args) -> Result<MutationMatrix, Report> {
    if !(0.0..=1.0).contains(&args.noise) {
        return Err(eyre!("--noise must be between 0 and 1, found {}", args.noise));
    }

    let seed = match args.seed {
        Some(seed) => seed,
        None => rand::thread_rng().gen(),
    };
    info!("Using random seed: {seed}");
    let mut rng = StdRng::seed_from_u64(seed);

    let matrix = matrix(args.cells, args.mutations, args.noise, &mut rng);

    info!(
        "Exporting {} cells and {} mutations: {:?}",
        matrix.cells, matrix.mutations, args.output
    );
    matrix.write(&args.output)?;

    Ok(matrix)
}

/// Place cells on a random perfect phylogeny, then flip entries with probability `noise`.
///
/// Mutation `m` is attached below the root or below a uniformly chosen earlier
/// mutation. Each cell picks a node uniformly and carries every mutation on its
/// path to the root.
pub fn matrix(cells: usize, mutations: usize, noise: f64, rng: &mut StdRng) -> MutationMatrix {
    // parent of each mutation, None is the root
    let mut parents: Vec<Option<usize>> = Vec::with_capacity(mutations);
    for m in 0..mutations {
        let parent = rng.gen_range(0..=m);
        parents.push((parent < m).then_some(parent));
    }
    debug!("Simulated mutation parents: {parents:?}");

    let mut matrix = MutationMatrix::new(cells, mutations);
    for cell in 0..cells {
        // 0 places the cell directly below the root
        let mut node = match rng.gen_range(0..=mutations) {
            0 => None,
            n => Some(n - 1),
        };
        while let Some(m) = node {
            matrix.set(cell, m, true);
            node = parents[m];
        }
    }

    if noise > 0.0 {
        let mut flipped = 0;
        for cell in 0..cells {
            for m in 0..mutations {
                if rng.gen_bool(noise) {
                    matrix.set(cell, m, !matrix.get(cell, m));
                    flipped += 1;
                }
            }
        }
        debug!("Flipped {flipped} entries with noise {noise}.");
    }

    matrix
}
