pub mod reduce;

use crate::matrix::MutationMatrix;
use crate::utils::table::Table;
use color_eyre::eyre::{eyre, Report, Result};
use itertools::Itertools;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Conflict Matrix
// ----------------------------------------------------------------------------

/// Pairwise incompatibility between mutations.
///
/// Square, symmetric and zero on the diagonal: entry `(m1, m2)` is set when the two
/// mutations fail the three-gamete test. Rows and columns can be permuted or removed
/// by the reducers, the matrix is never updated from the input after creation.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ConflictMatrix {
    data: Vec<Vec<bool>>,
}

impl ConflictMatrix {
    /// Create a `size` x `size` matrix with no conflicts.
    pub fn new(size: usize) -> Self {
        ConflictMatrix {
            data: vec![vec![false; size]; size],
        }
    }

    /// Run the three-gamete test on every unordered pair of mutations.
    ///
    /// Pairs are tested in parallel on the global rayon pool, each test only reads
    /// the input so the result is the same as a sequential scan.
    pub fn from_matrix(matrix: &MutationMatrix) -> Self {
        let mut conflicts = ConflictMatrix::new(matrix.mutations);

        let pairs = (0..matrix.mutations)
            .flat_map(|m1| (0..m1).map(move |m2| (m1, m2)))
            .collect_vec();

        let incompatible: Vec<(usize, usize)> = pairs
            .into_par_iter()
            .filter(|(m1, m2)| is_incompatible(matrix, *m1, *m2))
            .collect();

        debug!(
            "Found {} incompatible pairs among {} mutations.",
            incompatible.len(),
            matrix.mutations
        );

        for (m1, m2) in incompatible {
            conflicts.data[m1][m2] = true;
            conflicts.data[m2][m1] = true;
        }

        conflicts
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, m1: usize, m2: usize) -> bool {
        self.data[m1][m2]
    }

    /// Number of mutations that conflict with mutation `i`.
    pub fn row_sum(&self, i: usize) -> usize {
        self.data[i].iter().filter(|c| **c).count()
    }

    pub fn row_sums(&self) -> Vec<usize> {
        (0..self.len()).map(|i| self.row_sum(i)).collect_vec()
    }

    /// Sum of all entries, each conflicting pair is counted twice.
    pub fn total(&self) -> usize {
        self.row_sums().into_iter().sum()
    }

    pub fn is_conflict_free(&self) -> bool {
        self.data.iter().all(|row| row.iter().all(|c| !c))
    }

    /// Indices of the mutations that conflict with mutation `i`.
    pub fn conflicts_of(&self, i: usize) -> Vec<usize> {
        self.data[i].iter().positions(|c| *c).collect_vec()
    }

    /// Conflicting pairs `(m1, m2)` with `m1 < m2`.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        (0..self.len())
            .flat_map(|m1| self.conflicts_of(m1).into_iter().map(move |m2| (m1, m2)))
            .filter(|(m1, m2)| m1 < m2)
            .collect_vec()
    }

    /// Returns a new matrix where row and column `i` are `order[i]` of this one.
    pub fn permute(&self, order: &[usize]) -> Result<ConflictMatrix, Report> {
        if order.len() != self.len() || !order.iter().all_unique() {
            return Err(eyre!(
                "Order {order:?} is not a permutation of {} mutations.",
                self.len()
            ));
        }
        let data = order
            .iter()
            .map(|i| order.iter().map(|j| self.data[*i][*j]).collect_vec())
            .collect_vec();

        Ok(ConflictMatrix { data })
    }

    /// Delete row and column `i`.
    pub fn remove(&mut self, i: usize) {
        self.data.remove(i);
        for row in self.data.iter_mut() {
            row.remove(i);
        }
    }

    /// Convert to a table, labelling rows and columns with `labels`.
    pub fn to_table(&self, labels: &[usize]) -> Result<Table, Report> {
        if labels.len() != self.len() {
            return Err(eyre!(
                "Expected {} labels for the conflict matrix, found {}.",
                self.len(),
                labels.len()
            ));
        }

        let mut table = Table::new();
        table.headers = std::iter::once("mutation".to_string())
            .chain(labels.iter().map(|m| m.to_string()))
            .collect_vec();

        table.rows = self
            .data
            .iter()
            .zip(labels.iter())
            .map(|(row, label)| {
                std::iter::once(label.to_string())
                    .chain(row.iter().map(|c| u8::from(*c).to_string()))
                    .collect_vec()
            })
            .collect_vec();

        Ok(table)
    }
}

impl std::fmt::Display for ConflictMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for row in &self.data {
            writeln!(f, "{}", row.iter().map(|c| u8::from(*c)).join(" "))?;
        }
        Ok(())
    }
}

/// Three-gamete test for a pair of mutation columns.
///
/// Returns true when some cell carries both mutations, some cell carries only
/// `m1`, and some cell carries only `m2`.
pub fn is_incompatible(matrix: &MutationMatrix, m1: usize, m2: usize) -> bool {
    let mut has_11 = false;
    let mut has_10 = false;
    let mut has_01 = false;

    for row in matrix.rows() {
        match (row[m1], row[m2]) {
            (true, true) => has_11 = true,
            (true, false) => has_10 = true,
            (false, true) => has_01 = true,
            (false, false) => continue,
        }
        if has_11 && has_10 && has_01 {
            return true;
        }
    }

    false
}
