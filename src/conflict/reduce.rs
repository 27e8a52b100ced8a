use crate::conflict::ConflictMatrix;
use crate::error::Error;
use crate::matrix::MutationMatrix;
use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{EnumIter, IntoEnumIterator};

// ----------------------------------------------------------------------------
// Reduction Method

/// Greedy strategy used to pick the next mutation to remove.
#[derive(Clone, Copy, Debug, Default, Deserialize, EnumIter, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Remove the mutation with the most conflicts, ties go to the lowest index.
    #[default]
    Maximum,
    /// Sort once by conflicts, then remove the first mutation that breaks the
    /// descending order. Faster in practice, but not guaranteed to remove the
    /// mutation with the most conflicts on every iteration.
    Sort,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Method::Maximum => "maximum",
            Method::Sort => "sort",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Method {
    type Err = Report;

    fn from_str(name: &str) -> Result<Self, Report> {
        let method = match name {
            "maximum" => Method::Maximum,
            "sort" => Method::Sort,
            _ => Err(Error::InvalidStrategy {
                kind: "reduction".to_string(),
                name: name.to_string(),
                choices: Method::iter().join(", "),
            })
            .suggestion("Use 'maximum' for the exact greedy search or 'sort' for the faster one.")?,
        };

        Ok(method)
    }
}

impl Method {
    /// Index of the next mutation to remove, or None when the matrix is conflict-free.
    pub fn select(&self, conflicts: &ConflictMatrix) -> Option<usize> {
        let sums = conflicts.row_sums();
        if sums.is_empty() {
            return None;
        }

        let i = match self {
            Method::Maximum => {
                let mut i = 0;
                for (j, sum) in sums.iter().enumerate().skip(1) {
                    if *sum > sums[i] {
                        i = j;
                    }
                }
                i
            }
            // first break in the descending order, otherwise the last index
            Method::Sort => {
                let mut i = 0;
                while i + 1 < sums.len() && sums[i] <= sums[i + 1] {
                    i += 1;
                }
                i
            }
        };

        (sums[i] > 0).then_some(i)
    }

    /// Initial working order of the mutations before any removal.
    fn initial_order(&self, conflicts: &ConflictMatrix) -> Vec<usize> {
        match self {
            Method::Maximum => (0..conflicts.len()).collect_vec(),
            Method::Sort => {
                let sums = conflicts.row_sums();
                (0..conflicts.len())
                    .sorted_by(|a, b| sums[*b].cmp(&sums[*a]))
                    .collect_vec()
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Reduction

/// Result of removing mutations until no conflicts remain.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Reduction {
    /// Input matrix restricted to the remaining mutations, columns in `order`.
    pub matrix: MutationMatrix,
    /// Remaining conflict matrix, always conflict-free.
    pub conflicts: ConflictMatrix,
    /// Original mutation identifier of each remaining column.
    pub order: Vec<usize>,
    /// Original identifiers of the removed mutations, in removal order.
    pub removed: Vec<usize>,
    pub method: Method,
}

impl Reduction {
    pub fn num_removed(&self) -> usize {
        self.removed.len()
    }
}

/// Greedily remove mutations from `matrix` until `conflicts` is empty.
pub fn reduce(
    matrix: &MutationMatrix,
    conflicts: ConflictMatrix,
    method: Method,
) -> Result<Reduction, Report> {
    if conflicts.len() != matrix.mutations {
        return Err(eyre!(
            "Conflict matrix size ({}) does not match the number of mutations ({}).",
            conflicts.len(),
            matrix.mutations
        ));
    }

    let mut order = method.initial_order(&conflicts);
    let mut conflicts = conflicts.permute(&order)?;
    let mut removed = Vec::new();

    while let Some(i) = method.select(&conflicts) {
        let mutation = order.remove(i);
        debug!(
            "Removing mutation {mutation} with {} conflicts.",
            conflicts.row_sum(i)
        );
        conflicts.remove(i);
        removed.push(mutation);
    }

    info!(
        "Removed {} of {} mutations with the {method} method.",
        removed.len(),
        matrix.mutations
    );

    let reduction = Reduction {
        matrix: matrix.select_columns(&order),
        conflicts,
        order,
        removed,
        method,
    };

    Ok(reduction)
}
