use crate::conflict::reduce::{reduce, Method};
use crate::conflict::ConflictMatrix;
use crate::error::Error;
use crate::matrix::MutationMatrix;
use crate::phylogeny::{Node, Phylogeny};
use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use indoc::formatdoc;
use itertools::Itertools;
use log::{debug, info, warn};
use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{EnumIter, IntoEnumIterator};

// ----------------------------------------------------------------------------
// Builder

/// Tree construction strategy.
#[derive(Clone, Copy, Debug, Default, Deserialize, EnumIter, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Builder {
    /// Remove conflicting mutations with a [Method] first, then build.
    #[default]
    Precomputed,
    /// Detect conflicts while building, removing a mutation as soon as it would
    /// need a second node.
    Online,
    /// Assumes the matrix admits a perfect phylogeny. Does not detect or report
    /// violations, a conflicting matrix silently produces an inconsistent tree.
    Naive,
}

impl std::fmt::Display for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Builder::Precomputed => "precomputed",
            Builder::Online => "online",
            Builder::Naive => "naive",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Builder {
    type Err = Report;

    fn from_str(name: &str) -> Result<Self, Report> {
        let builder = match name {
            "precomputed" => Builder::Precomputed,
            "online" | "fast" => Builder::Online,
            "naive" => Builder::Naive,
            _ => Err(Error::InvalidStrategy {
                kind: "builder".to_string(),
                name: name.to_string(),
                choices: Builder::iter().join(", "),
            })
            .suggestion("The naive builder is only safe for perfect phylogenies.")?,
        };

        Ok(builder)
    }
}

// ----------------------------------------------------------------------------
// Build Context

/// Working state of the online builder.
///
/// Indexed by working mutation label. `nodes` is a lookup of where each mutation
/// currently sits in the tree, it does not own the nodes.
#[derive(Clone, Debug, Default)]
pub struct BuildContext {
    pub nodes: Vec<Option<NodeIndex>>,
    pub conflicting: Vec<bool>,
    /// Working labels of removed mutations, in removal order.
    pub removed: Vec<usize>,
}

impl BuildContext {
    pub fn new(mutations: usize) -> Self {
        BuildContext {
            nodes: vec![None; mutations],
            conflicting: vec![false; mutations],
            removed: Vec::new(),
        }
    }

    /// Insert a cell's path into the phylogeny, removing any mutation that would
    /// need a second node.
    ///
    /// `row` must be in the same working order as the phylogeny labels.
    pub fn insert(
        &mut self,
        phylogeny: &mut Phylogeny,
        cell: usize,
        row: &[bool],
    ) -> Result<NodeIndex, Report> {
        let mut node = phylogeny.root;

        for mutation in row.iter().positions(|present| *present) {
            if self.conflicting[mutation] {
                continue;
            }
            if let Some(child) = phylogeny.get_child(node, mutation) {
                node = child;
                continue;
            }
            match self.nodes[mutation] {
                // placed elsewhere already, this mutation is a conflict
                Some(existing) => {
                    debug!("Conflict found for working mutation {mutation} at cell C{cell}.");
                    phylogeny.remove(existing, false)?;
                    self.nodes[mutation] = None;
                    self.conflicting[mutation] = true;
                    self.removed.push(mutation);
                }
                None => {
                    node = phylogeny.add_child(node, Node::Mutation(mutation));
                    self.nodes[mutation] = Some(node);
                }
            }
        }

        Ok(phylogeny.add_child(node, Node::Leaf(cell)))
    }
}

// ----------------------------------------------------------------------------
// Reconstruction

/// A phylogeny and the mutations that had to be removed to build it.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Reconstruction {
    pub phylogeny: Phylogeny,
    /// Original identifiers of the removed mutations, in removal order.
    pub removed: Vec<usize>,
    pub builder: Builder,
    /// Reduction method, only used by the precomputed builder.
    pub method: Option<Method>,
}

impl Reconstruction {
    pub fn num_removed(&self) -> usize {
        self.removed.len()
    }

    /// Working label to original mutation identifier.
    pub fn order(&self) -> &[usize] {
        &self.phylogeny.order
    }

    pub fn pretty_print(&self) -> String {
        let method = self.method.map(|m| m.to_string()).unwrap_or_else(|| "none".to_string());
        formatdoc!(
            "builder: {}
            method: {method}
            nodes: {}
            leaves: {}
            removed: {} [{}]",
            self.builder,
            self.phylogeny.num_nodes(),
            self.phylogeny.get_leaves().len(),
            self.num_removed(),
            self.removed.iter().join(", "),
        )
    }
}

/// Build a phylogeny from a mutation matrix with the requested strategy.
///
/// `method` picks the conflict reduction for [Builder::Precomputed] and is ignored
/// by the other builders.
pub fn reconstruct(
    matrix: &MutationMatrix,
    builder: Builder,
    method: Method,
) -> Result<Reconstruction, Report> {
    info!(
        "Reconstructing phylogeny of {} cells and {} mutations with the {builder} builder.",
        matrix.cells, matrix.mutations
    );

    let reconstruction = match builder {
        Builder::Precomputed => {
            let conflicts = ConflictMatrix::from_matrix(matrix);
            debug!("Conflict matrix:\n{conflicts}");
            let reduction = reduce(matrix, conflicts, method)?;
            debug!("Conflict-free matrix:\n{}", reduction.matrix);
            let phylogeny = precomputed(&reduction.matrix, &reduction.order)?;
            Reconstruction {
                phylogeny,
                removed: reduction.removed,
                builder,
                method: Some(method),
            }
        }
        Builder::Online => {
            let (phylogeny, removed) = online(matrix)?;
            Reconstruction {
                phylogeny,
                removed,
                builder,
                method: None,
            }
        }
        Builder::Naive => Reconstruction {
            phylogeny: naive(matrix),
            removed: Vec::new(),
            builder,
            method: None,
        },
    };

    Ok(reconstruction)
}

/// Build from a conflict-free matrix, whose column `j` is original mutation `order[j]`.
pub fn precomputed(matrix: &MutationMatrix, order: &[usize]) -> Result<Phylogeny, Report> {
    if order.len() != matrix.mutations {
        return Err(eyre!(
            "Mutation order has {} entries but the matrix has {} mutations.",
            order.len(),
            matrix.mutations
        ));
    }

    let phylogeny = insert_all(matrix, order);
    if !phylogeny.is_perfect() {
        warn!(
            "Input to the precomputed builder was not conflict-free, \
            some mutations label more than one node."
        );
    }

    Ok(phylogeny)
}

/// Build from a possibly conflicting matrix, removing conflicts as they are found.
///
/// Returns the phylogeny and the original identifiers of the removed mutations.
/// Children of a removed node are re-attached to its parent, so every cell keeps
/// its leaf. This is a greedy pass, the removed set is not guaranteed to be minimal.
pub fn online(matrix: &MutationMatrix) -> Result<(Phylogeny, Vec<usize>), Report> {
    let frequency_order = matrix.frequency_order();
    let sorted = matrix.select_columns(&frequency_order);
    let mut phylogeny = Phylogeny::new(frequency_order);
    let mut context = BuildContext::new(sorted.mutations);

    for (cell, row) in sorted.rows().enumerate() {
        context.insert(&mut phylogeny, cell, row)?;
    }

    let removed = context
        .removed
        .iter()
        .map(|mutation| {
            phylogeny
                .original(*mutation)
                .ok_or_else(|| eyre!("Mutation {mutation} is missing from the order."))
        })
        .collect::<Result<Vec<_>, Report>>()?;

    Ok((phylogeny, removed))
}

/// Build with no conflict handling at all.
///
/// Assumes the matrix admits a perfect phylogeny. It does not detect or report
/// violations: on a conflicting matrix a mutation silently ends up on several nodes.
pub fn naive(matrix: &MutationMatrix) -> Phylogeny {
    let order = (0..matrix.mutations).collect_vec();
    insert_all(matrix, &order)
}

/// Sort columns by frequency and insert every cell's path, merging shared prefixes.
fn insert_all(matrix: &MutationMatrix, order: &[usize]) -> Phylogeny {
    let frequency_order = matrix.frequency_order();
    let sorted = matrix.select_columns(&frequency_order);
    let order = frequency_order.iter().map(|j| order[*j]).collect_vec();
    let mut phylogeny = Phylogeny::new(order);

    for (cell, row) in sorted.rows().enumerate() {
        let mut node = phylogeny.root;
        for mutation in row.iter().positions(|present| *present) {
            node = phylogeny.get_or_add_child(node, mutation);
        }
        phylogeny.add_child(node, Node::Leaf(cell));
    }

    phylogeny
}
