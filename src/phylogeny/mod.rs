pub mod build;

use crate::utils;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
use log::{debug, info};
use petgraph::dot::{Config, Dot};
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::Dfs;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

// ----------------------------------------------------------------------------
// Export Format

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhylogenyExportFormat {
    Dot,
    Json,
    Newick,
}

impl PhylogenyExportFormat {
    pub fn extension(&self) -> String {
        match self {
            PhylogenyExportFormat::Dot => String::from("dot"),
            PhylogenyExportFormat::Json => String::from("json"),
            PhylogenyExportFormat::Newick => String::from("nwk"),
        }
    }

    /// Guess the export format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, Report> {
        let ext = utils::path_to_ext(path)?;
        PhylogenyExportFormat::from_str(&ext)
            .wrap_err_with(|| format!("Unable to pick an export format for: {path:?}"))
    }
}

impl std::fmt::Display for PhylogenyExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PhylogenyExportFormat::Dot => write!(f, "dot"),
            PhylogenyExportFormat::Json => write!(f, "json"),
            PhylogenyExportFormat::Newick => write!(f, "newick"),
        }
    }
}

impl FromStr for PhylogenyExportFormat {
    type Err = Report;

    fn from_str(format: &str) -> Result<Self, Report> {
        let format = match format {
            "dot" | "gv" => PhylogenyExportFormat::Dot,
            "json" => PhylogenyExportFormat::Json,
            "newick" | "nwk" | "tree" => PhylogenyExportFormat::Newick,
            _ => Err(eyre!("Unknown phylogeny export format: {format}"))
                .suggestion("Options are dot, json or newick.")?,
        };

        Ok(format)
    }
}

// ----------------------------------------------------------------------------
// Node

/// A node of the [Phylogeny].
///
/// Mutation labels are working indices, [Phylogeny::order] maps them back to the
/// original mutation identifiers. Leaves are labelled with the cell (row) index.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Node {
    Root,
    Mutation(usize),
    Leaf(usize),
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Node::Root => write!(f, "root"),
            Node::Mutation(mutation) => write!(f, "{mutation}"),
            Node::Leaf(cell) => write!(f, "C{cell}"),
        }
    }
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub fn mutation(&self) -> Option<usize> {
        match self {
            Node::Mutation(mutation) => Some(*mutation),
            _ => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Phylogeny

/// Rooted tree of mutations, with one leaf per cell.
///
/// Nodes live in a [StableGraph] arena so that a [NodeIndex] stays valid when other
/// nodes are removed. Edges point from parent to child and carry a branch length of 1.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Phylogeny {
    pub graph: StableGraph<Node, usize>,
    pub root: NodeIndex,
    /// Original mutation identifier of each working mutation label.
    pub order: Vec<usize>,
}

impl Default for Phylogeny {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Phylogeny {
    /// Create a phylogeny with only a root node.
    pub fn new(order: Vec<usize>) -> Self {
        let mut graph = StableGraph::new();
        let root = graph.add_node(Node::Root);
        Phylogeny { graph, root, order }
    }

    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    /// Add `node` as a new child of `parent`.
    pub fn add_child(&mut self, parent: NodeIndex, node: Node) -> NodeIndex {
        let child = self.graph.add_node(node);
        self.graph.add_edge(parent, child, 1);
        child
    }

    /// Find the non-leaf child of `parent` labelled with `mutation`.
    pub fn get_child(&self, parent: NodeIndex, mutation: usize) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(parent, Direction::Outgoing)
            .find(|child| self.graph[*child] == Node::Mutation(mutation))
    }

    /// Descend into the child labelled `mutation`, creating it if it doesn't exist.
    pub fn get_or_add_child(&mut self, parent: NodeIndex, mutation: usize) -> NodeIndex {
        match self.get_child(parent, mutation) {
            Some(child) => child,
            None => self.add_child(parent, Node::Mutation(mutation)),
        }
    }

    /// Children of a node, mutations (by label) before leaves (by cell).
    pub fn get_children(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.graph
            .neighbors_directed(node, Direction::Outgoing)
            .sorted_by_key(|child| self.graph[*child])
            .collect_vec()
    }

    pub fn get_parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.graph.neighbors_directed(node, Direction::Incoming).next()
    }

    /// Nodes from the root down to `node`, inclusive.
    pub fn get_path(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut path = vec![node];
        let mut current = node;
        while let Some(parent) = self.get_parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Cell identifiers of all leaves, sorted.
    pub fn get_leaves(&self) -> Vec<usize> {
        self.graph
            .node_indices()
            .map(|node| &self.graph[node])
            .filter_map(|node| match node {
                Node::Leaf(cell) => Some(*cell),
                _ => None,
            })
            .sorted()
            .collect_vec()
    }

    pub fn get_leaf(&self, cell: usize) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|node| self.graph[*node] == Node::Leaf(cell))
    }

    /// Nodes labelled with working mutation label `mutation`.
    pub fn get_mutation_nodes(&self, mutation: usize) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|node| self.graph[*node] == Node::Mutation(mutation))
            .collect_vec()
    }

    /// Original identifiers of the mutations on the path from the root to a cell.
    pub fn get_mutations(&self, cell: usize) -> Result<Vec<usize>, Report> {
        let leaf = self
            .get_leaf(cell)
            .ok_or_else(|| eyre!("Cell C{cell} is not a leaf of the phylogeny."))?;

        self.get_path(leaf)
            .into_iter()
            .filter_map(|node| self.graph[node].mutation())
            .map(|mutation| {
                self.original(mutation)
                    .ok_or_else(|| eyre!("Mutation {mutation} is missing from the order."))
            })
            .collect()
    }

    /// True when no mutation labels more than one node.
    pub fn is_perfect(&self) -> bool {
        self.graph
            .node_indices()
            .map(|node| &self.graph[node])
            .filter_map(|node| node.mutation())
            .all_unique()
    }

    /// Map a working mutation label to its original identifier.
    pub fn original(&self, mutation: usize) -> Option<usize> {
        self.order.get(mutation).copied()
    }

    /// Check that every mutation node has an entry in the order.
    pub fn validate_order(&self) -> Result<(), Report> {
        let missing = self
            .graph
            .node_indices()
            .filter_map(|node| self.graph[node].mutation())
            .filter(|mutation| *mutation >= self.order.len())
            .sorted()
            .dedup()
            .collect_vec();

        if !missing.is_empty() {
            return Err(eyre!(
                "Mutations {} are missing from the order of length {}.",
                missing.iter().join(", "),
                self.order.len()
            ));
        }

        Ok(())
    }

    /// Display label of a node, mutations use their original identifier.
    ///
    /// Mutations missing from the order keep their working label with an `m` prefix,
    /// [Phylogeny::validate_order] rejects these before export.
    pub fn label(&self, node: &Node) -> String {
        match node {
            Node::Mutation(mutation) => {
                debug_assert!(
                    *mutation < self.order.len(),
                    "Mutation {mutation} is missing from the order."
                );
                self.original(*mutation)
                    .map_or_else(|| format!("m{mutation}"), |original| original.to_string())
            }
            _ => node.to_string(),
        }
    }

    /// Remove a node from the phylogeny.
    ///
    /// If prune is true, removes the entire clade below the node.
    /// If prune is false, connects the node's children to its parent to fill the hole.
    pub fn remove(&mut self, node: NodeIndex, prune: bool) -> Result<Vec<Node>, Report> {
        if node == self.root {
            return Err(eyre!("The root of the phylogeny cannot be removed."));
        }
        let parent = self
            .get_parent(node)
            .ok_or_else(|| eyre!("Node {node:?} is not connected to the phylogeny."))?;

        let mut removed = Vec::new();

        if prune {
            let mut descendants = Vec::new();
            let mut dfs = Dfs::new(&self.graph, node);
            while let Some(nx) = dfs.next(&self.graph) {
                descendants.push(nx);
            }
            for nx in descendants {
                if let Some(weight) = self.graph.remove_node(nx) {
                    removed.push(weight);
                }
            }
        } else {
            let children = self.get_children(node);
            if let Some(weight) = self.graph.remove_node(node) {
                debug!("Removing node {weight}, reconnecting {} children.", children.len());
                removed.push(weight);
            }
            for child in children {
                self.graph.add_edge(parent, child, 1);
            }
        }

        Ok(removed)
    }

    // ------------------------------------------------------------------------
    // Export

    /// Graphviz representation, drawn left to right.
    pub fn to_dot(&self) -> String {
        let config = &[Config::NodeNoLabel, Config::EdgeNoLabel];
        let dot = Dot::with_attr_getters(
            &self.graph,
            config,
            &|_, _| String::new(),
            &|_, (_, node)| format!("label=\"{}\"", self.label(node)),
        )
        .to_string();

        // set horizontal (Left to Right) format for tree-like visualizer
        dot.replace("digraph {", "digraph {\n    rankdir=\"LR\";")
    }

    /// Newick representation, ex. `((C1,C2)1,C0)root;`
    pub fn to_newick(&self) -> String {
        format!("{};", self.newick_clade(self.root))
    }

    fn newick_clade(&self, node: NodeIndex) -> String {
        let label = self.label(&self.graph[node]);
        let children = self.get_children(node);
        if children.is_empty() {
            label
        } else {
            let clades = children.into_iter().map(|child| self.newick_clade(child)).join(",");
            format!("({clades}){label}")
        }
    }

    pub fn to_json(&self) -> Result<String, Report> {
        serde_json::to_string_pretty(&self).wrap_err("Failed to export phylogeny to json.")
    }

    /// Export phylogeny to a file in the specified format.
    pub fn export(&self, path: &Path, format: PhylogenyExportFormat) -> Result<(), Report> {
        info!("Exporting phylogeny to {format}: {path:?}");
        self.validate_order()?;

        let output = match format {
            PhylogenyExportFormat::Dot => self.to_dot(),
            PhylogenyExportFormat::Json => self.to_json()?,
            PhylogenyExportFormat::Newick => self.to_newick(),
        };

        let mut file = File::create(path)
            .wrap_err_with(|| format!("Failed to create file: {path:?}"))?;
        file.write_all(format!("{output}\n").as_bytes())
            .wrap_err_with(|| format!("Failed to write file: {path:?}"))?;

        Ok(())
    }
}
