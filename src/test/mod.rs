use crate::conflict::reduce::{reduce, Method};
use crate::conflict::{is_incompatible, ConflictMatrix};
use crate::error::{Error, MalformedInput};
use crate::matrix::MutationMatrix;
use crate::phylogeny::build::{naive, online, reconstruct, Builder};
use crate::phylogeny::{Node, Phylogeny, PhylogenyExportFormat};
use crate::simulate;

use color_eyre::eyre::{Report, Result};
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::str::FromStr;

// ----------------------------------------------------------------------------
// Helpers

/// Three cells carrying 10, 11 and 01: the smallest conflicting matrix.
fn conflicting() -> Result<MutationMatrix, Report> {
    MutationMatrix::from_rows([[1u8, 0], [1, 1], [0, 1]])
}

fn conflict_free() -> Result<MutationMatrix, Report> {
    MutationMatrix::from_rows([[1u8, 0], [1, 0], [0, 1]])
}

/// A matrix whose conflicting pairs are exactly `edges`.
///
/// Every mutation gets a cell carrying only itself, and every edge a cell carrying
/// both ends. Two mutations then share a cell only when they are an edge.
fn with_conflicts(mutations: usize, edges: &[(usize, usize)]) -> Result<MutationMatrix, Report> {
    let singles = (0..mutations).map(|m| (0..mutations).map(|j| u8::from(j == m)).collect_vec());
    let pairs = edges
        .iter()
        .map(|(a, b)| (0..mutations).map(|j| u8::from(j == *a || j == *b)).collect_vec());
    MutationMatrix::from_rows(singles.chain(pairs))
}

/// Mutations present in a cell, by column index.
fn present(matrix: &MutationMatrix, cell: usize) -> Vec<usize> {
    matrix.row(cell).iter().positions(|v| *v).collect_vec()
}

// ----------------------------------------------------------------------------
// Mutation Matrix

#[test]
fn matrix_parse() -> Result<(), Report> {
    let text = "3 cells\n2 mutations\n\n1 0\n1 1\n\n0 1\n";
    let matrix = MutationMatrix::from_str(text)?;
    assert_eq!(matrix.cells, 3);
    assert_eq!(matrix.mutations, 2);
    assert_eq!(matrix, conflicting()?);
    assert_eq!(matrix.to_string(), "3 cells\n2 mutations\n1 0\n1 1\n0 1\n");
    Ok(())
}

#[test]
fn matrix_row_length() -> Result<(), Report> {
    let result = MutationMatrix::from_str("1 cells\n3 mutations\n1 0\n");
    let error = result.err().ok_or_else(|| Report::msg("row length was accepted"))?;
    assert_eq!(
        error.downcast_ref::<Error>(),
        Some(&Error::MalformedInput(MalformedInput::RowLength {
            row: 0,
            expected: 3,
            actual: 2
        }))
    );
    Ok(())
}

#[test]
fn matrix_malformed() -> Result<(), Report> {
    let cases = [
        ("", "missing cell count"),
        ("3 cells\n", "missing mutation count"),
        ("three cells\n2 mutations\n", "invalid cell count"),
        ("2 cells\n2 mutations\n1 0\n", "too few rows"),
        ("1 cells\n2 mutations\n1 2\n", "invalid token"),
    ];
    for (text, case) in cases {
        let error = MutationMatrix::from_str(text)
            .err()
            .ok_or_else(|| Report::msg(format!("{case} was accepted")))?;
        assert!(
            matches!(error.downcast_ref::<Error>(), Some(Error::MalformedInput(_))),
            "{case}: {error}"
        );
    }
    Ok(())
}

#[test]
fn matrix_frequency_order() -> Result<(), Report> {
    let matrix = MutationMatrix::from_rows([[0u8, 1, 1, 0], [0, 1, 0, 1], [0, 1, 1, 0]])?;
    assert_eq!(matrix.frequency_order(), vec![1, 2, 3, 0]);
    let selected = matrix.select_columns(&[2, 0]);
    assert_eq!(selected.mutations, 2);
    assert_eq!(selected.column(0), vec![true, false, true]);
    Ok(())
}

#[test]
fn matrix_from_rows_token() -> Result<(), Report> {
    let error = MutationMatrix::from_rows([[1u8, 0], [0, 2]])
        .err()
        .ok_or_else(|| Report::msg("value 2 was accepted"))?;
    assert_eq!(
        error.downcast_ref::<Error>(),
        Some(&Error::MalformedInput(MalformedInput::InvalidToken {
            row: 1,
            column: 1,
            token: "2".to_string(),
        }))
    );
    Ok(())
}

// ----------------------------------------------------------------------------
// Conflict Matrix

#[test]
fn conflict_scenario() -> Result<(), Report> {
    let conflicts = ConflictMatrix::from_matrix(&conflicting()?);
    assert!(conflicts.get(0, 1));
    assert!(conflicts.get(1, 0));
    assert_eq!(conflicts.pairs(), vec![(0, 1)]);

    let conflicts = ConflictMatrix::from_matrix(&conflict_free()?);
    assert!(conflicts.is_conflict_free());
    Ok(())
}

#[test]
fn conflict_three_gamete() -> Result<(), Report> {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..10 {
        let matrix = simulate::matrix(12, 9, 0.15, &mut rng);
        let conflicts = ConflictMatrix::from_matrix(&matrix);
        assert_eq!(conflicts.len(), matrix.mutations);

        for m1 in 0..matrix.mutations {
            assert!(!conflicts.get(m1, m1));
            for m2 in 0..matrix.mutations {
                assert_eq!(conflicts.get(m1, m2), conflicts.get(m2, m1));

                let gametes = matrix
                    .rows()
                    .map(|row| (row[m1], row[m2]))
                    .filter(|pair| *pair != (false, false))
                    .unique()
                    .count();
                let expected = m1 != m2 && gametes == 3;
                assert_eq!(conflicts.get(m1, m2), expected, "mutations {m1} and {m2}");
                assert_eq!(is_incompatible(&matrix, m1, m2), expected);
            }
        }
    }
    Ok(())
}

#[test]
fn conflict_permute() -> Result<(), Report> {
    let matrix = MutationMatrix::from_rows([[1u8, 0, 1], [1, 1, 0], [0, 1, 0]])?;
    let conflicts = ConflictMatrix::from_matrix(&matrix);
    assert_eq!(conflicts.pairs(), vec![(0, 1)]);

    let permuted = conflicts.permute(&[2, 1, 0])?;
    assert_eq!(permuted.pairs(), vec![(1, 2)]);

    assert!(conflicts.permute(&[0, 0, 1]).is_err());
    assert!(conflicts.permute(&[0, 1]).is_err());
    Ok(())
}

#[test]
fn conflict_table() -> Result<(), Report> {
    let conflicts = ConflictMatrix::from_matrix(&conflicting()?);
    let table = conflicts.to_table(&[0, 1])?;
    assert_eq!(table.headers, vec!["mutation", "0", "1"]);
    assert_eq!(table.rows, vec![vec!["0", "0", "1"], vec!["1", "1", "0"]]);
    assert!(conflicts.to_table(&[0]).is_err());
    Ok(())
}

// ----------------------------------------------------------------------------
// Reduction

#[test]
fn reduce_maximum() -> Result<(), Report> {
    let matrix = conflicting()?;
    let conflicts = ConflictMatrix::from_matrix(&matrix);
    let reduction = reduce(&matrix, conflicts, Method::Maximum)?;

    // tie between 0 and 1 goes to the lowest index
    assert_eq!(reduction.removed, vec![0]);
    assert_eq!(reduction.num_removed(), 1);
    assert_eq!(reduction.order, vec![1]);
    assert_eq!(reduction.matrix.column(0), vec![false, true, true]);
    assert!(reduction.conflicts.is_conflict_free());
    Ok(())
}

#[test]
fn reduce_sort() -> Result<(), Report> {
    let matrix = conflicting()?;
    let conflicts = ConflictMatrix::from_matrix(&matrix);
    let reduction = reduce(&matrix, conflicts, Method::Sort)?;
    assert_eq!(reduction.num_removed(), 1);
    assert_eq!(reduction.order.len(), 1);
    assert!(reduction.conflicts.is_conflict_free());
    Ok(())
}

#[test]
fn reduce_sort_first_break() -> Result<(), Report> {
    // conflict degrees: 0 -> 5, 1 -> 4, 2 -> 3, 3 -> 3, 4 -> 3, the rest 1
    let edges = [
        (0, 2), (0, 3), (0, 5), (0, 6), (0, 7),
        (1, 3), (1, 8), (1, 9), (1, 10),
        (2, 11), (2, 12),
        (3, 13),
        (4, 14), (4, 15), (4, 16),
    ];
    let matrix = with_conflicts(17, &edges)?;
    let conflicts = ConflictMatrix::from_matrix(&matrix);
    assert_eq!(conflicts.pairs(), edges.to_vec());

    // after removing 0 and 1 the sums run 2, 1, 3: sort stops at the first
    // break (mutation 2) while maximum takes mutation 4
    let sort = reduce(&matrix, conflicts.clone(), Method::Sort)?;
    assert_eq!(sort.removed, vec![0, 1, 2, 4, 3]);

    let maximum = reduce(&matrix, conflicts, Method::Maximum)?;
    assert_eq!(maximum.removed, vec![0, 1, 4, 2, 3]);

    assert_eq!(sort.order, (5..17).collect_vec());
    assert_eq!(maximum.order, (5..17).collect_vec());
    Ok(())
}

#[test]
fn reduce_sort_stable() -> Result<(), Report> {
    // conflict degrees 1, 2, 1, 2: sorted order is 1, 3, 0, 2
    let matrix = with_conflicts(4, &[(0, 1), (1, 3), (2, 3)])?;
    let conflicts = ConflictMatrix::from_matrix(&matrix);

    // 1 and 3 tie, so the first break is at 3
    let sort = reduce(&matrix, conflicts.clone(), Method::Sort)?;
    assert_eq!(sort.removed, vec![3, 0]);
    assert_eq!(sort.order, vec![1, 2]);
    assert_eq!(sort.matrix, matrix.select_columns(&[1, 2]));

    let maximum = reduce(&matrix, conflicts, Method::Maximum)?;
    assert_eq!(maximum.removed, vec![1, 2]);
    assert_eq!(maximum.order, vec![0, 3]);
    Ok(())
}

#[test]
fn reduce_terminates() -> Result<(), Report> {
    let mut rng = StdRng::seed_from_u64(11);
    for method in [Method::Maximum, Method::Sort] {
        for _ in 0..10 {
            let matrix = simulate::matrix(15, 12, 0.2, &mut rng);
            let conflicts = ConflictMatrix::from_matrix(&matrix);
            let reduction = reduce(&matrix, conflicts, method)?;

            assert!(reduction.conflicts.is_conflict_free());
            assert!(ConflictMatrix::from_matrix(&reduction.matrix).is_conflict_free());

            // every mutation is either kept or removed, exactly once
            let all = reduction
                .order
                .iter()
                .chain(&reduction.removed)
                .sorted()
                .copied()
                .collect_vec();
            assert_eq!(all, (0..matrix.mutations).collect_vec());
        }
    }
    Ok(())
}

#[test]
fn reduce_size_mismatch() -> Result<(), Report> {
    let matrix = conflicting()?;
    assert!(reduce(&matrix, ConflictMatrix::new(3), Method::Maximum).is_err());
    Ok(())
}

#[test]
fn strategy_names() -> Result<(), Report> {
    assert_eq!(Method::from_str("maximum")?, Method::Maximum);
    assert_eq!(Method::from_str("sort")?, Method::Sort);
    assert_eq!(Builder::from_str("fast")?, Builder::Online);
    assert_eq!(Builder::from_str("naive")?, Builder::Naive);

    let error = Method::from_str("average")
        .err()
        .ok_or_else(|| Report::msg("average was accepted"))?;
    assert_eq!(
        error.downcast_ref::<Error>(),
        Some(&Error::InvalidStrategy {
            kind: "reduction".to_string(),
            name: "average".to_string(),
            choices: "maximum, sort".to_string(),
        })
    );

    let error = Builder::from_str("greedy")
        .err()
        .ok_or_else(|| Report::msg("greedy was accepted"))?;
    assert!(matches!(
        error.downcast_ref::<Error>(),
        Some(Error::InvalidStrategy { .. })
    ));
    Ok(())
}

// ----------------------------------------------------------------------------
// Phylogeny

#[test]
fn phylogeny_precomputed() -> Result<(), Report> {
    let reconstruction = reconstruct(&conflicting()?, Builder::Precomputed, Method::Maximum)?;
    let phylogeny = &reconstruction.phylogeny;

    assert_eq!(reconstruction.removed, vec![0]);
    assert_eq!(reconstruction.method, Some(Method::Maximum));
    assert!(phylogeny.is_perfect());
    assert_eq!(phylogeny.num_nodes(), 5);

    let root = phylogeny.get_children(phylogeny.root);
    assert_eq!(root.len(), 2);
    assert_eq!(phylogeny.label(&phylogeny.graph[root[0]]), "1");
    assert_eq!(phylogeny.graph[root[1]], Node::Leaf(0));

    let clade = phylogeny.get_children(root[0]);
    assert_eq!(
        clade.iter().map(|node| phylogeny.graph[*node]).collect_vec(),
        vec![Node::Leaf(1), Node::Leaf(2)]
    );

    assert_eq!(phylogeny.to_newick(), "((C1,C2)1,C0)root;");
    assert_eq!(phylogeny.get_mutations(2)?, vec![1]);
    assert_eq!(phylogeny.get_mutations(0)?, Vec::<usize>::new());
    Ok(())
}

#[test]
fn phylogeny_conflict_free() -> Result<(), Report> {
    let reconstruction = reconstruct(&conflict_free()?, Builder::Precomputed, Method::Sort)?;
    assert!(reconstruction.removed.is_empty());
    assert_eq!(reconstruction.phylogeny.to_newick(), "((C0,C1)0,(C2)1)root;");
    Ok(())
}

#[test]
fn phylogeny_online() -> Result<(), Report> {
    let (phylogeny, removed) = online(&conflicting()?)?;

    assert_eq!(removed, vec![1]);
    assert!(phylogeny.is_perfect());
    assert_eq!(phylogeny.get_leaves(), vec![0, 1, 2]);
    // C1 was re-attached to mutation 0 when mutation 1 was removed
    assert_eq!(phylogeny.to_newick(), "((C0,C1)0,C2)root;");
    Ok(())
}

#[test]
fn phylogeny_naive() -> Result<(), Report> {
    let phylogeny = naive(&conflicting()?);
    assert_eq!(phylogeny.get_leaves(), vec![0, 1, 2]);
    // mutation 1 sits both below mutation 0 and below the root
    assert_eq!(phylogeny.get_mutation_nodes(1).len(), 2);
    assert!(!phylogeny.is_perfect());

    let phylogeny = naive(&conflict_free()?);
    assert!(phylogeny.is_perfect());
    Ok(())
}

#[test]
fn phylogeny_leaves() -> Result<(), Report> {
    let mut rng = StdRng::seed_from_u64(3);
    for builder in [Builder::Precomputed, Builder::Online, Builder::Naive] {
        for _ in 0..5 {
            let matrix = simulate::matrix(20, 10, 0.1, &mut rng);
            let reconstruction = reconstruct(&matrix, builder, Method::Maximum)?;
            let phylogeny = &reconstruction.phylogeny;
            assert_eq!(phylogeny.get_leaves(), (0..matrix.cells).collect_vec(), "{builder}");
            if builder != Builder::Naive {
                assert!(phylogeny.is_perfect(), "{builder}");
            }
        }
    }
    Ok(())
}

#[test]
fn phylogeny_paths() -> Result<(), Report> {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..5 {
        let matrix = simulate::matrix(20, 10, 0.1, &mut rng);
        let reconstruction = reconstruct(&matrix, Builder::Precomputed, Method::Maximum)?;

        // each cell's path holds exactly its remaining mutations
        for cell in 0..matrix.cells {
            let expected = present(&matrix, cell)
                .into_iter()
                .filter(|m| !reconstruction.removed.contains(m))
                .collect_vec();
            let observed =
                reconstruction.phylogeny.get_mutations(cell)?.into_iter().sorted().collect_vec();
            assert_eq!(observed, expected, "cell {cell}");
        }
    }
    Ok(())
}

#[test]
fn phylogeny_simulated() -> Result<(), Report> {
    let mut rng = StdRng::seed_from_u64(1);
    let matrix = simulate::matrix(30, 15, 0.0, &mut rng);
    assert!(ConflictMatrix::from_matrix(&matrix).is_conflict_free());

    for builder in [Builder::Precomputed, Builder::Online, Builder::Naive] {
        let reconstruction = reconstruct(&matrix, builder, Method::Sort)?;
        assert!(reconstruction.removed.is_empty(), "{builder}");
        assert!(reconstruction.phylogeny.is_perfect(), "{builder}");
        for cell in 0..matrix.cells {
            let observed =
                reconstruction.phylogeny.get_mutations(cell)?.into_iter().sorted().collect_vec();
            assert_eq!(observed, present(&matrix, cell), "{builder} cell {cell}");
        }
    }
    Ok(())
}

#[test]
fn phylogeny_remove() -> Result<(), Report> {
    let mut phylogeny = Phylogeny::new(vec![0, 1]);
    let m0 = phylogeny.add_child(phylogeny.root, Node::Mutation(0));
    let m1 = phylogeny.add_child(m0, Node::Mutation(1));
    phylogeny.add_child(m1, Node::Leaf(0));
    phylogeny.add_child(m0, Node::Leaf(1));
    assert_eq!(phylogeny.to_newick(), "(((C0)1,C1)0)root;");

    // re-parent
    let removed = phylogeny.remove(m0, false)?;
    assert_eq!(removed, vec![Node::Mutation(0)]);
    assert_eq!(phylogeny.to_newick(), "((C0)1,C1)root;");
    assert_eq!(phylogeny.get_parent(m1), Some(phylogeny.root));

    // prune
    let removed = phylogeny.remove(m1, true)?;
    assert_eq!(removed.len(), 2);
    assert_eq!(phylogeny.get_leaves(), vec![1]);
    assert_eq!(phylogeny.to_newick(), "(C1)root;");

    assert!(phylogeny.remove(phylogeny.root, false).is_err());
    Ok(())
}

#[test]
fn phylogeny_export() -> Result<(), Report> {
    let reconstruction = reconstruct(&conflicting()?, Builder::Precomputed, Method::Maximum)?;
    let phylogeny = &reconstruction.phylogeny;

    let dot = phylogeny.to_dot();
    assert!(dot.contains("rankdir=\"LR\""));
    assert!(dot.contains("label=\"C2\""));
    assert!(dot.contains("label=\"1\""));

    let json = phylogeny.to_json()?;
    let parsed: Phylogeny = serde_json::from_str(&json)?;
    assert_eq!(parsed.to_newick(), phylogeny.to_newick());

    assert_eq!(
        PhylogenyExportFormat::from_path(Path::new("tree.NWK"))?,
        PhylogenyExportFormat::Newick
    );
    assert_eq!(
        PhylogenyExportFormat::from_path(Path::new("tree.gv"))?,
        PhylogenyExportFormat::Dot
    );
    assert!(PhylogenyExportFormat::from_path(Path::new("tree.png")).is_err());
    assert!(PhylogenyExportFormat::from_path(Path::new("tree")).is_err());

    let summary = reconstruction.pretty_print();
    assert!(summary.contains("builder: precomputed"));
    assert!(summary.contains("removed: 1 [0]"));
    Ok(())
}

#[test]
fn phylogeny_order() -> Result<(), Report> {
    let mut phylogeny = Phylogeny::new(vec![4]);
    let m0 = phylogeny.add_child(phylogeny.root, Node::Mutation(0));
    phylogeny.add_child(m0, Node::Leaf(0));
    assert_eq!(phylogeny.original(0), Some(4));
    assert_eq!(phylogeny.original(1), None);
    assert_eq!(phylogeny.get_mutations(0)?, vec![4]);
    phylogeny.validate_order()?;

    // a mutation past the end of the order is an error, not a silent relabel
    let m1 = phylogeny.add_child(m0, Node::Mutation(1));
    phylogeny.add_child(m1, Node::Leaf(1));
    assert!(phylogeny.validate_order().is_err());
    assert!(phylogeny.get_mutations(1).is_err());
    assert_eq!(phylogeny.get_mutations(0)?, vec![4]);

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tree.nwk");
    assert!(phylogeny.export(&path, PhylogenyExportFormat::Newick).is_err());
    assert!(!path.exists());
    Ok(())
}
