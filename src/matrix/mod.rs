use crate::error::{Error, MalformedInput};
use color_eyre::eyre::{Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

// ----------------------------------------------------------------------------
// Mutation Matrix
// ----------------------------------------------------------------------------

/// Binary cells-by-mutations presence matrix.
///
/// Row `i` is the mutation profile of cell `i`, column `j` records which cells
/// carry mutation `j`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct MutationMatrix {
    pub cells: usize,
    pub mutations: usize,
    data: Vec<Vec<bool>>,
}

impl MutationMatrix {
    /// Create a matrix of `cells` x `mutations` with no mutations present.
    pub fn new(cells: usize, mutations: usize) -> Self {
        MutationMatrix {
            cells,
            mutations,
            data: vec![vec![false; mutations]; cells],
        }
    }

    /// Create a matrix from rows of 0/1 values.
    ///
    /// The mutation count is taken from the first row, every other row must match it.
    /// Values other than 0 and 1 are rejected, as in the text format.
    pub fn from_rows<R, T>(rows: R) -> Result<Self, Report>
    where
        R: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let data = rows
            .into_iter()
            .enumerate()
            .map(|(row, values)| {
                values
                    .as_ref()
                    .iter()
                    .enumerate()
                    .map(|(column, value)| match *value {
                        0 => Ok(false),
                        1 => Ok(true),
                        _ => Err(Error::from(MalformedInput::InvalidToken {
                            row,
                            column,
                            token: value.to_string(),
                        })),
                    })
                    .collect::<Result<Vec<_>, Error>>()
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let cells = data.len();
        let mutations = data.first().map(|row| row.len()).unwrap_or(0);

        if let Some((row, values)) =
            data.iter().enumerate().find(|(_, values)| values.len() != mutations)
        {
            return Err(Error::from(MalformedInput::RowLength {
                row,
                expected: mutations,
                actual: values.len(),
            })
            .into());
        }

        Ok(MutationMatrix {
            cells,
            mutations,
            data,
        })
    }

    /// Read a matrix from a whitespace-delimited text file.
    ///
    /// ```text
    /// 3 cells
    /// 2 mutations
    /// 1 0
    /// 1 1
    /// 0 1
    /// ```
    pub fn read(path: &Path) -> Result<Self, Report> {
        let input = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read file: {path:?}"))?;
        let matrix = MutationMatrix::from_str(&input)
            .wrap_err_with(|| format!("Failed to parse mutation matrix: {path:?}"))?;
        debug!(
            "Loaded {path:?} with {} cells and {} mutations.",
            matrix.cells, matrix.mutations
        );
        Ok(matrix)
    }

    /// Write the matrix to file, in the same format that [MutationMatrix::read] expects.
    pub fn write(&self, path: &Path) -> Result<(), Report> {
        let mut file = File::create(path)
            .wrap_err_with(|| format!("Unable to create file: {path:?}"))?;
        file.write_all(self.to_string().as_bytes())
            .wrap_err_with(|| format!("Unable to write file: {path:?}"))?;
        Ok(())
    }

    pub fn get(&self, cell: usize, mutation: usize) -> bool {
        self.data[cell][mutation]
    }

    pub fn set(&mut self, cell: usize, mutation: usize, value: bool) {
        self.data[cell][mutation] = value;
    }

    pub fn row(&self, cell: usize) -> &[bool] {
        &self.data[cell]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.data.iter().map(|row| row.as_slice())
    }

    pub fn column(&self, mutation: usize) -> Vec<bool> {
        self.data.iter().map(|row| row[mutation]).collect_vec()
    }

    /// Number of cells that carry the mutation.
    pub fn frequency(&self, mutation: usize) -> usize {
        self.data.iter().filter(|row| row[mutation]).count()
    }

    /// Mutation indices sorted by descending frequency.
    ///
    /// The sort is stable, mutations carried by the same number of cells keep
    /// their column order.
    pub fn frequency_order(&self) -> Vec<usize> {
        let frequencies = (0..self.mutations).map(|m| self.frequency(m)).collect_vec();
        (0..self.mutations)
            .sorted_by(|a, b| frequencies[*b].cmp(&frequencies[*a]))
            .collect_vec()
    }

    /// Returns a new matrix with only the columns in `order`, in that order.
    pub fn select_columns(&self, order: &[usize]) -> MutationMatrix {
        let data = self
            .data
            .iter()
            .map(|row| order.iter().map(|m| row[*m]).collect_vec())
            .collect_vec();

        MutationMatrix {
            cells: self.cells,
            mutations: order.len(),
            data,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells == 0 || self.mutations == 0
    }
}

impl std::fmt::Display for MutationMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "{} cells", self.cells)?;
        writeln!(f, "{} mutations", self.mutations)?;
        for row in &self.data {
            writeln!(f, "{}", row.iter().map(|v| u8::from(*v)).join(" "))?;
        }
        Ok(())
    }
}

impl FromStr for MutationMatrix {
    type Err = Report;

    fn from_str(text: &str) -> Result<Self, Report> {
        // line numbers are 1-based, blank lines are skipped entirely
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line))
            .filter(|(_, line)| !line.trim().is_empty());

        let cells = parse_count(lines.next(), "cell", 1)?;
        let mutations = parse_count(lines.next(), "mutation", 2)?;

        let mut data = Vec::with_capacity(cells);

        for (row, (_line, text)) in lines.enumerate() {
            let tokens = text.split_whitespace().collect_vec();
            if tokens.len() != mutations {
                return Err(Error::from(MalformedInput::RowLength {
                    row,
                    expected: mutations,
                    actual: tokens.len(),
                }))
                .suggestion(format!(
                    "Every row must have exactly {mutations} values, as declared on line 2."
                ));
            }

            let values = tokens
                .into_iter()
                .enumerate()
                .map(|(column, token)| match token {
                    "0" => Ok(false),
                    "1" => Ok(true),
                    _ => Err(Error::from(MalformedInput::InvalidToken {
                        row,
                        column,
                        token: token.to_string(),
                    })),
                })
                .collect::<Result<Vec<_>, Error>>()?;

            data.push(values);
        }

        if data.len() != cells {
            return Err(Error::from(MalformedInput::RowCount {
                expected: cells,
                actual: data.len(),
            }))
            .suggestion(format!(
                "The matrix must have exactly {cells} rows, as declared on line 1."
            ));
        }

        Ok(MutationMatrix {
            cells,
            mutations,
            data,
        })
    }
}

/// Parse the first whitespace-separated token of a header line as a count.
fn parse_count(
    line: Option<(usize, &str)>,
    name: &str,
    expected_line: usize,
) -> Result<usize, Report> {
    let (line, text) = line.ok_or_else(|| {
        Error::from(MalformedInput::MissingCount {
            name: name.to_string(),
            line: expected_line,
        })
    })?;

    let token = text.split_whitespace().next().unwrap_or_default();
    let count = token.parse::<usize>().map_err(|_| {
        Error::from(MalformedInput::InvalidCount {
            name: name.to_string(),
            value: token.to_string(),
            line,
        })
    })?;

    Ok(count)
}
