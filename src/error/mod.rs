use thiserror::Error;

/// Errors raised before any reconstruction work begins.
///
/// These travel inside a [`color_eyre::Report`], use `downcast_ref::<Error>()`
/// to recover them.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error("Malformed input: {0}")]
    MalformedInput(#[from] MalformedInput),

    #[error("Unknown {kind} strategy {name:?}, expected one of: {choices}")]
    InvalidStrategy {
        kind: String,
        name: String,
        choices: String,
    },
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum MalformedInput {
    #[error("missing the {name} count on line {line}")]
    MissingCount { name: String, line: usize },

    #[error("invalid {name} count {value:?} on line {line}")]
    InvalidCount { name: String, value: String, line: usize },

    #[error("incorrect number of mutations in row {row}: expected {expected}, found {actual}")]
    RowLength {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("incorrect number of cells: expected {expected}, found {actual}")]
    RowCount { expected: usize, actual: usize },

    #[error("invalid token {token:?} in row {row}, column {column}: expected 0 or 1")]
    InvalidToken {
        row: usize,
        column: usize,
        token: String,
    },
}
