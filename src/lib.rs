pub mod cli;
pub mod conflict;
pub mod error;
pub mod matrix;
pub mod phylogeny;
pub mod run;
pub mod simulate;
#[cfg(test)]
mod test;
pub mod utils;

pub use crate::conflict::reduce::{reduce, Method};
pub use crate::conflict::ConflictMatrix;
pub use crate::error::{Error, MalformedInput};
pub use crate::matrix::MutationMatrix;
pub use crate::phylogeny::build::{reconstruct, Builder, Reconstruction};
pub use crate::phylogeny::Phylogeny;
