use crate::utils;
use color_eyre::eyre::{Report, Result, WrapErr};
use itertools::Itertools;
use std::default::Default;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Delimited text table, the first line holds the headers.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    pub fn new() -> Self {
        Table {
            headers: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Write to file, the delimiter is chosen from the file extension.
    pub fn write(&self, path: &Path) -> Result<(), Report> {
        let mut file = File::create(path)
            .wrap_err_with(|| format!("Unable to create file: {path:?}"))?;

        let delim = utils::path_to_delim(path)?.to_string();

        let line = format!("{}\n", self.headers.iter().join(&delim));
        file.write_all(line.as_bytes())
            .wrap_err_with(|| format!("Unable to write table headers: {line}"))?;

        for row in &self.rows {
            let line = format!("{}\n", row.iter().join(&delim));
            file.write_all(line.as_bytes())
                .wrap_err_with(|| format!("Unable to write table rows: {line}"))?;
        }

        Ok(())
    }
}
