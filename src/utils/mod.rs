pub mod table;

use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use log::warn;
use std::path::Path;

pub fn ext_to_delim(ext: &str) -> Result<char, Report> {
    let delim = match ext {
        "tsv" => '\t',
        "csv" => ',',
        "txt" => {
            warn!("File extension .txt is assumed to be tab-delimited.");
            '\t'
        }
        _ => {
            return Err(eyre!("Unknown file extension: {ext:?}")
                .suggestion("Options are tsv or csv."))
        }
    };

    Ok(delim)
}

pub fn path_to_delim(path: &Path) -> Result<char, Report> {
    // get the path extension
    let ext = path_to_ext(path)?;

    // convert extension to the expected delimiter
    let delim = ext_to_delim(&ext)?;

    Ok(delim)
}

pub fn path_to_ext(path: &Path) -> Result<String, Report> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| eyre!("Unable to parse extension from file: {path:?}"))?;

    Ok(ext.to_lowercase())
}
