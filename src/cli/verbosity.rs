use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub enum Verbosity {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for Verbosity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        // Convert to lowercase for RUST_LOG env var compatibility
        let lowercase = format!("{:?}", self).to_lowercase();
        write!(f, "{lowercase}")
    }
}

impl FromStr for Verbosity {
    type Err = Report;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let verbosity = match input {
            "error" => Verbosity::Error,
            "warn" => Verbosity::Warn,
            "info" => Verbosity::Info,
            "debug" => Verbosity::Debug,
            "trace" => Verbosity::Trace,
            _ => Err(eyre!("Unknown verbosity level {input}."))
                .suggestion("Options are error, warn, info, debug or trace.")?,
        };

        Ok(verbosity)
    }
}
