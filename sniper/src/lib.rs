#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

pub mod config;
pub mod db;
pub mod parser;

use std::path::PathBuf;

/// Text report written by the simulator into every run directory.
pub const REPORT_FILE: &str = "sim.out";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("simulator report {0:?} does not exist")]
    MissingReport(PathBuf),

    #[error(transparent)]
    Fs(#[from] utils::fs::Error),

    #[error("report is missing {field:?}")]
    MissingField { field: &'static str },

    #[error("failed to query statistics store {path:?}")]
    Store {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error(
        "counter {object}/{metric} on core {core} decreased over the ROI (begin={begin}, end={end}) in {path:?}"
    )]
    NegativeDelta {
        path: PathBuf,
        object: String,
        metric: String,
        core: i64,
        begin: i64,
        end: i64,
    },
}
