//! Domain errors for loading and aggregating ticket data.
//!
//! Application plumbing (config files, output files) uses `anyhow`;
//! anything that concerns the dataset itself is a `DashboardError`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a dataset or computing its views.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The source file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source file is not valid in the requested encoding.
    #[error("{} is not valid {encoding} text (invalid byte at offset {offset})", path.display())]
    Encoding {
        path: PathBuf,
        encoding: &'static str,
        offset: usize,
    },

    /// The CSV content is malformed.
    #[error("malformed CSV in {}{}: {message}", path.display(), line_suffix(*line))]
    Csv {
        path: PathBuf,
        line: Option<u64>,
        message: String,
    },

    /// A required column is absent from the header row.
    #[error("{} is missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    /// A non-numeric `count-area` value was reached during summation.
    #[error("non-numeric count-area value '{value}' on line {line}")]
    InvalidWeight { line: u64, value: String },
}

fn line_suffix(line: Option<u64>) -> String {
    match line {
        Some(line) => format!(" (line {})", line),
        None => String::new(),
    }
}
