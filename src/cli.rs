//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::SourceEncoding;
use crate::models::LabelUniverse;
use clap::Parser;
use std::path::PathBuf;

/// ticketdash - ticket dashboard from a CSV export
///
/// Filter a tickets CSV by area and aggregate it into the four dashboard
/// charts: tickets per project, per category, per day and per area.
/// Markdown/JSON reports, or an interactive area prompt.
///
/// Examples:
///   ticketdash --data BD_TABANTAJ.csv
///   ticketdash --data BD_TABANTAJ.csv --area Sistemas --format json -o dashboard.json
///   ticketdash --data BD_TABANTAJ.csv --list-areas
///   ticketdash --data BD_TABANTAJ.csv --interactive
///   ticketdash --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Tickets CSV to load
    ///
    /// Defaults to the path in .ticketdash.toml, or BD_TABANTAJ.csv.
    #[arg(short, long, value_name = "FILE", env = "TICKETDASH_DATA")]
    pub data: Option<PathBuf>,

    /// Area to show
    ///
    /// Omit, or pass the "all" value (default: Todas), to show every area.
    #[arg(short, long, value_name = "AREA")]
    pub area: Option<String>,

    /// Output file path for the report
    ///
    /// If not specified, the report is printed to stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Character encoding of the CSV (auto, utf-8, latin-1)
    #[arg(long, value_name = "ENCODING")]
    pub encoding: Option<SourceEncoding>,

    /// CSV field delimiter
    #[arg(long, value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Which projects get a series in the per-project chart
    ///
    /// "dataset" keeps every project of the file (empty series included);
    /// "selection" keeps only projects with tickets in the selected area.
    #[arg(long, value_name = "POLICY")]
    pub label_universe: Option<LabelUniverse>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .ticketdash.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the selectable areas and exit
    #[arg(long, conflicts_with = "interactive")]
    pub list_areas: bool,

    /// Read one area per line from stdin and re-render after each
    #[arg(short, long)]
    pub interactive: bool,

    /// Generate a default .ticketdash.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(delimiter) = self.delimiter {
            if !delimiter.is_ascii() || delimiter == '\n' || delimiter == '"' {
                return Err(format!("Invalid delimiter: {:?}", delimiter));
            }
        }

        if self.interactive && self.area.is_some() {
            return Err("--area cannot be combined with --interactive".to_string());
        }

        // Validate data file if provided
        if let Some(ref data) = self.data {
            if !data.exists() {
                return Err(format!("Data file does not exist: {}", data.display()));
            }
            if !data.is_file() {
                return Err(format!("Data path is not a file: {}", data.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
