//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.ticketdash.toml` files.

use crate::models::LabelUniverse;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".ticketdash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input data settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Dashboard labels and titles.
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path. Unset means stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// How the source file bytes are decoded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SourceEncoding {
    /// UTF-8 when valid, otherwise ISO-8859-1.
    #[default]
    Auto,
    /// Strict UTF-8.
    #[value(name = "utf-8", alias = "utf8")]
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    /// ISO-8859-1 (every byte is one character).
    #[value(name = "latin-1", alias = "latin1", alias = "iso-8859-1")]
    #[serde(rename = "latin-1", alias = "latin1", alias = "iso-8859-1")]
    Latin1,
}

/// Input data settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path to the tickets CSV.
    #[serde(default = "default_data_path")]
    pub path: PathBuf,

    /// Character encoding of the CSV.
    #[serde(default)]
    pub encoding: SourceEncoding,

    /// Field delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            encoding: SourceEncoding::default(),
            delimiter: default_delimiter(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("BD_TABANTAJ.csv")
}

fn default_delimiter() -> char {
    ','
}

/// Dashboard labels, titles and aggregation policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Dashboard heading.
    #[serde(default = "default_title")]
    pub title: String,

    /// Selector value meaning "all areas".
    #[serde(default = "default_all_value")]
    pub all_value: String,

    /// Display label of the "all areas" option.
    #[serde(default = "default_all_label")]
    pub all_label: String,

    /// Which labels get a series in the per-project chart.
    #[serde(default)]
    pub label_universe: LabelUniverse,

    /// Chart titles.
    #[serde(default)]
    pub titles: ChartTitles,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            all_value: default_all_value(),
            all_label: default_all_label(),
            label_universe: LabelUniverse::default(),
            titles: ChartTitles::default(),
        }
    }
}

fn default_title() -> String {
    "Dashboard tickets".to_string()
}

fn default_all_value() -> String {
    "Todas".to_string()
}

fn default_all_label() -> String {
    "Todas las categorías".to_string()
}

/// Titles of the four charts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartTitles {
    #[serde(default = "default_project_title")]
    pub project: String,

    #[serde(default = "default_category_title")]
    pub category: String,

    #[serde(default = "default_totals_title")]
    pub totals: String,

    #[serde(default = "default_area_title")]
    pub area: String,
}

impl Default for ChartTitles {
    fn default() -> Self {
        Self {
            project: default_project_title(),
            category: default_category_title(),
            totals: default_totals_title(),
            area: default_area_title(),
        }
    }
}

fn default_project_title() -> String {
    "Tickets por proyecto".to_string()
}

fn default_category_title() -> String {
    "Tickets por Categoria".to_string()
}

fn default_totals_title() -> String {
    "Cantidad de Tickets Totales".to_string()
}

fn default_area_title() -> String {
    "Cantidad de tickets por área".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// List the selector options in the report.
    #[serde(default = "default_true")]
    pub include_selector: bool,

    /// Render series that have no points.
    #[serde(default = "default_true")]
    pub include_empty_series: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_selector: true,
            include_empty_series: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.ticketdash.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data) = args.data {
            self.data.path = data.clone();
        }
        if let Some(encoding) = args.encoding {
            self.data.encoding = encoding;
        }
        if let Some(delimiter) = args.delimiter {
            self.data.delimiter = delimiter;
        }
        if let Some(universe) = args.label_universe {
            self.dashboard.label_universe = universe;
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Output path, if the report should go to a file.
    pub fn output_path(&self) -> Option<PathBuf> {
        self.general
            .output
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
