//! Data models for the ticket dashboard.
//!
//! This module contains the core data structures used throughout
//! the application: ticket records, the loaded dataset, the area
//! selector, and the four aggregate views computed per selection.

use crate::dashboard::Dashboard;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// Numeric weight of a ticket (`count-area` column).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weight {
    /// A parsed numeric value.
    Value(f64),
    /// Empty cell; contributes nothing to a sum.
    Missing,
    /// Non-numeric text, kept verbatim so summation can report it.
    Invalid(String),
}

impl Weight {
    /// Parse a raw cell. Never fails; bad input becomes `Weight::Invalid`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Weight::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Weight::Value(value),
            _ => Weight::Invalid(trimmed.to_string()),
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Weight::Invalid(_))
    }
}

/// One row of the source table.
///
/// Empty text cells are stored as `None` (missing values).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    /// 1-indexed line in the source file, for error reporting.
    pub line: u64,
    pub area: Option<String>,
    pub label: Option<String>,
    pub category: Option<String>,
    pub created: Option<String>,
    pub weight: Weight,
}

/// The immutable dataset loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Where the rows came from.
    pub source: PathBuf,
    records: Vec<TicketRecord>,
    areas: Vec<String>,
    labels: Vec<String>,
}

impl Dataset {
    /// Build a dataset, recording the area and label universes in
    /// first-appearance order.
    pub fn new(source: PathBuf, records: Vec<TicketRecord>) -> Self {
        let areas = distinct_in_order(records.iter().filter_map(|r| r.area.as_deref()));
        let labels = distinct_in_order(records.iter().filter_map(|r| r.label.as_deref()));

        Self {
            source,
            records,
            areas,
            labels,
        }
    }

    pub fn records(&self) -> &[TicketRecord] {
        &self.records
    }

    /// Distinct non-missing `area` values, first-appearance order.
    pub fn areas(&self) -> &[String] {
        &self.areas
    }

    /// Distinct non-missing `LABEL` values, first-appearance order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_area(&self, area: &str) -> bool {
        self.areas.iter().any(|a| a == area)
    }

    /// Number of rows whose weight cell is non-numeric.
    pub fn invalid_weight_count(&self) -> usize {
        self.records.iter().filter(|r| r.weight.is_invalid()).count()
    }
}

/// Collect distinct values, keeping the order they first appear in.
pub fn distinct_in_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values {
        if seen.insert(value) {
            out.push(value.to_string());
        }
    }
    out
}

/// Which rows the dashboard shows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterSelector {
    /// Every row.
    All,
    /// Rows whose `area` equals this value.
    Area(String),
}

impl FilterSelector {
    /// Parse user text. The sentinel token (and an empty string) select all rows.
    pub fn parse(input: &str, sentinel: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == sentinel {
            FilterSelector::All
        } else {
            FilterSelector::Area(trimmed.to_string())
        }
    }

    pub fn matches(&self, record: &TicketRecord) -> bool {
        match self {
            FilterSelector::All => true,
            FilterSelector::Area(area) => record.area.as_deref() == Some(area.as_str()),
        }
    }

    /// The value used for this selector in a selector control.
    pub fn value<'a>(&'a self, sentinel: &'a str) -> &'a str {
        match self {
            FilterSelector::All => sentinel,
            FilterSelector::Area(area) => area,
        }
    }
}

impl fmt::Display for FilterSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterSelector::All => write!(f, "all areas"),
            FilterSelector::Area(area) => write!(f, "{}", area),
        }
    }
}

/// Which LABEL values get a series in the per-label view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LabelUniverse {
    /// Every label in the unfiltered dataset; labels without rows get an empty series.
    #[default]
    Dataset,
    /// Only labels present in the filtered rows.
    Selection,
}

/// Sort key giving date labels their natural (chronological) order.
///
/// Labels that parse as dates sort first, chronologically; the rest
/// follow in lexical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateKey {
    parsed: Option<NaiveDateTime>,
    raw: String,
}

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];

impl DateKey {
    pub fn new(raw: &str) -> Self {
        Self {
            parsed: parse_date_label(raw),
            raw: raw.to_string(),
        }
    }

    /// The label exactly as it appeared in the source.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

fn parse_date_label(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl Ord for DateKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.parsed, other.parsed) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.raw.cmp(&other.raw)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.raw.cmp(&other.raw),
        }
    }
}

impl PartialOrd for DateKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A single (date, value) point of a time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatePoint {
    pub date: String,
    pub value: f64,
}

/// View 1: summed weight per date for one LABEL value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSeries {
    pub label: String,
    pub points: Vec<DatePoint>,
}

impl LabelSeries {
    #[allow(dead_code)] // Utility for totals checks
    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }
}

/// View 2 entry: summed weight for one area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaTotal {
    pub area: String,
    pub total: f64,
}

/// View 3 entry: number of tickets created on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub count: usize,
}

/// View 4 entry: number of tickets in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// The four aggregate views for one selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardViews {
    /// Number of rows that passed the filter.
    pub rows_selected: usize,
    pub by_label: Vec<LabelSeries>,
    pub by_area: Vec<AreaTotal>,
    pub by_date: Vec<DailyCount>,
    pub by_category: Vec<CategoryCount>,
}

impl DashboardViews {
    /// True when every view has zero groups.
    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
            && self.by_area.is_empty()
            && self.by_date.is_empty()
            && self.by_category.is_empty()
    }
}

/// Metadata about a generated dashboard report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Path of the CSV the dataset was loaded from.
    pub source: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Selector value the views were computed for.
    pub selector: String,
    /// Rows in the full dataset.
    pub rows_total: usize,
    /// Rows that passed the filter.
    pub rows_selected: usize,
    /// Time spent computing, in seconds. The first report of a run also
    /// includes the time spent loading the dataset.
    pub duration_seconds: f64,
}

/// A dashboard snapshot ready to be rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub dashboard: Dashboard,
    pub views: DashboardViews,
}

/// Format a weight for display, dropping the fraction for whole numbers.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
