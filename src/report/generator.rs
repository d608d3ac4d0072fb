//! Markdown and JSON report generation.
//!
//! This module renders a dashboard snapshot as a Markdown document
//! (one table per chart) or as pretty-printed JSON.

use crate::config::ReportConfig;
use crate::dashboard::{ChartKind, ChartSpec, SelectorControl, Trace};
use crate::models::{DateKey, Report, ReportMetadata};
use anyhow::{Context, Result};
use std::collections::BTreeMap;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &ReportConfig) -> String {
    let mut output = String::new();

    // Title
    output.push_str(&format!("# {}\n\n", report.dashboard.title));

    // Metadata section
    output.push_str(&generate_metadata_section(&report.metadata));

    // Selector
    if options.include_selector {
        output.push_str(&generate_selector_section(&report.dashboard.selector));
    }

    // Charts in layout order
    for chart in &report.dashboard.charts {
        output.push_str(&generate_chart_section(chart, options));
    }

    // Footer
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** `{}`\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Selection:** {}\n", metadata.selector));
    section.push_str(&format!(
        "- **Tickets:** {} of {}\n",
        metadata.rows_selected, metadata.rows_total
    ));
    section.push_str(&format!(
        "- **Duration:** {:.3}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the selector options list.
fn generate_selector_section(selector: &SelectorControl) -> String {
    let mut section = String::new();

    section.push_str("## Areas\n\n");
    for option in &selector.options {
        let marker = if option.value == selector.selected {
            "**"
        } else {
            ""
        };
        if option.label == option.value {
            section.push_str(&format!("- {}{}{}\n", marker, option.label, marker));
        } else {
            section.push_str(&format!(
                "- {}{}{} (`{}`)\n",
                marker, option.label, marker, option.value
            ));
        }
    }
    section.push('\n');

    section
}

/// Generate the section for one chart.
fn generate_chart_section(chart: &ChartSpec, options: &ReportConfig) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", chart.title));
    section.push_str(&format!("*{} · `{}`*\n\n", kind_label(chart.kind), chart.id));

    if chart.is_empty() {
        section.push_str("No tickets for this selection.\n\n");
        return section;
    }

    let table = match chart.kind {
        ChartKind::GroupedBar => grouped_table(chart, options.include_empty_series),
        ChartKind::HorizontalBar => single_table(chart, true),
        ChartKind::Bar | ChartKind::Area => single_table(chart, false),
    };
    section.push_str(&table);
    section.push('\n');

    section
}

fn kind_label(kind: ChartKind) -> &'static str {
    match kind {
        ChartKind::GroupedBar => "Grouped bars",
        ChartKind::Bar => "Bars",
        ChartKind::HorizontalBar => "Horizontal bars",
        ChartKind::Area => "Area",
    }
}

fn column_title(title: &str, fallback: &str) -> String {
    if title.is_empty() {
        fallback.to_string()
    } else {
        title.to_string()
    }
}

/// Two-column table for a single-trace chart.
///
/// Horizontal bars carry their categories on the y axis.
fn single_table(chart: &ChartSpec, horizontal: bool) -> String {
    let mut table = String::new();

    let (key_title, value_title) = if horizontal {
        (column_title(&chart.x_axis_title, "Área"), "Total".to_string())
    } else {
        (column_title(&chart.x_axis_title, "Valor"), column_title(&chart.y_axis_title, "Total"))
    };

    table.push_str(&format!("| {} | {} |\n", key_title, value_title));
    table.push_str("|:---|---:|\n");

    for trace in &chart.traces {
        let (keys, values) = if horizontal {
            (&trace.y, &trace.x)
        } else {
            (&trace.x, &trace.y)
        };
        for (key, value) in keys.iter().zip(values) {
            table.push_str(&format!(
                "| {} | {} |\n",
                escape_cell(&key.display()),
                escape_cell(&value.display())
            ));
        }
    }

    table
}

/// Escape text so it stays inside one Markdown table cell.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Pivot table for a grouped chart: one row per x value, one column per trace.
fn grouped_table(chart: &ChartSpec, include_empty: bool) -> String {
    let traces: Vec<&Trace> = chart
        .traces
        .iter()
        .filter(|t| include_empty || !t.x.is_empty())
        .collect();

    let mut rows: BTreeMap<DateKey, Vec<String>> = BTreeMap::new();
    for (column, trace) in traces.iter().enumerate() {
        for (x, y) in trace.x.iter().zip(&trace.y) {
            let cells = rows
                .entry(DateKey::new(&x.display()))
                .or_insert_with(|| vec!["-".to_string(); traces.len()]);
            cells[column] = escape_cell(&y.display());
        }
    }

    let mut table = String::new();
    let names: Vec<String> = traces
        .iter()
        .map(|t| escape_cell(t.name.as_deref().unwrap_or_default()))
        .collect();

    table.push_str(&format!(
        "| {} | {} |\n",
        column_title(&chart.x_axis_title, "Fecha"),
        names.join(" | ")
    ));
    table.push_str(&format!("|:---|{}\n", "---:|".repeat(names.len())));

    for (key, cells) in rows {
        table.push_str(&format!(
            "| {} | {} |\n",
            escape_cell(key.raw()),
            cells.join(" | ")
        ));
    }

    table
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by ticketdash v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")
}
