//! Chart descriptors and the area selector control.
//!
//! This module turns computed views into presentation-neutral figure
//! descriptions. Rendering them is left to whatever plotting layer
//! consumes the JSON report.

use crate::config::DashboardConfig;
use crate::models::{format_value, DashboardViews, Dataset, FilterSelector};
use serde::{Deserialize, Serialize};

/// Kind of chart a descriptor should be drawn as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Vertical bars, one group per x value, one bar per trace.
    GroupedBar,
    /// Vertical bars with a single trace.
    Bar,
    /// Horizontal bars; categories on the y axis.
    HorizontalBar,
    /// Filled area under a line.
    Area,
}

/// One data series of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub x: Vec<AxisValue>,
    pub y: Vec<AxisValue>,
}

/// A point coordinate: category text or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisValue {
    Number(f64),
    Text(String),
}

impl AxisValue {
    pub fn display(&self) -> String {
        match self {
            AxisValue::Number(n) => format_value(*n),
            AxisValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for AxisValue {
    fn from(s: &str) -> Self {
        AxisValue::Text(s.to_string())
    }
}

impl From<f64> for AxisValue {
    fn from(n: f64) -> Self {
        AxisValue::Number(n)
    }
}

impl From<usize> for AxisValue {
    fn from(n: usize) -> Self {
        AxisValue::Number(n as f64)
    }
}

/// A complete figure description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Stable identifier of the chart slot.
    pub id: String,
    pub kind: ChartKind,
    pub title: String,
    pub x_axis_title: String,
    pub y_axis_title: String,
    pub traces: Vec<Trace>,
}

impl ChartSpec {
    pub fn is_empty(&self) -> bool {
        self.traces.iter().all(|t| t.x.is_empty())
    }
}

/// One entry of the area dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorOption {
    pub label: String,
    pub value: String,
}

/// The area dropdown: options plus the current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorControl {
    pub options: Vec<SelectorOption>,
    pub selected: String,
}

/// Everything needed to draw the dashboard for one selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub title: String,
    pub selector: SelectorControl,
    pub charts: Vec<ChartSpec>,
}

pub const PROJECT_CHART_ID: &str = "proyecto_plot";
pub const CATEGORY_CHART_ID: &str = "categoria_plot";
pub const TOTALS_CHART_ID: &str = "totales_plot";
pub const AREA_CHART_ID: &str = "area_plot";

/// Build the dropdown: the "all" option first, then every area in
/// first-appearance order.
pub fn build_selector(
    dataset: &Dataset,
    selected: &FilterSelector,
    config: &DashboardConfig,
) -> SelectorControl {
    let mut options = Vec::with_capacity(dataset.areas().len() + 1);
    options.push(SelectorOption {
        label: config.all_label.clone(),
        value: config.all_value.clone(),
    });
    options.extend(dataset.areas().iter().map(|area| SelectorOption {
        label: area.clone(),
        value: area.clone(),
    }));

    SelectorControl {
        options,
        selected: selected.value(&config.all_value).to_string(),
    }
}

/// Build the four chart descriptors in layout order.
pub fn build_charts(views: &DashboardViews, config: &DashboardConfig) -> Vec<ChartSpec> {
    vec![
        project_chart(views, config),
        category_chart(views, config),
        totals_chart(views, config),
        area_chart(views, config),
    ]
}

/// Build the whole dashboard snapshot.
pub fn build_dashboard(
    dataset: &Dataset,
    selector: &FilterSelector,
    views: &DashboardViews,
    config: &DashboardConfig,
) -> Dashboard {
    Dashboard {
        title: config.title.clone(),
        selector: build_selector(dataset, selector, config),
        charts: build_charts(views, config),
    }
}

fn project_chart(views: &DashboardViews, config: &DashboardConfig) -> ChartSpec {
    let traces = views
        .by_label
        .iter()
        .map(|series| Trace {
            name: Some(series.label.clone()),
            x: series.points.iter().map(|p| p.date.as_str().into()).collect(),
            y: series.points.iter().map(|p| p.value.into()).collect(),
        })
        .collect();

    ChartSpec {
        id: PROJECT_CHART_ID.to_string(),
        kind: ChartKind::GroupedBar,
        title: config.titles.project.clone(),
        x_axis_title: "Fecha".to_string(),
        y_axis_title: String::new(),
        traces,
    }
}

fn category_chart(views: &DashboardViews, config: &DashboardConfig) -> ChartSpec {
    ChartSpec {
        id: CATEGORY_CHART_ID.to_string(),
        kind: ChartKind::Bar,
        title: config.titles.category.clone(),
        x_axis_title: "Cantidad".to_string(),
        y_axis_title: String::new(),
        traces: vec![Trace {
            name: None,
            x: views.by_category.iter().map(|c| c.category.as_str().into()).collect(),
            y: views.by_category.iter().map(|c| c.count.into()).collect(),
        }],
    }
}

fn totals_chart(views: &DashboardViews, config: &DashboardConfig) -> ChartSpec {
    ChartSpec {
        id: TOTALS_CHART_ID.to_string(),
        kind: ChartKind::Area,
        title: config.titles.totals.clone(),
        x_axis_title: "Fecha".to_string(),
        y_axis_title: "Recuento".to_string(),
        traces: vec![Trace {
            name: None,
            x: views.by_date.iter().map(|d| d.date.as_str().into()).collect(),
            y: views.by_date.iter().map(|d| d.count.into()).collect(),
        }],
    }
}

fn area_chart(views: &DashboardViews, config: &DashboardConfig) -> ChartSpec {
    // Horizontal: values along x, area names along y.
    ChartSpec {
        id: AREA_CHART_ID.to_string(),
        kind: ChartKind::HorizontalBar,
        title: config.titles.area.clone(),
        x_axis_title: "Área".to_string(),
        y_axis_title: String::new(),
        traces: vec![Trace {
            name: None,
            x: views.by_area.iter().map(|a| a.total.into()).collect(),
            y: views.by_area.iter().map(|a| a.area.as_str().into()).collect(),
        }],
    }
}
