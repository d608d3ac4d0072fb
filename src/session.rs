//! Dashboard session: a loaded dataset plus the settings to render it.
//!
//! Every selection goes through `Session::build_report`, which runs the
//! aggregation once and wraps the result for rendering. The interactive
//! loop feeds it one selection per input line.

use crate::analysis::compute_with;
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::dashboard::{build_dashboard, build_selector};
use crate::error::DashboardError;
use crate::models::{Dataset, FilterSelector, Report, ReportMetadata};
use crate::report;
use anyhow::Result;
use chrono::Utc;
use std::cell::Cell;
use std::future::Future;
use std::io::Write;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// A loaded dataset and the configuration used to present it.
pub struct Session {
    dataset: Dataset,
    config: Config,
    /// Load time not yet charged to a report.
    pending_load_time: Cell<Duration>,
}

impl Session {
    pub fn new(dataset: Dataset, config: Config, load_time: Duration) -> Self {
        Self {
            dataset,
            config,
            pending_load_time: Cell::new(load_time),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Turn user input into a selector, honoring the configured "all" value.
    pub fn parse_selector(&self, input: &str) -> FilterSelector {
        FilterSelector::parse(input, &self.config.dashboard.all_value)
    }

    /// Compute the views for `selector` and wrap them in a report.
    pub fn build_report(&self, selector: &FilterSelector) -> Result<Report, DashboardError> {
        let start = Instant::now();

        if let FilterSelector::Area(area) = selector {
            if !self.dataset.has_area(area) {
                warn!("Area '{}' does not appear in the dataset", area);
            }
        }

        let views = compute_with(
            &self.dataset,
            selector,
            self.config.dashboard.label_universe,
        )?;
        let dashboard = build_dashboard(&self.dataset, selector, &views, &self.config.dashboard);
        // Only the first report includes the time spent loading.
        let elapsed = start.elapsed() + self.pending_load_time.take();

        debug!(
            "Computed views for '{}' in {:?}",
            selector,
            start.elapsed()
        );

        Ok(Report {
            metadata: ReportMetadata {
                source: self.dataset.source.display().to_string(),
                generated_at: Utc::now(),
                selector: selector.value(&self.config.dashboard.all_value).to_string(),
                rows_total: self.dataset.len(),
                rows_selected: views.rows_selected,
                duration_seconds: elapsed.as_secs_f64(),
            },
            dashboard,
            views,
        })
    }

    /// Render a report in the requested format.
    pub fn render(&self, report: &Report, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => report::generate_json_report(report),
            OutputFormat::Markdown => Ok(report::generate_markdown_report(
                report,
                &self.config.report,
            )),
        }
    }

    /// Selectable areas, one `value<TAB>label` line per option.
    pub fn area_listing(&self) -> String {
        let control = build_selector(&self.dataset, &FilterSelector::All, &self.config.dashboard);
        control
            .options
            .iter()
            .map(|o| format!("{}\t{}\n", o.value, o.label))
            .collect()
    }
}

/// Outcome of an interactive run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractiveSummary {
    /// Selections rendered successfully.
    pub rendered: usize,
    /// Selections whose computation failed.
    pub failed: usize,
    /// Whether the loop stopped because of `shutdown`.
    pub interrupted: bool,
}

fn is_exit_command(line: &str) -> bool {
    matches!(line, "quit" | "exit" | ":q")
}

/// Read selectors line by line and render a report for each.
///
/// Selections are processed strictly one after another. A failing
/// selection is reported on `out` and the loop continues. Stops at EOF,
/// on `quit`/`exit`, or when `shutdown` resolves.
pub async fn run_interactive<R, W, S>(
    session: &Session,
    input: R,
    out: &mut W,
    format: OutputFormat,
    shutdown: S,
) -> Result<InteractiveSummary>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    S: Future<Output = ()>,
{
    let mut summary = InteractiveSummary::default();
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    write!(out, "{}", session.area_listing())?;
    writeln!(
        out,
        "Enter an area (blank or '{}' for all, 'quit' to exit):",
        session.config().dashboard.all_value
    )?;
    out.flush()?;

    loop {
        let line = tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Interrupted, leaving interactive mode");
                summary.interrupted = true;
                break;
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            debug!("End of input");
            break;
        };

        let trimmed = line.trim();
        if is_exit_command(trimmed) {
            break;
        }

        let selector = session.parse_selector(trimmed);
        match session.build_report(&selector) {
            Ok(report) => {
                let rendered = session.render(&report, format)?;
                writeln!(out, "{}", rendered)?;
                summary.rendered += 1;
            }
            Err(e) => {
                warn!("Selection '{}' failed: {}", selector, e);
                writeln!(out, "Error: {}", e)?;
                summary.failed += 1;
            }
        }
        out.flush()?;
    }

    Ok(summary)
}
