//! Ticket filtering and aggregation.
//!
//! This module turns the loaded dataset plus an area selector into the
//! four views the dashboard charts. Everything here is a pure function
//! of its inputs; the dataset is never mutated.

use crate::error::DashboardError;
use crate::models::{
    AreaTotal, CategoryCount, DailyCount, Dataset, DashboardViews, DateKey, DatePoint,
    FilterSelector, LabelSeries, LabelUniverse, TicketRecord, Weight,
};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Compute all four views with the default label policy.
#[allow(dead_code)] // The CLI always passes the configured policy
pub fn compute(
    dataset: &Dataset,
    selector: &FilterSelector,
) -> Result<DashboardViews, DashboardError> {
    compute_with(dataset, selector, LabelUniverse::default())
}

/// Compute all four views for `selector`.
///
/// Fails only when a summed row carries a non-numeric weight.
pub fn compute_with(
    dataset: &Dataset,
    selector: &FilterSelector,
    universe: LabelUniverse,
) -> Result<DashboardViews, DashboardError> {
    let rows = filter_records(dataset, selector);
    debug!(
        "Selector '{}' kept {} of {} rows",
        selector,
        rows.len(),
        dataset.len()
    );

    Ok(DashboardViews {
        rows_selected: rows.len(),
        by_label: label_series(dataset, &rows, universe)?,
        by_area: area_totals(&rows)?,
        by_date: daily_counts(&rows),
        by_category: category_counts(&rows),
    })
}

/// Rows matching the selector, in their original order.
pub fn filter_records<'a>(dataset: &'a Dataset, selector: &FilterSelector) -> Vec<&'a TicketRecord> {
    dataset
        .records()
        .iter()
        .filter(|r| selector.matches(r))
        .collect()
}

/// Add a row's weight to a running sum.
fn accumulate(sum: &mut f64, record: &TicketRecord) -> Result<(), DashboardError> {
    match &record.weight {
        Weight::Value(value) => *sum += value,
        Weight::Missing => {}
        Weight::Invalid(raw) => {
            return Err(DashboardError::InvalidWeight {
                line: record.line,
                value: raw.clone(),
            })
        }
    }
    Ok(())
}

/// View 1: per-label, per-date summed weight.
///
/// With `LabelUniverse::Dataset` every label of the unfiltered dataset
/// gets a series, possibly empty. An empty selection yields no series.
pub fn label_series(
    dataset: &Dataset,
    rows: &[&TicketRecord],
    universe: LabelUniverse,
) -> Result<Vec<LabelSeries>, DashboardError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut grouped: HashMap<&str, BTreeMap<DateKey, f64>> = HashMap::new();
    for record in rows {
        let (Some(label), Some(created)) = (record.label.as_deref(), record.created.as_deref())
        else {
            continue;
        };
        let sum = grouped
            .entry(label)
            .or_default()
            .entry(DateKey::new(created))
            .or_insert(0.0);
        accumulate(sum, record)?;
    }

    let labels: Vec<String> = match universe {
        LabelUniverse::Dataset => dataset.labels().to_vec(),
        LabelUniverse::Selection => {
            crate::models::distinct_in_order(rows.iter().filter_map(|r| r.label.as_deref()))
        }
    };

    let series = labels
        .into_iter()
        .map(|label| {
            let points = grouped
                .remove(label.as_str())
                .unwrap_or_default()
                .into_iter()
                .map(|(date, value)| DatePoint {
                    date: date.raw().to_string(),
                    value,
                })
                .collect();
            LabelSeries { label, points }
        })
        .collect();

    Ok(series)
}

/// View 2: summed weight per area, in lexical area order.
pub fn area_totals(rows: &[&TicketRecord]) -> Result<Vec<AreaTotal>, DashboardError> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();

    for record in rows {
        if let Some(area) = record.area.as_deref() {
            accumulate(totals.entry(area).or_insert(0.0), record)?;
        }
    }

    Ok(totals
        .into_iter()
        .map(|(area, total)| AreaTotal {
            area: area.to_string(),
            total,
        })
        .collect())
}

/// View 3: number of rows per creation date, in natural date order.
pub fn daily_counts(rows: &[&TicketRecord]) -> Vec<DailyCount> {
    let mut counts: BTreeMap<DateKey, usize> = BTreeMap::new();

    for created in rows.iter().filter_map(|r| r.created.as_deref()) {
        *counts.entry(DateKey::new(created)).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(date, count)| DailyCount {
            date: date.raw().to_string(),
            count,
        })
        .collect()
}

/// View 4: rows per category, most frequent first.
///
/// Equal counts keep the order in which categories were first seen.
pub fn category_counts(rows: &[&TicketRecord]) -> Vec<CategoryCount> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<CategoryCount> = Vec::new();

    for category in rows.iter().filter_map(|r| r.category.as_deref()) {
        match position.get(category) {
            Some(&idx) => counts[idx].count += 1,
            None => {
                position.insert(category, counts.len());
                counts.push(CategoryCount {
                    category: category.to_string(),
                    count: 1,
                });
            }
        }
    }

    // sort_by is stable
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ticket(line: u64, area: &str, label: &str, category: &str, date: &str, weight: f64) -> TicketRecord {
        TicketRecord {
            line,
            area: Some(area.to_string()),
            label: Some(label.to_string()),
            category: Some(category.to_string()),
            created: Some(date.to_string()),
            weight: Weight::Value(weight),
        }
    }

    fn grand_total(dataset: &Dataset) -> Result<f64, DashboardError> {
        let mut sum = 0.0;
        for record in dataset.records() {
            accumulate(&mut sum, record)?;
        }
        Ok(sum)
    }

    fn worked_example() -> Dataset {
        Dataset::new(
            PathBuf::from("example.csv"),
            vec![
                ticket(2, "IT", "P1", "Bug", "2023-01-01", 2.0),
                ticket(3, "IT", "P2", "Bug", "2023-01-01", 3.0),
                ticket(4, "HR", "P1", "Request", "2023-01-02", 1.0),
            ],
        )
    }

    fn area(name: &str) -> FilterSelector {
        FilterSelector::Area(name.to_string())
    }

    fn areas(views: &DashboardViews) -> Vec<(&str, f64)> {
        views.by_area.iter().map(|a| (a.area.as_str(), a.total)).collect()
    }

    fn dates(views: &DashboardViews) -> Vec<(&str, usize)> {
        views.by_date.iter().map(|d| (d.date.as_str(), d.count)).collect()
    }

    fn categories(views: &DashboardViews) -> Vec<(&str, usize)> {
        views
            .by_category
            .iter()
            .map(|c| (c.category.as_str(), c.count))
            .collect()
    }

    #[test]
    fn test_worked_example_all() {
        let views = compute(&worked_example(), &FilterSelector::All).unwrap();

        assert_eq!(views.rows_selected, 3);
        assert_eq!(areas(&views), [("HR", 1.0), ("IT", 5.0)]);
        assert_eq!(dates(&views), [("2023-01-01", 2), ("2023-01-02", 1)]);
        assert_eq!(categories(&views), [("Bug", 2), ("Request", 1)]);

        assert_eq!(views.by_label.len(), 2);
        assert_eq!(views.by_label[0].label, "P1");
        assert_eq!(
            views.by_label[0].points,
            vec![
                DatePoint { date: "2023-01-01".to_string(), value: 2.0 },
                DatePoint { date: "2023-01-02".to_string(), value: 1.0 },
            ]
        );
        assert_eq!(views.by_label[1].label, "P2");
        assert_eq!(views.by_label[1].total(), 3.0);
    }

    #[test]
    fn test_worked_example_single_area() {
        let views = compute(&worked_example(), &area("IT")).unwrap();

        assert_eq!(views.rows_selected, 2);
        assert_eq!(areas(&views), [("IT", 5.0)]);
        assert_eq!(dates(&views), [("2023-01-01", 2)]);
        assert_eq!(categories(&views), [("Bug", 2)]);
    }

    #[test]
    fn test_absent_selector_gives_empty_views() {
        let views = compute(&worked_example(), &area("Finance")).unwrap();
        assert!(views.is_empty());
        assert_eq!(views.rows_selected, 0);
    }

    #[test]
    fn test_empty_dataset_gives_empty_views() {
        let dataset = Dataset::new(PathBuf::from("empty.csv"), Vec::new());
        let views = compute(&dataset, &FilterSelector::All).unwrap();
        assert!(views.is_empty());
    }

    #[test]
    fn test_compute_is_idempotent() {
        let dataset = worked_example();
        let first = compute(&dataset, &area("IT")).unwrap();
        let second = compute(&dataset, &area("IT")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_all_selector_matches_direct_totals() {
        let dataset = worked_example();
        let views = compute(&dataset, &FilterSelector::All).unwrap();

        let area_sum: f64 = views.by_area.iter().map(|a| a.total).sum();
        let label_sum: f64 = views.by_label.iter().map(LabelSeries::total).sum();
        let category_rows: usize = views.by_category.iter().map(|c| c.count).sum();

        assert_eq!(area_sum, grand_total(&dataset).unwrap());
        assert_eq!(label_sum, area_sum);
        assert_eq!(category_rows, dataset.len());
    }

    #[test]
    fn test_selected_views_match_independent_filter() {
        let dataset = worked_example();
        for name in dataset.areas() {
            let views = compute(&dataset, &area(name)).unwrap();
            let expected: f64 = dataset
                .records()
                .iter()
                .filter(|r| r.area.as_deref() == Some(name.as_str()))
                .map(|r| match r.weight {
                    Weight::Value(v) => v,
                    _ => 0.0,
                })
                .sum();

            assert_eq!(views.by_area.len(), 1);
            assert_eq!(views.by_area[0].area, *name);
            assert_eq!(views.by_area[0].total, expected);

            let category_rows: usize = views.by_category.iter().map(|c| c.count).sum();
            assert_eq!(category_rows, views.rows_selected);
            for entry in &views.by_category {
                let independent = dataset
                    .records()
                    .iter()
                    .filter(|r| r.area.as_deref() == Some(name.as_str()))
                    .filter(|r| r.category.as_deref() == Some(entry.category.as_str()))
                    .count();
                assert_eq!(entry.count, independent, "{} / {}", name, entry.category);
            }
        }
    }

    #[test]
    fn test_daily_counts_ignore_weights() {
        let dataset = Dataset::new(
            PathBuf::from("w.csv"),
            vec![
                ticket(2, "IT", "P1", "Bug", "2023-01-01", 100.0),
                ticket(3, "IT", "P1", "Bug", "2023-01-01", 0.5),
                ticket(4, "IT", "P1", "Bug", "2023-01-02", 7.0),
            ],
        );
        let views = compute(&dataset, &FilterSelector::All).unwrap();
        assert_eq!(dates(&views), [("2023-01-01", 2), ("2023-01-02", 1)]);
    }

    #[test]
    fn test_category_ties_keep_first_seen_order() {
        let dataset = Dataset::new(
            PathBuf::from("c.csv"),
            vec![
                ticket(2, "IT", "P1", "Zeta", "2023-01-01", 1.0),
                ticket(3, "IT", "P1", "Alpha", "2023-01-01", 1.0),
                ticket(4, "IT", "P1", "Mid", "2023-01-01", 1.0),
                ticket(5, "IT", "P1", "Mid", "2023-01-01", 1.0),
            ],
        );
        let views = compute(&dataset, &FilterSelector::All).unwrap();
        assert_eq!(categories(&views), [("Mid", 2), ("Zeta", 1), ("Alpha", 1)]);
    }

    #[test]
    fn test_dates_sort_chronologically() {
        let dataset = Dataset::new(
            PathBuf::from("d.csv"),
            vec![
                ticket(2, "IT", "P1", "Bug", "15/02/2023", 1.0),
                ticket(3, "IT", "P1", "Bug", "03/01/2023", 1.0),
                ticket(4, "IT", "P1", "Bug", "20/01/2023", 1.0),
            ],
        );
        let views = compute(&dataset, &FilterSelector::All).unwrap();
        assert_eq!(
            dates(&views),
            [("03/01/2023", 1), ("20/01/2023", 1), ("15/02/2023", 1)]
        );
        let series_dates: Vec<_> = views.by_label[0].points.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(series_dates, ["03/01/2023", "20/01/2023", "15/02/2023"]);
    }

    #[test]
    fn test_label_universe_policies() {
        let dataset = worked_example();

        let keep_all = compute_with(&dataset, &area("HR"), LabelUniverse::Dataset).unwrap();
        let labels: Vec<_> = keep_all.by_label.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["P1", "P2"]);
        assert!(keep_all.by_label[1].points.is_empty());

        let selection = compute_with(&dataset, &area("HR"), LabelUniverse::Selection).unwrap();
        let labels: Vec<_> = selection.by_label.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["P1"]);
        assert_eq!(selection.by_label[0].total(), 1.0);
    }

    #[test]
    fn test_invalid_weight_fails_only_when_summed() {
        let mut bad = ticket(5, "HR", "P3", "Request", "2023-01-03", 0.0);
        bad.weight = Weight::Invalid("many".to_string());
        let mut rows = worked_example().records().to_vec();
        rows.push(bad);
        let dataset = Dataset::new(PathBuf::from("bad.csv"), rows);

        match compute(&dataset, &FilterSelector::All) {
            Err(DashboardError::InvalidWeight { line, value }) => {
                assert_eq!(line, 5);
                assert_eq!(value, "many");
            }
            other => panic!("expected InvalidWeight, got {:?}", other),
        }
        assert!(compute(&dataset, &area("HR")).is_err());

        let it = compute(&dataset, &area("IT")).unwrap();
        assert_eq!(areas(&it), [("IT", 5.0)]);
    }

    #[test]
    fn test_missing_values_are_dropped_from_groups() {
        let mut no_area = ticket(2, "IT", "P1", "Bug", "2023-01-01", 4.0);
        no_area.area = None;
        let mut no_date = ticket(3, "IT", "P1", "Bug", "2023-01-01", 1.0);
        no_date.created = None;
        let mut no_weight = ticket(4, "IT", "P1", "Bug", "2023-01-01", 0.0);
        no_weight.weight = Weight::Missing;
        let dataset = Dataset::new(PathBuf::from("m.csv"), vec![no_area, no_date, no_weight]);

        let views = compute(&dataset, &FilterSelector::All).unwrap();
        assert_eq!(views.rows_selected, 3);
        assert_eq!(areas(&views), [("IT", 1.0)]);
        assert_eq!(dates(&views), [("2023-01-01", 2)]);
        assert_eq!(categories(&views), [("Bug", 3)]);
        assert_eq!(views.by_label[0].points.len(), 1);
        assert_eq!(views.by_label[0].points[0].value, 4.0);
    }

    #[test]
    fn test_fixture_views() {
        let config = crate::config::DataConfig {
            path: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/tickets.csv"),
            ..Default::default()
        };
        let dataset =
            crate::dataset::load_dataset(&config, &crate::dataset::LoadOptions::default()).unwrap();

        let all = compute(&dataset, &FilterSelector::All).unwrap();
        assert_eq!(
            areas(&all),
            [("Administración", 4.0), ("Operaciones", 5.0), ("Sistemas", 8.0)]
        );
        assert_eq!(
            categories(&all),
            [("Incidente", 5), ("Petición", 3), ("Consulta", 2)]
        );
        assert_eq!(
            dates(&all),
            [("2023-03-01", 4), ("2023-03-02", 3), ("2023-03-03", 3)]
        );

        let sistemas = compute(&dataset, &area("Sistemas")).unwrap();
        assert_eq!(
            categories(&sistemas),
            [("Incidente", 3), ("Petición", 1), ("Consulta", 1)]
        );

        let ops = compute(&dataset, &area("Operaciones")).unwrap();
        let portal = ops.by_label.iter().find(|s| s.label == "PORTAL").unwrap();
        assert!(portal.points.is_empty());
    }
}
