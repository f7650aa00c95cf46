// Series Builder
// Turns the selected (country, category) pairs into plottable series:
// the grey "Current" reference diagonal first, then one series per pair,
// each optionally followed by its trend estimate.

use crate::calendar::{from_millis, months_between, to_millis};
use crate::dataset::{DateType, Dataset, Record};
use crate::estimate::estimate;
use crate::palette::{estimate_color, series_color, Rgb, REFERENCE_COLOR};
use crate::selection::{Lookback, SeriesEntry};
use chrono::NaiveDateTime;
use serde::Serialize;

pub const REFERENCE_NAME: &str = "Current";

// ============================================================================
// TYPES
// ============================================================================

/// One observation before null filtering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub x: f64,
    pub y: Option<f64>,
}

impl ChartPoint {
    pub fn from_record(record: &Record, date_type: DateType) -> Self {
        ChartPoint {
            x: to_millis(record.date),
            y: record.cutoff(date_type).map(to_millis),
        }
    }

    /// Drops the point when there is no cutoff
    pub fn plotted(&self) -> Option<(f64, f64)> {
        self.y.map(|y| (self.x, y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    /// "today" diagonal, y == x
    Reference,
    /// Published cutoff dates
    Observed,
    /// Projected continuation of an observed series
    Estimate,
}

/// Named point sequence handed to a renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub kind: SeriesKind,
    pub color: Rgb,
    /// (bulletin month, cutoff) in epoch milliseconds
    pub points: Vec<(f64, f64)>,
}

impl Series {
    pub fn last_x(&self) -> Option<f64> {
        self.points.last().map(|p| p.0)
    }
}

/// What the chart shows besides the selected pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChartOptions {
    pub date_type: DateType,
    /// `Some` when trend estimates are switched on
    pub estimate: Option<Lookback>,
}

// ============================================================================
// BUILDERS
// ============================================================================

/// Reference series followed by one observed series per selected pair
pub fn build_series(
    dataset: &Dataset,
    selection: &[SeriesEntry],
    date_type: DateType,
) -> Vec<Series> {
    let mut series = Vec::with_capacity(selection.len() + 1);
    series.push(reference_series(dataset, None));

    for (index, entry) in selection.iter().enumerate() {
        series.push(observed_series(dataset, entry, date_type, index));
    }

    series
}

/// `build_series` plus trend estimates when `options.estimate` is set.
///
/// Each estimate follows its observed series; the reference line is
/// stretched to the end of the furthest projection.
pub fn build_chart(
    dataset: &Dataset,
    selection: &[SeriesEntry],
    options: &ChartOptions,
) -> Vec<Series> {
    let mut body = Vec::with_capacity(selection.len() * 2);
    let mut horizon: Option<f64> = None;

    for (index, entry) in selection.iter().enumerate() {
        let observed = observed_series(dataset, entry, options.date_type, index);
        let projection = options
            .estimate
            .and_then(|lookback| estimate(&observed.points, lookback));
        let label = observed.name.clone();
        body.push(observed);

        if let Some(points) = projection {
            if let Some(&(x, _)) = points.last() {
                horizon = Some(horizon.map_or(x, |h: f64| h.max(x)));
            }
            body.push(Series {
                name: format!("{} (Estimate)", label),
                kind: SeriesKind::Estimate,
                color: estimate_color(index),
                points,
            });
        }
    }

    let extend_to = horizon.and_then(from_millis);
    let mut series = Vec::with_capacity(body.len() + 1);
    series.push(reference_series(dataset, extend_to));
    series.extend(body);
    series
}

/// One point per month from the first bulletin to the last (or `extend_to`
/// when that is later), with y equal to the month itself
pub fn reference_series(dataset: &Dataset, extend_to: Option<NaiveDateTime>) -> Series {
    let points = match dataset.date_range() {
        Some((min, max)) => {
            let end = extend_to.map_or(max, |e| e.max(max));
            months_between(min, end)
                .into_iter()
                .map(|month| {
                    let t = to_millis(month);
                    (t, t)
                })
                .collect()
        }
        None => Vec::new(),
    };

    Series {
        name: REFERENCE_NAME.to_string(),
        kind: SeriesKind::Reference,
        color: REFERENCE_COLOR,
        points,
    }
}

/// Cutoff series for one pair, labeled with the dataset's own spelling
pub fn observed_series(
    dataset: &Dataset,
    entry: &SeriesEntry,
    date_type: DateType,
    index: usize,
) -> Series {
    let mut matching: Vec<&Record> = dataset
        .records_for(&entry.country, &entry.category)
        .collect();
    matching.sort_by_key(|r| r.date);

    let points = matching
        .iter()
        .filter_map(|r| ChartPoint::from_record(r, date_type).plotted())
        .collect();

    Series {
        name: series_label(dataset, entry),
        kind: SeriesKind::Observed,
        color: series_color(index),
        points,
    }
}

pub fn series_label(dataset: &Dataset, entry: &SeriesEntry) -> String {
    let country = dataset
        .canonical_country(&entry.country)
        .unwrap_or(&entry.country);
    let category = dataset
        .canonical_category(&entry.category)
        .unwrap_or(&entry.category);
    format!("{}/{}", country, category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{add_months, bulletin_month, parse_cutoff};
    use crate::dataset::RawRow;
    use crate::estimate::TrendLine;
    use chrono::{Duration, NaiveDate};

    fn row(
        year: i32,
        month: u32,
        country: &str,
        category: &str,
        filing: Option<&str>,
        final_action: Option<&str>,
    ) -> RawRow {
        RawRow {
            year: year.to_string(),
            month: month.to_string(),
            category: category.to_string(),
            country: country.to_string(),
            filing_date: filing.map(str::to_string),
            final_action_date: final_action.map(str::to_string),
        }
    }

    /// India/EB2 for every month of 2023, filing date advancing one month
    /// per bulletin from 2022-01-01
    fn india_eb2_2023() -> Dataset {
        let mut rows = Vec::new();
        for month in 1..=12u32 {
            let filing = format!("2022-{:02}-01", month);
            rows.push(row(2023, month, "India", "EB2", Some(&filing), None));
        }
        // a second pair plus some noise rows
        rows.push(row(2023, 1, "China", "EB2", Some("2019-01-01"), Some("2018-01-01")));
        rows.push(row(2023, 2, "China", "EB2", None, Some("2018-02-01")));
        Dataset::from_rows(rows)
    }

    #[test]
    fn test_reference_series_is_first_and_diagonal() {
        let dataset = india_eb2_2023();
        let series = build_series(&dataset, &[], DateType::FilingDate);

        assert_eq!(series.len(), 1);
        let reference = &series[0];
        assert_eq!(reference.kind, SeriesKind::Reference);
        assert_eq!(reference.name, REFERENCE_NAME);
        assert_eq!(reference.color, REFERENCE_COLOR);
        assert_eq!(reference.points.len(), 12);
        assert!(reference.points.iter().all(|(x, y)| x == y));
        assert_eq!(reference.points[0].0, to_millis(bulletin_month(2023, 1).unwrap()));
    }

    #[test]
    fn test_example_pair_yields_twelve_increasing_points() {
        let dataset = india_eb2_2023();
        let selection = vec![SeriesEntry::new("india", "eb2")];
        let series = build_series(&dataset, &selection, DateType::FilingDate);

        assert_eq!(series.len(), 2);
        let india = &series[1];
        assert_eq!(india.name, "India/EB2");
        assert_eq!(india.kind, SeriesKind::Observed);
        assert_eq!(india.points.len(), 12);
        assert!(india.points.windows(2).all(|w| w[1].0 > w[0].0));

        let first_cutoff = from_millis(india.points[0].1).unwrap();
        assert_eq!(first_cutoff.date(), chrono::NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
    }

    #[test]
    fn test_points_without_cutoff_are_dropped() {
        let dataset = india_eb2_2023();
        let selection = vec![SeriesEntry::new("China", "EB2")];

        let filing = build_series(&dataset, &selection, DateType::FilingDate);
        assert_eq!(filing[1].points.len(), 1);

        let final_action = build_series(&dataset, &selection, DateType::FinalActionDate);
        assert_eq!(final_action[1].points.len(), 2);

        let india_final = build_series(
            &dataset,
            &[SeriesEntry::new("India", "EB2")],
            DateType::FinalActionDate,
        );
        assert!(india_final[1].points.is_empty());
    }

    #[test]
    fn test_points_are_chronological_even_if_rows_are_not() {
        let rows = vec![
            row(2023, 3, "India", "EB3", Some("2012-03-01"), None),
            row(2023, 1, "India", "EB3", Some("2012-01-01"), None),
            row(2023, 2, "India", "EB3", Some("2012-02-01"), None),
        ];
        let dataset = Dataset::from_rows(rows);
        let entries = [SeriesEntry::new("India", "EB3")];
        let series = build_series(&dataset, &entries, DateType::FilingDate);

        assert!(series[1].points.windows(2).all(|w| w[1].0 > w[0].0));
    }

    #[test]
    fn test_unknown_pair_gives_empty_series_with_input_label() {
        let dataset = india_eb2_2023();
        let entries = [SeriesEntry::new("Atlantis", "EB9")];
        let series = build_series(&dataset, &entries, DateType::FilingDate);

        assert_eq!(series[1].name, "Atlantis/EB9");
        assert!(series[1].points.is_empty());
    }

    #[test]
    fn test_colors_follow_series_index() {
        let dataset = india_eb2_2023();
        let selection = vec![SeriesEntry::new("India", "EB2"), SeriesEntry::new("China", "EB2")];
        let first = build_series(&dataset, &selection, DateType::FilingDate);
        let second = build_series(&dataset, &selection, DateType::FinalActionDate);

        assert_eq!(first[1].color, series_color(0));
        assert_eq!(first[2].color, series_color(1));
        assert_eq!(first[1].color, second[1].color);
    }

    #[test]
    fn test_chart_without_estimate_matches_build_series() {
        let dataset = india_eb2_2023();
        let selection = vec![SeriesEntry::new("India", "EB2")];
        let options = ChartOptions {
            date_type: DateType::FilingDate,
            estimate: None,
        };

        assert_eq!(
            build_chart(&dataset, &selection, &options),
            build_series(&dataset, &selection, DateType::FilingDate)
        );
    }

    #[test]
    fn test_chart_with_estimate_extends_reference() {
        let dataset = india_eb2_2023();
        let selection = vec![SeriesEntry::new("India", "EB2"), SeriesEntry::new("China", "EB2")];
        let options = ChartOptions {
            date_type: DateType::FilingDate,
            estimate: Some(Lookback::OneYear),
        };

        let series = build_chart(&dataset, &selection, &options);

        // China/EB2 has a single filing point, so it gets no estimate
        let kinds: Vec<_> = series.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SeriesKind::Reference,
                SeriesKind::Observed,
                SeriesKind::Estimate,
                SeriesKind::Observed,
            ]
        );

        let estimate = &series[2];
        assert_eq!(estimate.name, "India/EB2 (Estimate)");
        assert_eq!(estimate.color, estimate_color(0));
        assert_eq!(estimate.points.len(), 60);

        let reference = &series[0];
        assert_eq!(reference.points.len(), 12 + 60);
        assert_eq!(reference.last_x(), estimate.last_x());

        let horizon = add_months(bulletin_month(2023, 12).unwrap(), 60).unwrap();
        assert_eq!(reference.last_x(), Some(to_millis(horizon)));
    }

    #[test]
    fn test_estimate_continues_fitted_slope() {
        // filing cutoff creeps from 2022-06-01 to 2022-12-01 over 2023
        let start = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap();
        let filings: Vec<String> = (0..12i64)
            .map(|i| (start + Duration::days(i * 183 / 11)).format("%Y-%m-%d").to_string())
            .collect();
        assert_eq!(filings[11], "2022-12-01");

        let rows = (1..=12u32)
            .map(|month| {
                let filing = &filings[month as usize - 1];
                row(2023, month, "India", "EB2", Some(filing.as_str()), None)
            })
            .collect::<Vec<_>>();
        let dataset = Dataset::from_rows(rows);
        let options = ChartOptions {
            date_type: DateType::FilingDate,
            estimate: Some(Lookback::OneYear),
        };

        let series = build_chart(&dataset, &[SeriesEntry::new("India", "EB2")], &options);
        assert_eq!(series.len(), 3);

        let observed = &series[1].points;
        assert_eq!(observed.len(), 12);
        assert!(observed.windows(2).all(|w| w[1].0 > w[0].0));
        for (i, (_, y)) in observed.iter().enumerate() {
            let bulletin = bulletin_month(2023, i as u32 + 1).unwrap();
            let expected = parse_cutoff(Some(filings[i].as_str()), bulletin).unwrap();
            assert_eq!(*y, to_millis(expected));
        }

        let trend = TrendLine::fit(observed).unwrap();
        assert!(trend.slope > 0.0);

        let (last_x, last_y) = observed[11];
        let projected = &series[2].points;
        assert_eq!(projected.len(), 60);
        assert_eq!(projected[0].0, to_millis(bulletin_month(2024, 1).unwrap()));
        assert_eq!(projected[59].0, to_millis(bulletin_month(2028, 12).unwrap()));
        for (x, y) in projected {
            let expected = last_y + trend.slope * (x - last_x);
            assert!((y - expected).abs() < 1_000.0);
        }
    }

    #[test]
    fn test_empty_dataset_gives_empty_reference() {
        let dataset = Dataset::from_rows(Vec::new());
        let entries = [SeriesEntry::new("India", "EB2")];
        let series = build_series(&dataset, &entries, DateType::FilingDate);

        assert!(series[0].points.is_empty());
        assert!(series[1].points.is_empty());
    }
}
