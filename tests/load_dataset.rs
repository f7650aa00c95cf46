use std::fs;
use std::path::Path;

use chrono::Datelike;
use tempfile::TempDir;
use visa_bulletin::{
    build_chart, BulletinError, ChartOptions, ChartSelection, Dataset, DateType, Lookback,
    SeriesEntry, SeriesKind, PROJECTION_MONTHS,
};

const HEADER: &str = "year,month,country,category,final_action_date,filing_date\n";

fn write_month(root: &Path, year: i32, month: u32, body: &str) {
    let dir = root.join(year.to_string());
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{:02}_month.csv", month)), format!("{}{}", HEADER, body)).unwrap();
}

/// One bulletin file per month of 2023 in the data/<year>/<MM>_<month>.csv layout
fn bulletin_dir() -> TempDir {
    let tmp = TempDir::new().unwrap();
    for month in 1..=12u32 {
        let body = format!(
            "2023,{m},India,EB2,2011-{m:02}-01,2022-{m:02}-01\n\
             2023,{m},China,EB2,2019-{m:02}-15,\n\
             2023,{m},Rest-of-World,EB3,C,2023-{m:02}-01\n",
            m = month
        );
        write_month(tmp.path(), 2023, month, &body);
    }
    tmp
}

#[test]
fn test_load_dir_reads_every_file_in_order() {
    let tmp = bulletin_dir();
    fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

    let dataset = Dataset::load_dir(tmp.path()).unwrap();

    assert_eq!(dataset.report().files, 12);
    assert_eq!(dataset.len(), 36);
    assert_eq!(dataset.countries(), &["India", "China", "Rest-of-World"]);
    assert_eq!(dataset.categories(), &["EB2", "EB3"]);

    let (min, max) = dataset.date_range().unwrap();
    assert_eq!(min.month(), 1);
    assert_eq!(max.month(), 12);

    // file order: January rows first
    assert_eq!(dataset.records()[0].date.month(), 1);
    assert_eq!(dataset.records()[35].date.month(), 12);
}

#[test]
fn test_current_marker_resolves_to_bulletin_month() {
    let tmp = bulletin_dir();
    let dataset = Dataset::load_dir(tmp.path()).unwrap();

    let row = dataset
        .records_for("rest-of-world", "eb3")
        .find(|r| r.date.month() == 7)
        .unwrap();
    let cutoff = row.final_action_date.unwrap();

    assert_eq!((cutoff.year(), cutoff.month(), cutoff.day()), (2023, 7, 1));
}

#[test]
fn test_empty_dir_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let err = Dataset::load_dir(tmp.path()).unwrap_err();
    assert!(matches!(err, BulletinError::NoData(_)));
}

#[test]
fn test_missing_dir_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope");
    assert!(matches!(Dataset::load_dir(&missing), Err(BulletinError::Io(_))));
}

#[test]
fn test_bad_rows_are_skipped_not_fatal() {
    let tmp = TempDir::new().unwrap();
    write_month(
        tmp.path(),
        2023,
        1,
        "2023,1,India,EB2,2011-01-01,2022-01-01\n\
         2023,14,India,EB2,2011-01-01,2022-01-01\n\
         2023,2,India,EB2,garbage,\n",
    );

    let dataset = Dataset::load_dir(tmp.path()).unwrap();

    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.report().rows_rejected, 1);
    assert!(dataset.records()[1].final_action_date.is_none());
}

#[test]
fn test_malformed_records_do_not_drop_the_other_files() {
    let tmp = TempDir::new().unwrap();
    write_month(tmp.path(), 2023, 1, "2023,1,India,EB2,2011-01-01,2022-01-01\n");

    // short row, truncated row, non-UTF-8 country cell, then a good row
    let mut body = Vec::new();
    body.extend_from_slice(HEADER.as_bytes());
    body.extend_from_slice(b"2023,2,India,EB2,2011-02-01\n");
    body.extend_from_slice(b"2023,3,India\n");
    body.extend_from_slice(b"2023,4,\xff\xfe,EB2,2011-04-01,2022-04-01\n");
    body.extend_from_slice(b"2023,5,India,EB2,2011-05-01,2022-05-01\n");
    let dir = tmp.path().join("2023");
    fs::write(dir.join("02_february.csv"), body).unwrap();

    let dataset = Dataset::load_dir(tmp.path()).unwrap();

    assert_eq!(dataset.report().files, 2);
    assert_eq!(dataset.len(), 3);
    assert_eq!(dataset.report().rows_read, 5);
    assert_eq!(dataset.report().rows_rejected, 2);

    let months: Vec<u32> = dataset.records().iter().map(|r| r.date.month()).collect();
    assert_eq!(months, vec![1, 2, 5]);
    assert!(dataset.records()[1].filing_date.is_none());
    assert_eq!(dataset.countries(), &["India"]);
}

#[test]
fn test_load_csv_single_file() {
    let tmp = bulletin_dir();
    let path = tmp.path().join("2023").join("03_month.csv");

    let dataset = Dataset::load_csv(&path).unwrap();

    assert_eq!(dataset.report().files, 1);
    assert_eq!(dataset.len(), 3);
    assert!(dataset.records().iter().all(|r| r.date.month() == 3));

    let missing = tmp.path().join("2023").join("13_month.csv");
    assert!(matches!(Dataset::load_csv(&missing), Err(BulletinError::Io(_))));
}

#[test]
fn test_chart_from_loaded_data() {
    let tmp = bulletin_dir();
    let dataset = Dataset::load_dir(tmp.path()).unwrap();

    let selection: ChartSelection = vec![
        SeriesEntry::new("india", "eb2"),
        SeriesEntry::new("INDIA", "EB2"),
        SeriesEntry::new("China", "EB2"),
    ]
    .into_iter()
    .collect();
    assert_eq!(selection.len(), 2);

    let options = ChartOptions {
        date_type: DateType::FilingDate,
        estimate: Some(Lookback::OneYear),
    };
    let series = build_chart(&dataset, selection.entries(), &options);

    // China/EB2 publishes no filing dates at all
    assert_eq!(series.len(), 4);
    assert_eq!(series[0].kind, SeriesKind::Reference);
    assert_eq!(series[1].name, "India/EB2");
    assert_eq!(series[1].points.len(), 12);
    assert_eq!(series[2].name, "India/EB2 (Estimate)");
    assert_eq!(series[2].points.len(), PROJECTION_MONTHS as usize);
    assert_eq!(series[3].name, "China/EB2");
    assert!(series[3].points.is_empty());

    assert_eq!(series[0].points.len(), 12 + PROJECTION_MONTHS as usize);
    assert!(series[0].points.iter().all(|(x, y)| x == y));

    let json = serde_json::to_string(&series).unwrap();
    assert!(json.contains("\"kind\":\"estimate\""));
    assert!(json.contains("#AAAAAA"));
}
