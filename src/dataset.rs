// Dataset Normalizer
// Raw bulletin CSV rows -> immutable Record snapshot + derived aggregates

use crate::calendar::{bulletin_month, parse_cutoff};
use crate::error::{BulletinError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Quote character used by the bundled bulletin CSV files
pub const CSV_QUOTE: u8 = b'|';

// ============================================================================
// RAW ROW
// ============================================================================

/// One CSV row exactly as published, before any normalization
///
/// Year and month are kept as text so a malformed value rejects the row
/// instead of failing the whole file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RawRow {
    pub year: String,
    pub month: String,
    pub category: String,
    pub country: String,

    #[serde(default)]
    pub filing_date: Option<String>,

    #[serde(default)]
    pub final_action_date: Option<String>,
}

// ============================================================================
// RECORD
// ============================================================================

/// Which cutoff column a chart or table reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DateType {
    #[default]
    #[serde(alias = "filing")]
    FilingDate,
    #[serde(alias = "final")]
    FinalActionDate,
}

impl DateType {
    pub fn label(&self) -> &'static str {
        match self {
            DateType::FilingDate => "Filing Date",
            DateType::FinalActionDate => "Final Action Date",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            DateType::FilingDate => DateType::FinalActionDate,
            DateType::FinalActionDate => DateType::FilingDate,
        }
    }

    /// Accepts `filing` / `final` (and the long forms)
    pub fn parse(text: &str) -> Result<Self> {
        match text.trim().to_lowercase().as_str() {
            "filing" | "filing_date" | "filing-date" => Ok(DateType::FilingDate),
            "final" | "final_action" | "final_action_date" | "final-action-date" => {
                Ok(DateType::FinalActionDate)
            }
            _ => Err(BulletinError::invalid("date type", text)),
        }
    }
}

/// One (country, category, bulletin month) observation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Bulletin month, day 1 at 12:00
    pub date: NaiveDateTime,
    pub category: String,
    pub country: String,
    pub filing_date: Option<NaiveDateTime>,
    pub final_action_date: Option<NaiveDateTime>,
}

impl Record {
    /// Normalize a raw row. Returns `None` when year or month is unusable.
    pub fn from_raw(raw: &RawRow) -> Option<Record> {
        let year: i32 = raw.year.trim().parse().ok()?;
        let month: u32 = raw.month.trim().parse().ok()?;
        let date = bulletin_month(year, month)?;

        Some(Record {
            date,
            category: raw.category.trim().to_string(),
            country: raw.country.trim().to_string(),
            filing_date: parse_cutoff(raw.filing_date.as_deref(), date),
            final_action_date: parse_cutoff(raw.final_action_date.as_deref(), date),
        })
    }

    pub fn cutoff(&self, date_type: DateType) -> Option<NaiveDateTime> {
        match date_type {
            DateType::FilingDate => self.filing_date,
            DateType::FinalActionDate => self.final_action_date,
        }
    }

    /// Case-insensitive match on both labels
    pub fn matches(&self, country: &str, category: &str) -> bool {
        same_label(&self.country, country) && same_label(&self.category, category)
    }
}

/// Labels are compared case-insensitively everywhere
pub fn same_label(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

// ============================================================================
// LOAD REPORT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub files: usize,
    pub rows_read: usize,
    pub rows_rejected: usize,
}

impl LoadReport {
    /// Count records the CSV layer could not deserialize
    fn add_malformed(&mut self, count: usize) {
        self.rows_read += count;
        self.rows_rejected += count;
    }
}

// ============================================================================
// DATASET SNAPSHOT
// ============================================================================

/// Immutable snapshot of every record plus the aggregates derived from them.
///
/// Built once at startup; consumers only ever borrow it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dataset {
    records: Vec<Record>,
    countries: Vec<String>,
    categories: Vec<String>,
    date_range: Option<(NaiveDateTime, NaiveDateTime)>,
    report: LoadReport,
}

impl Dataset {
    /// Normalize rows in input order and derive the aggregates
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = RawRow>,
    {
        let mut report = LoadReport::default();
        let mut records = Vec::new();

        for raw in rows {
            report.rows_read += 1;
            match Record::from_raw(&raw) {
                Some(record) => records.push(record),
                None => {
                    report.rows_rejected += 1;
                    tracing::warn!(
                        year = %raw.year,
                        month = %raw.month,
                        country = %raw.country,
                        category = %raw.category,
                        "Rejected row with invalid year/month"
                    );
                }
            }
        }

        let mut dataset = Self::from_records(records);
        dataset.report = report;
        dataset
    }

    /// Derive aggregates over already-normalized records
    pub fn from_records(records: Vec<Record>) -> Self {
        let countries = distinct_in_order(records.iter().map(|r| r.country.as_str()));
        let categories = distinct_in_order(records.iter().map(|r| r.category.as_str()));

        let mut date_range: Option<(NaiveDateTime, NaiveDateTime)> = None;
        for record in &records {
            date_range = Some(match date_range {
                None => (record.date, record.date),
                Some((min, max)) => (min.min(record.date), max.max(record.date)),
            });
        }

        let report = LoadReport {
            files: 0,
            rows_read: records.len(),
            rows_rejected: 0,
        };

        Dataset {
            records,
            countries,
            categories,
            date_range,
            report,
        }
    }

    /// Read one CSV stream
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let parsed = read_rows(reader)?;
        let mut dataset = Self::from_rows(parsed.rows);
        dataset.report.add_malformed(parsed.malformed);
        dataset.report.files = 1;
        Ok(dataset)
    }

    /// Read a single CSV file
    pub fn load_csv(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Read every `*.csv` under `dir` (recursively, sorted by path)
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let files = find_csv_files(dir)?;
        if files.is_empty() {
            return Err(BulletinError::NoData(dir.to_path_buf()));
        }

        let mut rows = Vec::new();
        let mut malformed = 0;
        for path in &files {
            let file = fs::File::open(path)?;
            let parsed = read_rows(file)?;
            tracing::debug!(
                path = %path.display(),
                rows = parsed.rows.len(),
                malformed = parsed.malformed,
                "Read bulletin file"
            );
            rows.extend(parsed.rows);
            malformed += parsed.malformed;
        }

        let mut dataset = Self::from_rows(rows);
        dataset.report.add_malformed(malformed);
        dataset.report.files = files.len();

        tracing::info!(
            files = dataset.report.files,
            records = dataset.records.len(),
            rejected = dataset.report.rows_rejected,
            "Loaded visa bulletin data"
        );

        Ok(dataset)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct countries, first-appearance order
    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    /// Distinct categories, first-appearance order
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// (earliest, latest) bulletin month; `None` for an empty dataset
    pub fn date_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        self.date_range
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Original-case spelling of a country label
    pub fn canonical_country(&self, name: &str) -> Option<&str> {
        self.countries
            .iter()
            .find(|c| same_label(c, name))
            .map(String::as_str)
    }

    /// Original-case spelling of a category label
    pub fn canonical_category(&self, name: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| same_label(c, name))
            .map(String::as_str)
    }

    pub fn records_for<'a>(
        &'a self,
        country: &'a str,
        category: &'a str,
    ) -> impl Iterator<Item = &'a Record> + 'a {
        self.records
            .iter()
            .filter(move |r| r.matches(country, category))
    }
}

fn distinct_in_order<'a, I>(labels: I) -> Vec<String>
where
    I: Iterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for label in labels {
        if seen.insert(label) {
            out.push(label.to_string());
        }
    }
    out
}

// ============================================================================
// CSV INPUT
// ============================================================================

/// Rows deserialized from one CSV stream
#[derive(Debug, Default)]
pub struct CsvRows {
    pub rows: Vec<RawRow>,
    /// Records skipped because they could not be deserialized
    pub malformed: usize,
}

/// Deserialize raw rows from a bulletin CSV stream (header row required)
///
/// A ragged or non-UTF-8 record is logged and skipped; only I/O failures
/// abort the stream.
pub fn read_rows<R: Read>(reader: R) -> Result<CsvRows> {
    let mut rdr = csv::ReaderBuilder::new()
        .quote(CSV_QUOTE)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut parsed = CsvRows::default();
    for result in rdr.deserialize::<RawRow>() {
        match result {
            Ok(row) => parsed.rows.push(row),
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                parsed.malformed += 1;
                tracing::warn!(
                    line = err.position().map(|p| p.line()),
                    error = %err,
                    "Skipped malformed CSV record"
                );
            }
        }
    }

    Ok(parsed)
}

/// All `*.csv` files below `dir`, sorted so file order is deterministic
pub fn find_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_csv_files(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_csv_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_csv_files(&path, files)?;
        } else if path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
        {
            files.push(path);
        }
    }
    Ok(())
}
