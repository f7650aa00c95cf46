// Table Query - filter and sort records for the tabular view

use crate::dataset::{same_label, Dataset, Record};
use crate::error::{BulletinError, Result};
use std::cmp::Ordering;

/// Column filters; `None` shows everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub country: Option<String>,
    pub category: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &Record) -> bool {
        let country_ok = self
            .country
            .as_deref()
            .map_or(true, |c| same_label(&record.country, c));
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |c| same_label(&record.category, c));
        country_ok && category_ok
    }

    pub fn is_active(&self) -> bool {
        self.country.is_some() || self.category.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Date,
    Category,
    Country,
    FilingDate,
    FinalActionDate,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Date,
        SortKey::Category,
        SortKey::Country,
        SortKey::FilingDate,
        SortKey::FinalActionDate,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            SortKey::Date => "Date",
            SortKey::Category => "Category",
            SortKey::Country => "Country",
            SortKey::FilingDate => "Filing Date",
            SortKey::FinalActionDate => "Final Action Date",
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        match text.trim().to_lowercase().as_str() {
            "date" => Ok(SortKey::Date),
            "category" => Ok(SortKey::Category),
            "country" => Ok(SortKey::Country),
            "filing" | "filing_date" => Ok(SortKey::FilingDate),
            "final" | "final_action_date" => Ok(SortKey::FinalActionDate),
            _ => Err(BulletinError::invalid("sort key", text)),
        }
    }

    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|k| k == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Missing cutoff dates order before present ones
    fn compare(&self, a: &Record, b: &Record) -> Ordering {
        match self {
            SortKey::Date => a.date.cmp(&b.date),
            SortKey::Category => a.category.to_lowercase().cmp(&b.category.to_lowercase()),
            SortKey::Country => a.country.to_lowercase().cmp(&b.country.to_lowercase()),
            SortKey::FilingDate => a.filing_date.cmp(&b.filing_date),
            SortKey::FinalActionDate => a.final_action_date.cmp(&b.final_action_date),
        }
    }
}

/// Filter + sort applied to the dataset for display
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableQuery {
    pub filter: RecordFilter,
    pub sort: SortKey,
    pub descending: bool,
}

impl TableQuery {
    pub fn run<'a>(&self, dataset: &'a Dataset) -> Vec<&'a Record> {
        let records = dataset.records();
        self.indices(dataset)
            .into_iter()
            .map(|idx| &records[idx])
            .collect()
    }

    /// Positions into `dataset.records()` in display order
    pub fn indices(&self, dataset: &Dataset) -> Vec<usize> {
        let records = dataset.records();
        let mut rows: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| self.filter.matches(r))
            .map(|(idx, _)| idx)
            .collect();

        // stable, so ties keep file order
        rows.sort_by(|&a, &b| {
            let ord = self.sort.compare(&records[a], &records[b]);
            if self.descending {
                ord.reverse()
            } else {
                ord
            }
        });

        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RawRow;
    use chrono::Datelike;

    fn row(year: &str, month: &str, country: &str, category: &str, filing: Option<&str>) -> RawRow {
        RawRow {
            year: year.to_string(),
            month: month.to_string(),
            category: category.to_string(),
            country: country.to_string(),
            filing_date: filing.map(str::to_string),
            final_action_date: None,
        }
    }

    fn sample() -> Dataset {
        Dataset::from_rows(vec![
            row("2023", "2", "India", "EB2", Some("2012-02-01")),
            row("2023", "1", "China", "EB2", Some("2019-01-01")),
            row("2023", "1", "India", "EB3", None),
            row("2023", "1", "India", "EB2", Some("2012-01-01")),
        ])
    }

    #[test]
    fn test_default_query_sorts_by_date_keeping_file_order_on_ties() {
        let dataset = sample();
        let rows = TableQuery::default().run(&dataset);

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].country, "China");
        assert_eq!(rows[1].category, "EB3");
        assert_eq!(rows[3].date.month(), 2);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let dataset = sample();
        let query = TableQuery {
            filter: RecordFilter {
                country: Some("india".to_string()),
                category: Some("eb2".to_string()),
            },
            ..Default::default()
        };

        let rows = query.run(&dataset);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.country == "India" && r.category == "EB2"));
    }

    #[test]
    fn test_sort_by_filing_descending_puts_missing_last() {
        let dataset = sample();
        let query = TableQuery {
            sort: SortKey::FilingDate,
            descending: true,
            ..Default::default()
        };

        let rows = query.run(&dataset);
        assert_eq!(rows[0].country, "China");
        assert!(rows[3].filing_date.is_none());
    }

    #[test]
    fn test_sort_key_parse_and_cycle() {
        assert_eq!(SortKey::parse("final").unwrap(), SortKey::FinalActionDate);
        assert!(SortKey::parse("amount").is_err());
        assert_eq!(SortKey::FinalActionDate.next(), SortKey::Date);
    }
}
