// Chart selection - which (country, category) pairs are plotted

use crate::dataset::same_label;
use crate::error::{BulletinError, Result};
use serde::{Deserialize, Serialize};

/// A (country, category) pair picked for charting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesEntry {
    pub country: String,
    pub category: String,
}

impl SeriesEntry {
    pub fn new(country: impl Into<String>, category: impl Into<String>) -> Self {
        SeriesEntry {
            country: country.into(),
            category: category.into(),
        }
    }

    /// Parse `COUNTRY/CATEGORY`. Country names may themselves contain `/`
    /// (El Salvador/Guatemala/Honduras), so the category is taken after the
    /// last slash.
    pub fn parse(text: &str) -> Result<Self> {
        let (country, category) = text
            .rsplit_once('/')
            .ok_or_else(|| BulletinError::invalid("series pair", text))?;

        let entry = SeriesEntry::new(country.trim(), category.trim());
        if entry.country.is_empty() || entry.category.is_empty() {
            return Err(BulletinError::invalid("series pair", text));
        }
        Ok(entry)
    }

    /// Identity is case-insensitive on both fields
    pub fn same_pair(&self, other: &SeriesEntry) -> bool {
        same_label(&self.country, &other.country) && same_label(&self.category, &other.category)
    }
}

/// Ordered list of unique pairs shown on the chart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartSelection {
    entries: Vec<SeriesEntry>,
}

impl ChartSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pair unless it is empty or already present (any case).
    /// Returns whether the pair was added.
    pub fn add(&mut self, entry: SeriesEntry) -> bool {
        if entry.country.is_empty() || entry.category.is_empty() {
            return false;
        }
        if self.entries.iter().any(|e| e.same_pair(&entry)) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[SeriesEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<SeriesEntry> for ChartSelection {
    fn from_iter<T: IntoIterator<Item = SeriesEntry>>(iter: T) -> Self {
        let mut selection = ChartSelection::new();
        for entry in iter {
            selection.add(entry);
        }
        selection
    }
}

/// How much recent history feeds a trend estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lookback {
    #[default]
    OneYear,
    TwoYears,
    FiveYears,
}

impl Lookback {
    pub fn years(&self) -> u32 {
        match self {
            Lookback::OneYear => 1,
            Lookback::TwoYears => 2,
            Lookback::FiveYears => 5,
        }
    }

    /// Number of most recent points fed to the regression
    pub fn points(&self) -> usize {
        self.years() as usize * 12
    }

    pub fn from_years(years: u32) -> Result<Self> {
        match years {
            1 => Ok(Lookback::OneYear),
            2 => Ok(Lookback::TwoYears),
            5 => Ok(Lookback::FiveYears),
            other => Err(BulletinError::invalid("lookback years", other.to_string())),
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Lookback::OneYear => Lookback::TwoYears,
            Lookback::TwoYears => Lookback::FiveYears,
            Lookback::FiveYears => Lookback::OneYear,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_pair_any_case_is_ignored() {
        let mut selection = ChartSelection::new();

        assert!(selection.add(SeriesEntry::new("india", "EB2")));
        assert!(!selection.add(SeriesEntry::new("India", "eb2")));
        assert!(!selection.add(SeriesEntry::new("INDIA", "Eb2")));

        assert_eq!(selection.len(), 1);
        assert_eq!(selection.entries()[0], SeriesEntry::new("india", "EB2"));
    }

    #[test]
    fn test_empty_fields_are_ignored() {
        let mut selection = ChartSelection::new();
        assert!(!selection.add(SeriesEntry::new("", "EB2")));
        assert!(!selection.add(SeriesEntry::new("India", "")));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_reset_clears_and_order_is_kept() {
        let mut selection: ChartSelection = vec![
            SeriesEntry::new("India", "EB2"),
            SeriesEntry::new("China", "EB2"),
            SeriesEntry::new("china", "eb2"),
        ]
        .into_iter()
        .collect();

        assert_eq!(selection.len(), 2);
        assert_eq!(selection.entries()[1].country, "China");

        selection.reset();
        assert!(selection.is_empty());
    }

    #[test]
    fn test_parse_pair_uses_last_slash() {
        let entry = SeriesEntry::parse("El Salvador/Guatemala/Honduras/F4").unwrap();
        assert_eq!(entry.country, "El Salvador/Guatemala/Honduras");
        assert_eq!(entry.category, "F4");

        assert!(SeriesEntry::parse("India").is_err());
        assert!(SeriesEntry::parse("India/").is_err());
    }

    #[test]
    fn test_lookback() {
        assert_eq!(Lookback::from_years(2).unwrap().points(), 24);
        assert!(Lookback::from_years(3).is_err());
        assert_eq!(Lookback::FiveYears.next(), Lookback::OneYear);
    }
}
