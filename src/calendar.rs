// Calendar helpers - bulletin months, cutoff dates, chart timestamps
//
// Every bulletin month is pinned to day 1 at 12:00 so that all rows of one
// month compare equal. Cutoff dates get a fixed 400 minute shift so a later
// conversion to local time never lands on the previous calendar day.
// All naive values are treated as UTC.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta};

/// Hour of day every bulletin month is pinned to
pub const BULLETIN_HOUR: u32 = 12;

/// Shift applied to every parsed cutoff date
pub const CUTOFF_OFFSET_MINUTES: i64 = 400;

// ============================================================================
// BULLETIN MONTHS
// ============================================================================

/// Canonical timestamp for a bulletin month (1-based month)
pub fn bulletin_month(year: i32, month: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(BULLETIN_HOUR, 0, 0)
}

/// Canonical bulletin month containing `dt`
pub fn month_of(dt: NaiveDateTime) -> Option<NaiveDateTime> {
    bulletin_month(dt.year(), dt.month())
}

pub fn add_months(dt: NaiveDateTime, months: u32) -> Option<NaiveDateTime> {
    dt.checked_add_months(Months::new(months))
}

/// One canonical timestamp per calendar month from `start` to `end`, inclusive
pub fn months_between(start: NaiveDateTime, end: NaiveDateTime) -> Vec<NaiveDateTime> {
    let mut months = Vec::new();
    let Some(mut current) = month_of(start) else {
        return months;
    };

    while current <= end {
        months.push(current);
        current = match add_months(current, 1) {
            Some(next) => next,
            None => break,
        };
    }

    months
}

// ============================================================================
// CUTOFF DATES
// ============================================================================

/// Parse an optional cutoff cell published in the bulletin for `bulletin`.
///
/// Empty cells and `U` (unavailable) map to `None`, `C` (current) maps to the
/// first day of the bulletin month. Anything unreadable also maps to `None`.
pub fn parse_cutoff(raw: Option<&str>, bulletin: NaiveDateTime) -> Option<NaiveDateTime> {
    let text = raw?.trim();
    if text.is_empty() {
        return None;
    }

    let date = if text.eq_ignore_ascii_case("c") {
        NaiveDate::from_ymd_opt(bulletin.year(), bulletin.month(), 1)
    } else if text.eq_ignore_ascii_case("u") {
        None
    } else {
        let parsed = parse_calendar_date(text);
        if parsed.is_none() {
            tracing::debug!(value = text, "Unreadable cutoff date, treating as unpublished");
        }
        parsed
    };

    let midnight = date?.and_hms_opt(0, 0, 0)?;
    midnight.checked_add_signed(TimeDelta::minutes(CUTOFF_OFFSET_MINUTES))
}

/// Parse a calendar date in ISO (`2023-01-15`) or bulletin (`15JAN23`) notation
pub fn parse_calendar_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }

    // "2023-01-15T00:00:00" or "2023-01-15 00:00:00"
    if text.len() > 10 && matches!(text.as_bytes()[10], b'T' | b' ') {
        if let Ok(date) = NaiveDate::parse_from_str(&text[..10], "%Y-%m-%d") {
            return Some(date);
        }
    }

    parse_bulletin_notation(text)
}

/// `DDMONYY` with a one or two digit day; years 80-99 are 19xx
fn parse_bulletin_notation(text: &str) -> Option<NaiveDate> {
    if !text.is_ascii() {
        return None;
    }

    let day_len = text.bytes().take_while(|b| b.is_ascii_digit()).count();
    if !(1..=2).contains(&day_len) || text.len() != day_len + 5 {
        return None;
    }

    let day: u32 = text[..day_len].parse().ok()?;
    let month = month_from_abbrev(&text[day_len..day_len + 3])?;
    let short_year: i32 = text[day_len + 3..].parse().ok()?;
    let year = if short_year >= 80 {
        1900 + short_year
    } else {
        2000 + short_year
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

const MONTH_ABBREVS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

fn month_from_abbrev(abbrev: &str) -> Option<u32> {
    let lower = abbrev.to_ascii_lowercase();
    MONTH_ABBREVS
        .iter()
        .position(|m| *m == lower)
        .map(|idx| idx as u32 + 1)
}

// ============================================================================
// CHART TIMESTAMPS
// ============================================================================

/// Milliseconds since the Unix epoch, as plotted on the chart axes
pub fn to_millis(dt: NaiveDateTime) -> f64 {
    dt.and_utc().timestamp_millis() as f64
}

pub fn from_millis(millis: f64) -> Option<NaiveDateTime> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis.round() as i64).map(|dt| dt.naive_utc())
}

// ============================================================================
// DISPLAY
// ============================================================================

/// `2023 Jan`, or `2023 Jan 05` when `with_day` is set
pub fn display_date(dt: NaiveDateTime, with_day: bool) -> String {
    if with_day {
        dt.format("%Y %b %d").to_string()
    } else {
        dt.format("%Y %b").to_string()
    }
}

pub fn display_optional(dt: Option<NaiveDateTime>, with_day: bool) -> String {
    dt.map(|d| display_date(d, with_day)).unwrap_or_default()
}

/// Inverse of `display_date(_, false)`: `"2023 Jan"` -> `(2023, 1)`
pub fn parse_display_month(text: &str) -> Option<(i32, u32)> {
    let mut parts = text.split_whitespace();
    let year: i32 = parts.next()?.parse().ok()?;
    let month = month_from_abbrev(parts.next()?)?;
    Some((year, month))
}
