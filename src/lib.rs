// Visa Bulletin - Core Library
// Normalizer, series builder and trend estimator shared by the dashboard and CLI

pub mod calendar;
pub mod config;
pub mod dataset;
pub mod error;
pub mod estimate;
pub mod palette;
pub mod selection;
pub mod series;
pub mod table;

// Re-export commonly used types
pub use calendar::{display_date, parse_cutoff, parse_display_month};
pub use config::Config;
pub use dataset::{DateType, Dataset, LoadReport, RawRow, Record};
pub use error::{BulletinError, Result};
pub use estimate::{estimate, TrendLine, PROJECTION_MONTHS};
pub use palette::Rgb;
pub use selection::{ChartSelection, Lookback, SeriesEntry};
pub use series::{build_chart, build_series, ChartOptions, ChartPoint, Series, SeriesKind};
pub use table::{RecordFilter, SortKey, TableQuery};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
