//! Configuration System
//!
//! Loads settings from a TOML file with an environment override for the
//! data directory. Every field has a default, so no file is required.

use crate::dataset::DateType;
use crate::error::Result;
use crate::selection::{ChartSelection, Lookback, SeriesEntry};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding `[data] dir`
pub const DATA_DIR_ENV: &str = "VISA_BULLETIN_DATA_DIR";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub chart: ChartConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the bulletin CSV files live
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
        }
    }
}

/// Initial chart state
#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    #[serde(default)]
    pub date_type: DateType,

    #[serde(default = "default_lookback_years")]
    pub lookback_years: u32,

    #[serde(default)]
    pub estimate: bool,

    #[serde(default = "default_series")]
    pub default_series: Vec<SeriesEntry>,
}

fn default_lookback_years() -> u32 {
    1
}

fn default_series() -> Vec<SeriesEntry> {
    vec![
        SeriesEntry::new("India", "EB2"),
        SeriesEntry::new("China", "EB2"),
    ]
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            date_type: DateType::default(),
            lookback_years: default_lookback_years(),
            estimate: false,
            default_series: default_series(),
        }
    }
}

impl ChartConfig {
    pub fn lookback(&self) -> Result<Lookback> {
        Lookback::from_years(self.lookback_years)
    }

    pub fn selection(&self) -> ChartSelection {
        self.default_series.iter().cloned().collect()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file; used by the dashboard so output does not hit the terminal
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Resolve configuration: explicit path, then the user config file,
    /// then defaults. The data directory env override is applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(p) => Self::from_file(&p)?,
                None => Self::default(),
            },
        };

        config.apply_env();
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.data.dir = PathBuf::from(dir);
            }
        }
    }

    /// `<config_dir>/visa-bulletin/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("visa-bulletin").join("config.toml"))
    }
}
