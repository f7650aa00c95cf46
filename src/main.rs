// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use visa_bulletin::calendar::display_optional;
use visa_bulletin::config::LoggingConfig;
use visa_bulletin::{
    build_chart, display_date, ChartOptions, ChartSelection, Config, Dataset, DateType, Lookback,
    RecordFilter, SeriesEntry, SortKey, TableQuery,
};

#[derive(Parser)]
#[command(name = "visa-bulletin")]
#[command(version = visa_bulletin::VERSION)]
#[command(about = "Visa bulletin cutoff dates as a table, a chart and trend estimates")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding the bulletin CSV files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: <config dir>/visa-bulletin/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive dashboard (default)
    Tui,

    /// Print records as a table
    Table {
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// date, category, country, filing or final
        #[arg(long, default_value = "date")]
        sort: String,
        #[arg(long)]
        desc: bool,
        /// Only print the first N rows
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print chart series as JSON
    Series {
        /// COUNTRY/CATEGORY, repeatable (default: configured series)
        #[arg(long = "pair")]
        pairs: Vec<String>,
        /// filing or final
        #[arg(long)]
        date_type: Option<String>,
        /// Add trend estimates
        #[arg(long)]
        estimate: bool,
        /// Years of history used by the estimate: 1, 2 or 5
        #[arg(long)]
        lookback: Option<u32>,
    },

    /// Print dataset aggregates
    Summary,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data.dir = dir;
    }

    let command = cli.command.unwrap_or(Commands::Tui);
    init_logging(&config.logging, matches!(command, Commands::Tui))?;

    // Load once; everything below only borrows the snapshot
    let dataset = Dataset::load_dir(&config.data.dir).with_context(|| {
        format!(
            "Failed to load bulletin data from {}",
            config.data.dir.display()
        )
    })?;

    match command {
        Commands::Tui => run_ui_mode(dataset, &config)?,
        Commands::Table {
            country,
            category,
            sort,
            desc,
            limit,
        } => {
            let query = TableQuery {
                filter: RecordFilter { country, category },
                sort: SortKey::parse(&sort)?,
                descending: desc,
            };
            run_table(&dataset, &query, limit);
        }
        Commands::Series {
            pairs,
            date_type,
            estimate,
            lookback,
        } => {
            let selection = if pairs.is_empty() {
                config.chart.selection()
            } else {
                pairs
                    .iter()
                    .map(|p| SeriesEntry::parse(p))
                    .collect::<visa_bulletin::Result<ChartSelection>>()?
            };
            let date_type = match date_type {
                Some(text) => DateType::parse(&text)?,
                None => config.chart.date_type,
            };
            let lookback = match lookback {
                Some(years) => Lookback::from_years(years)?,
                None => config.chart.lookback()?,
            };
            let options = ChartOptions {
                date_type,
                estimate: (estimate || config.chart.estimate).then_some(lookback),
            };
            run_series(&dataset, &selection, &options)?;
        }
        Commands::Summary => run_summary(&dataset),
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig, interactive: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("visa_bulletin={}", logging.level)));

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .init();
        }
        // the dashboard owns the terminal; only errors get through
        None if interactive => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("error"))
                .with_writer(std::io::stderr)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

fn run_table(dataset: &Dataset, query: &TableQuery, limit: Option<usize>) {
    let rows = query.run(dataset);
    let shown = limit.unwrap_or(rows.len()).min(rows.len());

    println!(
        "{:<10} {:<30} {:<32} {:<12} {:<12}",
        "Date", "Category", "Country", "Filing", "Final Action"
    );
    println!("{}", "━".repeat(100));

    for record in rows.iter().take(shown) {
        println!(
            "{:<10} {:<30} {:<32} {:<12} {:<12}",
            display_date(record.date, false),
            record.category,
            record.country,
            display_optional(record.filing_date, true),
            display_optional(record.final_action_date, true),
        );
    }

    println!("{}", "━".repeat(100));
    println!("✓ {} of {} matching rows", shown, rows.len());
}

fn run_series(dataset: &Dataset, selection: &ChartSelection, options: &ChartOptions) -> Result<()> {
    let series = build_chart(dataset, selection.entries(), options);
    let json = serde_json::to_string_pretty(&series).context("Failed to serialize series")?;
    println!("{}", json);
    Ok(())
}

fn run_summary(dataset: &Dataset) {
    let report = dataset.report();

    println!("📊 Visa Bulletin Data");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Files:       {}", report.files);
    println!("Rows read:   {}", report.rows_read);
    println!("Rejected:    {}", report.rows_rejected);
    println!("Records:     {}", dataset.len());

    match dataset.date_range() {
        Some((min, max)) => println!(
            "Range:       {} → {}",
            display_date(min, false),
            display_date(max, false)
        ),
        None => println!("Range:       (empty)"),
    }

    println!("\nCountries ({}):", dataset.countries().len());
    for country in dataset.countries() {
        println!("  • {}", country);
    }

    println!("\nCategories ({}):", dataset.categories().len());
    for category in dataset.categories() {
        println!("  • {}", category);
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(dataset: Dataset, config: &Config) -> Result<()> {
    let mut app = ui::App::new(dataset, &config.chart)?;
    ui::run_ui(&mut app)?;
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_dataset: Dataset, _config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: visa-bulletin table | series | summary");
    std::process::exit(1);
}
