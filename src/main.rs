use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing_subscriber::EnvFilter;

use case_trends::models::ResultTable;
use case_trends::query::{QueryEngine, QueryFilters, ReportKind};
use case_trends::store::CaseStore;
use case_trends::{db, ingest, report};

const DEFAULT_LOG_FILTER: &str = "case_trends=info";

#[derive(Parser)]
#[command(name = "case-trends")]
#[command(about = "Case intake trends by month, quarter, disease and client", long_about = None)]
struct Cli {
    /// Read cases from this CSV file instead of Postgres
    #[arg(long, global = true, env = "CASE_DATA_CSV")]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Import cases from a CSV file into Postgres
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List the years present in the data
    Years,
    /// Run a single report and print its table
    Query {
        #[arg(value_enum)]
        kind: ReportKind,
        #[command(flatten)]
        filters: FilterArgs,
        /// Print the table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate the full markdown dashboard
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Year to include; repeat for several. Defaults to the latest year.
    #[arg(long = "year")]
    years: Vec<i32>,
    /// Only count cases with this disease
    #[arg(long)]
    category: Option<String>,
    /// Baseline year for the comparison
    #[arg(long)]
    year1: Option<i32>,
    /// Compared year
    #[arg(long)]
    year2: Option<i32>,
    /// Date treated as today for the comparison (YYYY-MM-DD)
    #[arg(long)]
    reference_date: Option<NaiveDate>,
}

impl FilterArgs {
    fn resolve(self, store: &CaseStore) -> QueryFilters {
        let mut years: std::collections::BTreeSet<i32> = self.years.into_iter().collect();
        if years.is_empty() {
            years.extend(store.latest_year());
        }
        let defaults = store.default_comparison();
        QueryFilters {
            years,
            category: self.category,
            year1: self.year1.or(defaults.map(|(year1, _)| year1)),
            year2: self.year2.or(defaults.map(|(_, year2)| year2)),
            reference_date: self.reference_date,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let Cli { data, command } = Cli::parse();

    match command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Import { csv } => {
            let pool = connect().await?;
            let summary = db::import_csv(&pool, &csv).await?;
            println!(
                "Inserted {} cases from {} ({} duplicates, {} without a usable date).",
                summary.inserted,
                csv.display(),
                summary.duplicates,
                summary.rejected.len()
            );
        }
        Commands::Years => {
            let store = load_store(data.as_deref()).await?;
            if store.is_empty() {
                println!("No case data loaded.");
                return Ok(());
            }
            for year in store.years() {
                println!("{year}");
            }
        }
        Commands::Query {
            kind,
            filters,
            json,
        } => {
            let store = load_store(data.as_deref()).await?;
            let filters = filters.resolve(&store);
            let table = QueryEngine::new(&store).run(kind, &filters)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                print_table(&table);
            }
        }
        Commands::Report { filters, out } => {
            let store = load_store(data.as_deref()).await?;
            let filters = filters.resolve(&store);
            let report = report::build_report(&QueryEngine::new(&store), &filters)?;
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set when no --data CSV is given")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn load_store(data: Option<&Path>) -> anyhow::Result<CaseStore> {
    match data {
        Some(path) => {
            let (store, _) = ingest::load_csv(path)?;
            Ok(store)
        }
        None => {
            let pool = connect().await?;
            Ok(CaseStore::from_records(db::fetch_cases(&pool).await?))
        }
    }
}

fn print_table(table: &ResultTable) {
    match table {
        ResultTable::Series { series } => {
            for bucket in series.buckets() {
                println!("{:<4} {:>6}", bucket.label, bucket.count);
            }
        }
        ResultTable::Ranking { rows } => {
            if rows.is_empty() {
                println!("No cases recorded for this selection.");
            }
            for row in rows {
                println!("{:<32} {:>6}", row.label, row.count);
            }
        }
        ResultTable::Comparison(report) => {
            println!(
                "Yearly comparison: {} vs {} (as of {})",
                report.year1, report.year2, report.reference_date
            );
            for (left, right) in report.series1.buckets().iter().zip(report.series2.buckets()) {
                let change = report.change_label(left.label).unwrap_or_default();
                println!("{:<4} {:>6} {:>6}  {}", left.label, left.count, right.count, change);
            }
        }
    }
}
