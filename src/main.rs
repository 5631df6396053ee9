//! CLI entry point for the school air-quality rater.
//!
//! Provides subcommands for assessing an inspection table, building
//! district/school-type/period rollups, and grading a single reading.

use anyhow::Result;
use clap::{Parser, Subcommand};
use school_air_rater::analyzers::analyzer::{analyze, rollup};
use school_air_rater::analyzers::grade::evaluate;
use school_air_rater::analyzers::reading::{ReconcileStrategy, parse_reading};
use school_air_rater::analyzers::rollup::RollupOptions;
use school_air_rater::analyzers::types::Pollutant;
use school_air_rater::config::ColumnMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "school_air_rater")]
#[command(about = "Grade school indoor air-quality inspection records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess every school in an inspection CSV and write assessment and recommendation tables
    Assess {
        /// Inspection CSV to read
        #[arg(value_name = "INPUT_CSV")]
        input: PathBuf,

        /// Directory to write assessments.csv and recommendations.csv into
        #[arg(short = 'd', long, default_value = "reports")]
        output_dir: PathBuf,

        /// How repeated readings collapse: conservative (max) or average
        #[arg(short, long, default_value_t = ReconcileStrategy::Conservative)]
        strategy: ReconcileStrategy,

        /// JSON file overriding the default source column names
        #[arg(short, long)]
        columns: Option<PathBuf>,

        /// Gzip compress the CSV outputs
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Summarize assessments by district, school type and inspection period
    Rollup {
        /// Inspection CSV to read
        #[arg(value_name = "INPUT_CSV")]
        input: PathBuf,

        /// JSON file to write the rollup report to
        #[arg(short, long, default_value = "reports/rollups.json")]
        output: PathBuf,

        /// How repeated readings collapse: conservative (max) or average
        #[arg(short, long, default_value_t = ReconcileStrategy::Conservative)]
        strategy: ReconcileStrategy,

        /// JSON file overriding the default source column names
        #[arg(short, long)]
        columns: Option<PathBuf>,

        /// Minimum schools for a district to be reported
        #[arg(long, default_value_t = 3)]
        min_district_schools: usize,

        /// Minimum schools for a school type to be reported
        #[arg(long, default_value_t = 5)]
        min_type_schools: usize,

        /// Minimum schools for an inspection period to be reported
        #[arg(long, default_value_t = 10)]
        min_period_schools: usize,
    },
    /// Grade a single concentration
    Grade {
        /// One of pm10, pm2.5, co2, co, no2, o3
        pollutant: Pollutant,

        /// Measured value
        value: String,
    },
}

fn load_columns(path: Option<&Path>) -> Result<ColumnMap> {
    match path {
        Some(path) => ColumnMap::load(path),
        None => Ok(ColumnMap::default()),
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/school_air_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("school_air_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Assess {
            input,
            output_dir,
            strategy,
            columns,
            gzip,
        } => {
            let columns = load_columns(columns.as_deref())?;
            let summary = analyze(&input, &output_dir, &columns, strategy, gzip)?;

            for (grade, count) in &summary.grade_counts {
                info!(grade = %grade, count, "Composite grade");
            }
            info!(
                schools = summary.schools,
                assessments = %summary.assessments_path.display(),
                recommendations = %summary.recommendations_path.display(),
                "Reports written"
            );
        }
        Commands::Rollup {
            input,
            output,
            strategy,
            columns,
            min_district_schools,
            min_type_schools,
            min_period_schools,
        } => {
            let columns = load_columns(columns.as_deref())?;
            let options = RollupOptions {
                min_district_schools,
                min_type_schools,
                min_period_schools,
            };
            let report = rollup(&input, &output, &columns, strategy, options)?;

            for (rank, district) in report.worst_districts.iter().enumerate() {
                info!(rank = rank + 1, district = %district, "Worst district by composite");
            }
        }
        Commands::Grade { pollutant, value } => {
            let grading = evaluate(pollutant, parse_reading(Some(&value)));
            info!(
                pollutant = %pollutant,
                unit = pollutant.unit(),
                value = %value,
                grade = %grading.grade,
                score = grading.score,
                "Graded"
            );
        }
    }

    Ok(())
}
