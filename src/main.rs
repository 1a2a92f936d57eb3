//! CLI entry point for the grid benchmark.
//!
//! Runs with no arguments: every input path, the region and the output file
//! default to the fixed locations in [`grid_benchmark::config`].

use anyhow::Result;
use clap::Parser;
use grid_benchmark::compare::Parameter;
use grid_benchmark::config::{
    self, AnalysisConfig, EARTH_NETWORK, EUR_NETWORK, REFERENCE_TABLE, REPORT_PATH,
};
use grid_benchmark::pipeline::run;
use grid_benchmark::region::Region;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "grid_benchmark")]
#[command(
    about = "Compare PyPSA-Eur and PyPSA-Earth transmission lines against the 50Hertz static grid model",
    long_about = None
)]
struct Cli {
    /// PyPSA-Eur network (CSV folder export)
    #[arg(long, value_name = "DIR", default_value = EUR_NETWORK)]
    eur: PathBuf,

    /// PyPSA-Earth network (CSV folder export)
    #[arg(long, value_name = "DIR", default_value = EARTH_NETWORK)]
    earth: PathBuf,

    /// 50Hertz static grid model table
    #[arg(long, value_name = "FILE", default_value = REFERENCE_TABLE)]
    reference: PathBuf,

    /// HTML report to write
    #[arg(short, long, value_name = "FILE", default_value = REPORT_PATH)]
    output: PathBuf,

    /// Also write the comparison table as CSV
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Region: "50Hertz" or a two-letter country code
    #[arg(short, long, default_value = config::REGION)]
    region: Region,

    /// Parameter whose mismatch colors the map
    #[arg(short, long, default_value = config::HIGHLIGHT)]
    parameter: Parameter,

    /// Merge parallel reference circuits into one equivalent line
    #[arg(long, default_value_t = false)]
    merge_parallel: bool,

    /// Drop reference lines with an end outside the region
    #[arg(long, default_value_t = false)]
    filter_reference: bool,
}

impl From<Cli> for AnalysisConfig {
    fn from(cli: Cli) -> Self {
        AnalysisConfig {
            eur_network: cli.eur,
            earth_network: cli.earth,
            reference: cli.reference,
            output: cli.output,
            csv: cli.csv,
            region: cli.region,
            highlight: cli.parameter,
            merge_parallel: cli.merge_parallel,
            filter_reference: cli.filter_reference,
            ..Default::default()
        }
    }
}

/// Colored stderr logging, plus a daily-rolling JSON log file when
/// `LOG_FILE_PATH` is set. The returned guard flushes the file on drop.
fn init_logging() -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        );

    let (json_layer, guard) = match std::env::var("LOG_FILE_PATH") {
        Ok(log_file_path) => {
            let path = Path::new(&log_file_path);
            let log_dir = path.parent().unwrap_or(Path::new("logs"));
            let log_file_name = path
                .file_name()
                .unwrap_or(OsStr::new("grid_benchmark.log"));

            let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(non_blocking_file)
                .with_filter(
                    EnvFilter::try_from_env("RUST_LOG_JSON")
                        .unwrap_or_else(|_| EnvFilter::new("debug")),
                );
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    guard
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _log_guard = init_logging();

    let config = AnalysisConfig::from(Cli::parse());
    let outcome = run(&config)?;

    info!(
        rows = outcome.rows,
        map_skipped = outcome.map_skipped,
        output = %config.output.display(),
        "Comparison finished"
    );

    Ok(())
}
