mod bluetooth;
mod config;
mod models;
mod monitor;
mod report;
mod storage;
mod survey;
mod utils;

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::{error, info, warn};

use bluetooth::HciScanner;
use config::Config;
use report::ReportOptions;

#[derive(Parser)]
#[command(
    name = "tilt-logger",
    about = "Record and report Tilt hydrometer readings",
    version
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run reading cycles and append aggregated records to the CSV logs
    Record {
        /// JSON run configuration
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Render plots and summary tables from a CSV log
    Report {
        /// CSV input file
        #[arg(short, long)]
        data: PathBuf,
        /// JSON run configuration (needed for mailing)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory for rendered output (defaults to a fresh temp dir)
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Mail the report to the configured recipients
        #[arg(long)]
        mail: bool,
        /// Dispatch mail through sendmail instead of local SMTP
        #[arg(long)]
        sendmail: bool,
    },
    /// Count every beacon in range over a scan period
    Survey {
        /// Number of minutes to scan
        #[arg(short, long, default_value_t = 1)]
        minutes: u64,
        /// CSV output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Include Tilt hydrometers in the counts
        #[arg(short = 'T', long)]
        include_tilts: bool,
    },
    /// Continuously print decoded beacons
    Watch,
}

/// Open the adapter, treating failure as fatal for the whole command.
async fn open_scanner() -> Result<HciScanner, Box<dyn Error>> {
    match HciScanner::open().await {
        Ok(scanner) => Ok(scanner),
        Err(e) => {
            error!("Error accessing bluetooth device: {}", e);
            Err(e.into())
        }
    }
}

fn field_or_dash(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Resolve the CSV log path for a color, rejecting anything unconfigured.
fn output_path<'a>(config: &'a Config, color: &str) -> Result<&'a Path, Box<dyn Error>> {
    config
        .hydrometers
        .get(color)
        .map(PathBuf::as_path)
        .ok_or_else(|| format!("no output path configured for color {color}").into())
}

async fn run_record(config_path: &PathBuf) -> Result<(), Box<dyn Error>> {
    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let mut scanner = open_scanner().await?;
    let records = monitor::monitor_tilt(&mut scanner, &config).await?;

    let mut captured = 0;
    for record in &records {
        let path = output_path(&config, &record.color)?;
        storage::append_records(path, std::slice::from_ref(record))?;
        info!(
            "Recorded {} to {}: sg={} c={} f={} from {} readings",
            record.color,
            path.display(),
            field_or_dash(record.gravity),
            field_or_dash(record.celsius),
            field_or_dash(record.fahrenheit),
            record.reading_count
        );
        captured += record.reading_count;
    }

    if captured == 0 {
        warn!("Run finished without a single reading");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .format_timestamp_secs()
        .init();

    match cli.command {
        Command::Record { config } => {
            run_record(&config).await?;
        }
        Command::Report {
            data,
            config,
            out_dir,
            mail,
            sendmail,
        } => {
            let config = match config {
                Some(path) => Some(Config::load(&path)?),
                None => None,
            };
            let options = ReportOptions {
                data,
                out_dir,
                mail,
                sendmail,
            };
            report::run_report(&options, config.as_ref())?;
        }
        Command::Survey {
            minutes,
            output,
            include_tilts,
        } => {
            let mut scanner = open_scanner().await?;
            let counts = survey::survey(&mut scanner, minutes, include_tilts).await?;
            survey::dump_counts(&counts, output.as_deref())?;
        }
        Command::Watch => {
            let mut scanner = open_scanner().await?;
            tokio::select! {
                result = monitor::watch_beacons(&mut scanner) => {
                    result?;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Terminated by user. Exiting gracefully.");
                }
            }
        }
    }

    Ok(())
}
