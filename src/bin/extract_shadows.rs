use chrono::Utc;
use clap::Parser;
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info};
use viewshade::{
    config::{self, ExtractionConfig},
    shadow::dataset::{SourceDatasets, extract_dataset},
};

/// Extract shadows by differencing two capture runs of the same pattern.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Root of the run captured with shadows enabled.
    #[arg(long)]
    shadow: PathBuf,

    /// Root of the run captured with shadows disabled.
    #[arg(long)]
    no_shadow: PathBuf,

    /// Output root. Defaults to a timestamped directory in the working directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file with extraction thresholds.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    // Register an event subscriber that prints events to STDOUT.
    let subscriber = tracing_subscriber::FmtSubscriber::new();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install logger: {e}");
    }

    let args = Args::parse();

    let config: ExtractionConfig = match &args.config {
        Some(path) => match config::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => ExtractionConfig::default(),
    };
    if let Err(e) = config.validate() {
        error!("{e}");
        return ExitCode::FAILURE;
    }

    let output = args.output.unwrap_or_else(|| {
        PathBuf::from(format!(
            "Extracted_Shadows_{}",
            Utc::now().format("%Y%m%d_%H%M%S")
        ))
    });
    let sources = SourceDatasets::new(&args.shadow, &args.no_shadow);

    match extract_dataset(&sources, &output, config) {
        Ok(report) => {
            info!(
                "detection rate {:.1}%, results in {}",
                report.summary.shadow_detection_rate * 100.0,
                output.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
