use clap::Parser;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
    process::ExitCode,
};
use tracing::{error, info};
use viewshade::{
    config,
    pattern::{Pattern, PatternKind, PatternSpec},
};

/// Print the poses of a trajectory as JSON.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Stock preset to generate.
    #[arg(long, default_value_t = PatternKind::Lawnmower, conflicts_with = "config")]
    pattern: PatternKind,

    /// JSON file holding a pattern with its parameters, tagged by `pattern_type`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Optional path to write output to. Defaults to STDOUT.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    // Events go to STDERR so that STDOUT carries only the poses.
    let subscriber = tracing_subscriber::fmt().with_writer(io::stderr).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install logger: {e}");
    }

    let args = Args::parse();

    let spec: PatternSpec = match &args.config {
        Some(path) => match config::load(path) {
            Ok(spec) => spec,
            Err(e) => {
                error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => PatternSpec::example(args.pattern),
    };

    let poses = match spec.poses() {
        Ok(poses) => poses,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    info!("generated {} poses with {} pattern", poses.len(), spec.kind());

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => match File::create(path) {
            Ok(file) => Box::new(file),
            Err(e) => {
                error!("failed to create {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(io::stdout()),
    };

    let mut writer = BufWriter::new(writer);
    let written = serde_json::to_writer_pretty(&mut writer, &poses)
        .map_err(io::Error::from)
        .and_then(|()| writeln!(writer))
        .and_then(|()| writer.flush());
    if let Err(e) = written {
        error!("failed to write poses: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
