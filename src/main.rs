// src/main.rs
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rep_tracker::config::DEFAULT_CONFIG;
use rep_tracker::{
    EngineConfig, ExerciseKind, ExerciseSession, FrameStatus, JsonLinesSource, LightingPreset, PoseSource,
    TelemetryExporter,
};

/// Count exercise reps and check posture from recorded pose landmarks.
#[derive(Parser, Debug)]
#[command(name = "rep_tracker")]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a recording (one JSON frame per line) through a session
    Run {
        /// pushups, squats, lunges, jumpingjacks, highknees, wallsit, situps, plank or sideplank
        #[arg(short, long)]
        exercise: ExerciseKind,

        #[arg(short, long)]
        frames: PathBuf,

        /// JSON document overriding the default thresholds
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long, default_value_t = LightingPreset::Normal)]
        lighting: LightingPreset,

        /// Where to write events.csv and summary.json
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the default configuration as JSON
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            exercise,
            frames,
            config,
            lighting,
            output,
        } => run(exercise, frames, config, lighting, output),
        Commands::Config => {
            println!("{}", DEFAULT_CONFIG.to_json_pretty()?);
            Ok(())
        }
    }
}

fn run(
    exercise: ExerciseKind,
    frames: PathBuf,
    config: Option<PathBuf>,
    lighting: LightingPreset,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = match config {
        Some(path) => EngineConfig::load(&path).with_context(|| format!("loading {}", path.display()))?,
        None => DEFAULT_CONFIG.clone(),
    };
    let mut session = ExerciseSession::new(exercise, &config, lighting).context("invalid configuration")?;
    let mut source = JsonLinesSource::open(&frames)?;
    let mut exporter = TelemetryExporter::new(output.unwrap_or_else(TelemetryExporter::default_output_dir), None);

    let mut skipped = 0usize;
    while let Some(frame) = source
        .next_frame()
        .with_context(|| format!("reading {}", frames.display()))?
    {
        let outcome = session.process_frame(&frame);
        if matches!(outcome.status, FrameStatus::Skipped(_)) {
            skipped += 1;
        }
        if let Some(warning) = outcome.warning {
            println!("[{:>8}ms] {}", warning.timestamp_ms, warning.message);
        }
        exporter.record(session.telemetry_mut().drain());
    }

    if skipped > 0 {
        warn!("{} frames skipped for low visibility or out-of-order timestamps", skipped);
    }
    let summary = session.summary();
    let csv_path = exporter.export_csv()?;
    let summary_path = exporter.export_summary(&summary)?;
    info!("Exported {} and {}", csv_path.display(), summary_path.display());

    if exercise.counts_reps() {
        println!("{}: {} reps", exercise, summary.rep_count);
    } else {
        println!("{}: held {:.1}s", exercise, summary.hold_ms as f64 / 1000.0);
    }
    Ok(())
}
