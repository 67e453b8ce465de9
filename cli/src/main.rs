//! `speedtrack` CLI: scenario runs, detection-log replay, point mapping.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sim::replay::{load_log, save_log, DetectionLog};
use sim::scenarios::{Scenario, ScenarioKind};
use speed_core::metrics::SpeedMetrics;
use speed_core::pipeline::{FrameOutput, SpeedPipeline};
use speed_core::types::{DisplayLabel, PixelPoint};
use speed_core::SessionConfig;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "speedtrack", about = "Vehicle speed estimation from tracked detections")]
struct Cli {
    /// Session configuration JSON (estimator, filters, calibration)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a named scenario, estimate speeds and report accuracy.
    RunScenario {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also save the recorded detection log
        #[arg(long)]
        save_log: Option<PathBuf>,
    },
    /// Estimate speeds over a previously recorded detection log.
    Replay {
        /// Path to detection log JSON file
        input: PathBuf,
        /// Output per-frame labels to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print the labels of every frame
        #[arg(long)]
        print: bool,
    },
    /// Map pixel points to ground coordinates.
    Map {
        /// Calibration region JSON (defaults to the session's region)
        #[arg(long)]
        region: Option<PathBuf>,
        /// Real width of the calibrated rectangle (defaults to the session's)
        #[arg(long)]
        width: Option<f64>,
        /// Real length of the calibrated rectangle (defaults to the session's)
        #[arg(long)]
        length: Option<f64>,
        /// Pixel points as `x,y`
        #[arg(required = true, value_parser = parse_point)]
        points: Vec<PixelPoint>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let session = match &cli.config {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::default(),
    };
    tracing::debug!(?session, "session ready");

    match cli.command {
        Commands::RunScenario {
            scenario,
            seed,
            output,
            save_log: log_path,
        } => {
            run_scenario(&session, scenario, seed, output.as_deref(), log_path.as_deref())?;
        }
        Commands::Replay {
            input,
            output,
            print,
        } => {
            run_replay(&session, &input, output.as_deref(), print)?;
        }
        Commands::Map {
            region,
            width,
            length,
            points,
        } => {
            run_map(&session, region.as_deref(), width, length, &points)?;
        }
    }

    Ok(())
}

fn parse_point(s: &str) -> std::result::Result<PixelPoint, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{s}`"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("bad coordinate `{v}`: {e}"))
    };
    Ok(PixelPoint::new(parse(x)?, parse(y)?))
}

/// Pipeline for a log: session filters and smoothing, calibration and frame rate from the log.
fn pipeline_for(session: &SessionConfig, log: &DetectionLog) -> Result<SpeedPipeline> {
    Ok(SpeedPipeline::new(
        session.pipeline_config(log.fps),
        log.calibrator()?,
    )?)
}

/// Run every frame of `log`, scoring against ground truth when present.
fn process_log(
    pipeline: &mut SpeedPipeline,
    log: &DetectionLog,
    mut on_frame: impl FnMut(&FrameOutput),
) -> SpeedMetrics {
    let mut metrics = SpeedMetrics::default();
    for frame in &log.frames {
        let out = pipeline.process_frame(frame);
        if let Some(truth) = log.truth_at(frame.frame_index) {
            let labels: Vec<DisplayLabel> = out.labels.iter().map(|l| l.label).collect();
            metrics.accumulate(&labels, &truth.speeds());
        }
        on_frame(&out);
    }
    metrics
}

fn run_scenario(
    session: &SessionConfig,
    kind: ScenarioKind,
    seed: u64,
    output_path: Option<&Path>,
    log_path: Option<&Path>,
) -> Result<()> {
    let scenario = Scenario::build(kind, seed)?;
    println!(
        "Running scenario '{}' (seed={}, duration={:.0}s, {} vehicles)...",
        scenario.name,
        seed,
        scenario.duration,
        scenario.vehicles.len()
    );

    let log = scenario.record()?;
    let mut pipeline = pipeline_for(session, &log)?;

    let start = std::time::Instant::now();
    let mut max_live = 0;
    let metrics = process_log(&mut pipeline, &log, |out| max_live = max_live.max(out.live_tracks));
    let elapsed = start.elapsed();

    println!(
        "Done: {} frames, {} detections, peak {} live tracks, elapsed={:.3}s",
        log.frames.len(),
        log.detection_count(),
        max_live,
        elapsed.as_secs_f64(),
    );
    println!(
        "Speed error: RMSE {:.2} km/h, MAE {:.2} km/h, max {:.2} km/h, coverage {:.1}%",
        metrics.rmse_kmh(),
        metrics.mean_abs_error_kmh(),
        metrics.max_abs_err,
        metrics.coverage() * 100.0,
    );

    if let Some(lpath) = log_path {
        save_log(&log, lpath)?;
        println!("Detection log saved to {}", lpath.display());
    }

    if let Some(opath) = output_path {
        let json = serde_json::json!({
            "scenario": scenario.name,
            "seed": seed,
            "elapsed_s": elapsed.as_secs_f64(),
            "frames": log.frames.len(),
            "rmse_kmh": metrics.rmse_kmh(),
            "mae_kmh": metrics.mean_abs_error_kmh(),
            "coverage": metrics.coverage(),
            "metrics": metrics,
        });
        std::fs::write(opath, serde_json::to_string_pretty(&json)?)?;
        println!("Metrics saved to {}", opath.display());
    }

    Ok(())
}

fn run_replay(
    session: &SessionConfig,
    input: &Path,
    output_path: Option<&Path>,
    print: bool,
) -> Result<()> {
    let log = load_log(input)?;
    println!(
        "Replaying '{}' ({} frames at {} fps)...",
        log.scenario_name,
        log.frames.len(),
        log.fps
    );

    let mut pipeline = pipeline_for(session, &log)?;
    let mut per_frame = Vec::new();
    let start = std::time::Instant::now();

    let metrics = process_log(&mut pipeline, &log, |out| {
        if print && !out.labels.is_empty() {
            println!("{:>6}  {}", out.frame_index, out.label_strings().join("  "));
        }
        if output_path.is_some() {
            per_frame.push(serde_json::json!({
                "frame_index": out.frame_index,
                "labels": out.label_strings(),
                "detections": out.labels,
            }));
        }
    });

    let elapsed = start.elapsed();
    println!(
        "Replay done: {} tracks alive, elapsed={:.3}s",
        pipeline.estimator().len(),
        elapsed.as_secs_f64()
    );
    if !log.ground_truth.is_empty() {
        println!(
            "Speed error: RMSE {:.2} km/h, coverage {:.1}%",
            metrics.rmse_kmh(),
            metrics.coverage() * 100.0
        );
    }

    if let Some(opath) = output_path {
        std::fs::write(opath, serde_json::to_string_pretty(&per_frame)?)
            .with_context(|| format!("writing labels to {}", opath.display()))?;
        println!("Labels saved to {}", opath.display());
    }

    Ok(())
}

fn run_map(
    session: &SessionConfig,
    region: Option<&Path>,
    width: Option<f64>,
    length: Option<f64>,
    points: &[PixelPoint],
) -> Result<()> {
    let session = SessionConfig {
        region_path: region.map(Path::to_path_buf).or_else(|| session.region_path.clone()),
        real_width: width.or(session.real_width),
        real_length: length.or(session.real_length),
        ..session.clone()
    };
    let Some(calibrator) = session.load_calibrator() else {
        bail!("no calibration region: pass --region or set region_path in the session config");
    };
    let calibrator =
        calibrator.context("pass --width and --length or set them in the session config")?;

    let ground = calibrator.map_points(points);
    for (p, g) in points.iter().zip(&ground) {
        println!("{},{} -> {},{}", p.x, p.y, g.x, g.y);
    }
    Ok(())
}
