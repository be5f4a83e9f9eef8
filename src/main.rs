//! Command-line interface for the frame reorder library
//!
//! Reads a video whose frames were shuffled, reconstructs the most likely
//! original order, and writes the re-ordered video next to the input (or to
//! `--output`).

use std::env;
use std::path::Path;
use std::process;
use std::time::{Duration, Instant};
use anyhow::{bail, Context};
use tracing::{info, warn, debug};
use frame_reorder::{
    get_video_info, init_tracing, reconstruct_video,
    Parallelism, ReconstructConfig, ReconstructionReport, StartHeuristic, VideoJob,
};

/// Command-line arguments structure
#[derive(Debug)]
struct Args {
    input_path: String,
    output_path: Option<String>,
    fps: Option<f64>,
    start_heuristic: StartHeuristic,
    smoothing: bool,
    resolve_direction: bool,
    sequential: bool,
    allow_incomplete: bool,
    verbose: bool,
    show_video_info: bool,
    output_format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Simple,     // One summary line
    Detailed,   // Scores, timings and the ordering
    Json,       // JSON format for integration
}

impl Default for Args {
    fn default() -> Self {
        Self {
            input_path: String::new(),
            output_path: None,
            fps: None,
            start_heuristic: StartHeuristic::MostIsolated,
            smoothing: true,
            resolve_direction: true,
            sequential: false,
            allow_incomplete: false,
            verbose: false,
            show_video_info: false,
            output_format: OutputFormat::Simple,
        }
    }
}

impl Args {
    fn output_path(&self) -> String {
        match &self.output_path {
            Some(path) => path.clone(),
            None => default_output_path(&self.input_path),
        }
    }

    fn job(&self) -> VideoJob {
        VideoJob {
            config: ReconstructConfig {
                start_heuristic: self.start_heuristic,
                parallelism: if self.sequential { Parallelism::Sequential } else { Parallelism::Parallel },
                smoothing: self.smoothing,
                resolve_direction: self.resolve_direction,
            },
            output_fps: self.fps,
            allow_incomplete: self.allow_incomplete,
            ..VideoJob::default()
        }
    }
}

const USAGE_OPTIONS: &str = "\
Options:
  --output <path>          Output video (default: reconstructed_<input> next to input)
  --fps <value>            Output frame rate (default: input frame rate)
  --start <heuristic>      Start frame heuristic: isolated|legacy (default: isolated)
  --no-smooth              Skip the local smoothing pass
  --no-direction           Skip forward/reverse resolution
  --sequential             Build the distance matrix on one thread
  --allow-incomplete       Continue when fewer frames decode than declared
  --verbose                Enable debug logging
  --info                   Show video information only
  --format <fmt>           Output format: simple|detailed|json (default: simple)
  --help                   Show this help message";

fn main() {
    let result = run();

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = parse_args(env::args().collect())?;

    let log_level = if args.verbose { "debug" } else { "info" };
    init_tracing(log_level);

    info!("Frame Reorder CLI v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if args.show_video_info {
        show_video_info(&args.input_path)?;
        return Ok(());
    }

    let output_path = args.output_path();
    let start_time = Instant::now();

    let report = reconstruct_video(&args.input_path, &output_path, &args.job())
        .with_context(|| format!("Reconstruction of {} failed", args.input_path))?;

    output_results(&report, &args, start_time.elapsed())?;

    Ok(())
}

fn default_output_path(input_path: &str) -> String {
    let input = Path::new(input_path);
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video.mp4".to_string());
    let output_name = format!("reconstructed_{}", file_name);

    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            parent.join(output_name).to_string_lossy().into_owned()
        }
        _ => output_name,
    }
}

fn parse_args(args: Vec<String>) -> anyhow::Result<Args> {
    let program = args.first().map(String::as_str).unwrap_or("frame-reorder");

    if args.len() < 2 {
        bail!("Usage: {} <video_path> [OPTIONS]\n\n{}", program, USAGE_OPTIONS);
    }

    if args[1] == "--help" {
        bail!(
            "Frame Reorder Tool\n\n\
            Usage: {} <video_path> [OPTIONS]\n\n\
            Reconstructs the original order of a video whose frames were shuffled,\n\
            using only visual similarity between frames.\n\n{}",
            program, USAGE_OPTIONS
        );
    }

    let mut parsed_args = Args {
        input_path: args[1].clone(),
        ..Args::default()
    };

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--output" => {
                parsed_args.output_path = Some(option_value(&args, i)?.to_string());
                i += 2;
            }
            "--fps" => {
                let fps: f64 = option_value(&args, i)?.parse().context("Invalid fps value")?;
                if fps.is_nan() || fps <= 0.0 {
                    bail!("--fps must be positive, got {}", fps);
                }
                parsed_args.fps = Some(fps);
                i += 2;
            }
            "--start" => {
                parsed_args.start_heuristic = match option_value(&args, i)? {
                    "isolated" => StartHeuristic::MostIsolated,
                    "legacy" => StartHeuristic::IncludeDiagonal,
                    _ => bail!("Invalid start heuristic. Use 'isolated' or 'legacy'"),
                };
                i += 2;
            }
            "--format" => {
                parsed_args.output_format = match option_value(&args, i)? {
                    "simple" => OutputFormat::Simple,
                    "detailed" => OutputFormat::Detailed,
                    "json" => OutputFormat::Json,
                    _ => bail!("Invalid format. Use 'simple', 'detailed', or 'json'"),
                };
                i += 2;
            }
            "--no-smooth" => {
                parsed_args.smoothing = false;
                i += 1;
            }
            "--no-direction" => {
                parsed_args.resolve_direction = false;
                i += 1;
            }
            "--sequential" => {
                parsed_args.sequential = true;
                i += 1;
            }
            "--allow-incomplete" => {
                parsed_args.allow_incomplete = true;
                i += 1;
            }
            "--verbose" => {
                parsed_args.verbose = true;
                i += 1;
            }
            "--info" => {
                parsed_args.show_video_info = true;
                i += 1;
            }
            "--help" => {
                bail!("Usage: {} <video_path> [OPTIONS]\n\n{}", program, USAGE_OPTIONS);
            }
            other => {
                bail!("Unknown option: {}", other);
            }
        }
    }

    Ok(parsed_args)
}

fn option_value(args: &[String], i: usize) -> anyhow::Result<&str> {
    args.get(i + 1)
        .map(String::as_str)
        .with_context(|| format!("{} requires a value", args[i]))
}

fn show_video_info(video_path: &str) -> anyhow::Result<()> {
    info!("Analyzing video: {}", video_path);

    let video_info = get_video_info(video_path).context("Failed to get video info")?;

    println!("Video Information:");
    println!("  Path: {}", video_info.path);
    println!("  Dimensions: {}x{}", video_info.width, video_info.height);
    println!("  Frame Rate: {:.2} fps", video_info.fps);
    println!("  Frame Count: {}", video_info.frame_count);
    println!("  Duration: {:.2} seconds", video_info.duration_seconds);
    println!("  Frame Pairs: {}", video_info.pair_count());
    println!("  Description: {}", video_info.description());

    if !video_info.is_valid() {
        warn!("Video properties appear invalid - reconstruction may fail");
    }

    Ok(())
}

fn output_results(report: &ReconstructionReport, args: &Args, elapsed: Duration) -> anyhow::Result<()> {
    let reconstruction = &report.reconstruction;

    match args.output_format {
        OutputFormat::Simple => {
            let direction = if reconstruction.direction.is_reversed() { "reversed" } else { "forward" };
            println!("Reconstructed {} frames ({} order) -> {}",
                     report.frame_count, direction, report.output);
        }
        OutputFormat::Detailed => {
            println!("Reconstruction Results:");
            println!("  Input: {}", report.input);
            println!("  Output: {}", report.output);
            println!("  Frames: {} ({}x{} @ {:.2} fps)",
                     report.frame_count, report.width, report.height, report.fps);
            println!("  Processing time: {:.2}s", elapsed.as_secs_f64());
            println!("  Start frame: {}", reconstruction.start_frame);
            println!("  Smoothing swaps: {}", reconstruction.swaps);
            println!("  Continuity: forward={:.3} reverse={:.3} -> {:?}",
                     reconstruction.forward_score, reconstruction.reverse_score,
                     reconstruction.direction);
            println!("  Frame order: {:?}", reconstruction.ordering);
        }
        OutputFormat::Json => {
            let mut json_output = report.to_json();
            json_output["processing_time_ms"] = serde_json::json!(elapsed.as_millis() as u64);
            json_output["config"] = serde_json::json!({
                "start_heuristic": format!("{:?}", args.start_heuristic),
                "smoothing": args.smoothing,
                "resolve_direction": args.resolve_direction,
                "sequential": args.sequential,
            });

            println!("{}", serde_json::to_string_pretty(&json_output)
                .context("JSON serialization failed")?);
        }
    }

    info!("Done in {:.2}s", elapsed.as_secs_f64());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_args_parsing_basic() {
        let args = parse_args(argv(&[
            "frame-reorder", "in.mp4", "--output", "out.mp4", "--fps", "24",
            "--start", "legacy", "--no-smooth", "--sequential", "--format", "json",
        ]))
        .unwrap();

        assert_eq!(args.input_path, "in.mp4");
        assert_eq!(args.output_path(), "out.mp4");
        assert_eq!(args.fps, Some(24.0));
        assert_eq!(args.start_heuristic, StartHeuristic::IncludeDiagonal);
        assert!(!args.smoothing);
        assert!(args.resolve_direction);
        assert!(args.sequential);
        assert_eq!(args.output_format, OutputFormat::Json);

        let job = args.job();
        assert_eq!(job.output_fps, Some(24.0));
        assert_eq!(job.config.parallelism, Parallelism::Sequential);
        assert!(!job.config.smoothing);
    }

    #[test]
    fn test_default_args() {
        let args = parse_args(argv(&["frame-reorder", "clips/jumbled.mp4"])).unwrap();
        assert_eq!(args.output_path, None);
        assert_eq!(args.fps, None);
        assert!(args.smoothing);
        assert!(args.resolve_direction);
        assert!(!args.allow_incomplete);
        assert!(!args.verbose);
        assert!(!args.show_video_info);
        assert_eq!(args.output_format, OutputFormat::Simple);
        assert_eq!(args.job().config, ReconstructConfig::default());
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(default_output_path("jumbled.mp4"), "reconstructed_jumbled.mp4");

        let nested = default_output_path("clips/jumbled.mp4");
        assert_eq!(Path::new(&nested), Path::new("clips").join("reconstructed_jumbled.mp4"));
    }

    #[test]
    fn test_args_errors() {
        assert!(parse_args(argv(&["frame-reorder"])).is_err());
        assert!(parse_args(argv(&["frame-reorder", "--help"])).is_err());
        assert!(parse_args(argv(&["frame-reorder", "in.mp4", "--fps"])).is_err());
        assert!(parse_args(argv(&["frame-reorder", "in.mp4", "--fps", "abc"])).is_err());
        assert!(parse_args(argv(&["frame-reorder", "in.mp4", "--fps", "-5"])).is_err());
        assert!(parse_args(argv(&["frame-reorder", "in.mp4", "--start", "middle"])).is_err());
        assert!(parse_args(argv(&["frame-reorder", "in.mp4", "--format", "xml"])).is_err());
        assert!(parse_args(argv(&["frame-reorder", "in.mp4", "--bogus"])).is_err());
    }

    #[test]
    fn test_missing_value_message() {
        let error = parse_args(argv(&["frame-reorder", "in.mp4", "--output"])).unwrap_err();
        assert_eq!(error.to_string(), "--output requires a value");
    }
}
