//! Reconstruction of the temporal order of a frame-shuffled video
//!
//! Given a video whose frames were randomly shuffled, this crate recovers an
//! ordering that approximates the original sequence using nothing but
//! pairwise visual similarity: a full mean-squared-error distance matrix,
//! greedy nearest-neighbour chaining from the most isolated frame, a single
//! local smoothing pass, and a forward/reverse continuity check.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use frame_reorder::{reconstruct_video, VideoJob};
//!
//! let report = reconstruct_video("jumbled_video.mp4", "reconstructed.mp4", &VideoJob::default())?;
//! println!("Frame order: {:?}", report.reconstruction.ordering);
//! # Ok::<(), frame_reorder::ReconstructError>(())
//! ```
//!
//! The core works on in-memory grayscale frames and needs no video at all:
//!
//! ```rust
//! use frame_reorder::{reconstruct_order, GrayFrame};
//!
//! let frames: Vec<GrayFrame> = [30u8, 0, 20, 10]
//!     .iter()
//!     .map(|&v| GrayFrame::filled(8, 8, v))
//!     .collect();
//! let ordering = reconstruct_order(&frames)?;
//! assert_eq!(ordering, vec![0, 2, 3, 1]);
//! # Ok::<(), frame_reorder::ReconstructError>(())
//! ```

mod common;
mod similarity;
mod distance_matrix;
mod sequencer;
mod smoother;
mod direction;
mod reconstructor;
mod video_stream;
mod video_writer;

// Re-export main types for public API
pub use common::{GrayFrame, ReconstructError, Result};
pub use similarity::mean_squared_error;
pub use distance_matrix::{DiagonalPolicy, DistanceMatrix, Parallelism};
pub use sequencer::{select_start, sequence, Sequenced, StartHeuristic};
pub use smoother::smooth;
pub use direction::{continuity_score, resolve_direction, Direction, DirectionReport};
pub use reconstructor::{
    reconstruct_order, PipelineStage, ReconstructConfig, Reconstruction, Reconstructor,
};
pub use video_stream::{to_gray_frame, to_gray_frames, VideoStream};
pub use video_writer::{validate_ordering, write_reordered, DEFAULT_FOURCC};

use tracing::{instrument, info};

/// Settings for a whole video-to-video job
#[derive(Debug, Clone, PartialEq)]
pub struct VideoJob {
    pub config: ReconstructConfig,
    /// Output frame rate; the source frame rate when `None`
    pub output_fps: Option<f64>,
    /// Proceed when the decoder yields fewer frames than the container declares
    pub allow_incomplete: bool,
    pub fourcc: [char; 4],
}

impl Default for VideoJob {
    fn default() -> Self {
        Self {
            config: ReconstructConfig::default(),
            output_fps: None,
            allow_incomplete: false,
            fourcc: DEFAULT_FOURCC,
        }
    }
}

/// Summary of a completed video job
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionReport {
    pub input: String,
    pub output: String,
    pub frame_count: usize,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub reconstruction: Reconstruction,
}

impl ReconstructionReport {
    /// JSON form of the report for programmatic consumption
    ///
    /// # Returns
    /// * `serde_json::Value` - Metadata, stage results and the full ordering
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "input": self.input,
            "output": self.output,
            "frame_count": self.frame_count,
            "fps": self.fps,
            "width": self.width,
            "height": self.height,
            "start_frame": self.reconstruction.start_frame,
            "smoothing_swaps": self.reconstruction.swaps,
            "reversed": self.reconstruction.direction.is_reversed(),
            "forward_score": self.reconstruction.forward_score,
            "reverse_score": self.reconstruction.reverse_score,
            "ordering": self.reconstruction.ordering,
        })
    }
}

/// Decode `input`, reconstruct its frame order, and write the result to `output`
///
/// The whole video is held in memory: the distance matrix needs every frame
/// before the first one can be placed.
///
/// # Arguments
/// * `input` - Path to the shuffled video
/// * `output` - Path the reordered video is written to
/// * `job` - Pipeline and encoder settings
///
/// # Returns
/// * `Result<ReconstructionReport>` - The recovered ordering with video metadata
///
/// # Errors
/// * `VideoNotFound` / `VideoOpenFailed` / `InvalidVideoFormat` - If the input
///   can't be read
/// * `EmptyInput` - If no frames were decoded
/// * `IncompleteDecode` - If the decoder stopped short and the job doesn't allow it
/// * `VideoWriteFailed` - If the output can't be written
///
/// # Example
/// ```rust,no_run
/// use frame_reorder::{reconstruct_video, VideoJob};
///
/// let job = VideoJob { output_fps: Some(30.0), ..VideoJob::default() };
/// let report = reconstruct_video("jumbled.mp4", "fixed.mp4", &job)?;
/// println!("{}", report.to_json());
/// # Ok::<(), frame_reorder::ReconstructError>(())
/// ```
#[instrument(skip(job))]
pub fn reconstruct_video(input: &str, output: &str, job: &VideoJob) -> Result<ReconstructionReport> {
    info!("Starting reconstruction for: {}", input);

    // Decode every frame up front
    let mut stream = VideoStream::open(input)?;
    let frames = stream.read_all(job.allow_incomplete)?;
    let gray = to_gray_frames(&frames)?;

    // Order on intensity only; the colour frames are what gets written
    let reconstruction = Reconstructor::new(job.config.clone()).reconstruct(&gray)?;

    // Fall back to the source frame rate
    let fps = job.output_fps.unwrap_or_else(|| stream.fps());
    write_reordered(&frames, &reconstruction.ordering, output, fps, job.fourcc)?;

    info!("Reconstructed video saved as {}", output);

    Ok(ReconstructionReport {
        input: input.to_string(),
        output: output.to_string(),
        frame_count: frames.len(),
        fps,
        width: stream.width() as u32,
        height: stream.height() as u32,
        reconstruction,
    })
}

/// Get video information without decoding any frames
///
/// Useful for estimating the cost of a reconstruction before running it.
///
/// # Arguments
/// * `video_path` - Path to the video file
///
/// # Returns
/// * `Result<VideoInfo>` - Container metadata as reported by OpenCV
///
/// # Errors
/// * `VideoNotFound` / `VideoOpenFailed` / `InvalidVideoFormat` - If the
///   video can't be opened
/// * `EmptyInput` - If the container declares no frames
#[instrument]
pub fn get_video_info(video_path: &str) -> Result<VideoInfo> {
    let video_stream = VideoStream::open(video_path)?;

    Ok(VideoInfo {
        path: video_path.to_string(),
        fps: video_stream.fps(),
        frame_count: video_stream.frame_count() as u32,
        width: video_stream.width() as u32,
        height: video_stream.height() as u32,
        duration_seconds: video_stream.duration_seconds(),
    })
}

/// Video metadata information
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub path: String,
    pub fps: f64,
    pub frame_count: u32,
    pub width: u32,
    pub height: u32,
    pub duration_seconds: f64,
}

impl VideoInfo {
    /// Get a human-readable description of the video
    pub fn description(&self) -> String {
        format!(
            "{}x{} at {:.2}fps, {} frames ({:.1}s duration)",
            self.width, self.height, self.fps, self.frame_count, self.duration_seconds
        )
    }

    /// Check if this appears to be a valid video configuration
    pub fn is_valid(&self) -> bool {
        self.fps > 0.0
            && self.frame_count > 0
            && self.width > 0
            && self.height > 0
            && self.duration_seconds > 0.0
    }

    /// Number of distance evaluations a full reconstruction will perform
    ///
    /// This is `n(n-1)/2`; the matrix build dominates running time.
    pub fn pair_count(&self) -> u64 {
        let n = self.frame_count as u64;
        n * n.saturating_sub(1) / 2
    }
}

/// Initialize tracing for the library
///
/// Call this once at the start of your application to enable log output.
/// `RUST_LOG` overrides `level` when set.
///
/// # Arguments
/// * `level` - Tracing level filter (e.g., "debug", "info", "warn", "error")
pub fn init_tracing(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Frame reorder library initialized with tracing level: {}", level);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info() -> VideoInfo {
        VideoInfo {
            path: "jumbled.mp4".to_string(),
            fps: 30.0,
            frame_count: 300,
            width: 1920,
            height: 1080,
            duration_seconds: 10.0,
        }
    }

    #[test]
    fn test_video_info_description() {
        let info = sample_info();
        assert!(info.is_valid());
        assert!(info.description().contains("1920x1080"));
        assert!(info.description().contains("30.00fps"));
        assert!(info.description().contains("300 frames"));
    }

    #[test]
    fn test_video_info_validation() {
        let valid_info = sample_info();

        let invalid_fps = VideoInfo { fps: 0.0, ..valid_info.clone() };
        assert!(!invalid_fps.is_valid());

        let invalid_frames = VideoInfo { frame_count: 0, ..valid_info.clone() };
        assert!(!invalid_frames.is_valid());

        let invalid_width = VideoInfo { width: 0, ..valid_info.clone() };
        assert!(!invalid_width.is_valid());

        let invalid_duration = VideoInfo { duration_seconds: 0.0, ..valid_info };
        assert!(!invalid_duration.is_valid());
    }

    #[test]
    fn test_pair_count() {
        assert_eq!(sample_info().pair_count(), 300 * 299 / 2);
        let empty = VideoInfo { frame_count: 0, ..sample_info() };
        assert_eq!(empty.pair_count(), 0);
    }

    #[test]
    fn test_default_job() {
        let job = VideoJob::default();
        assert_eq!(job.output_fps, None);
        assert!(!job.allow_incomplete);
        assert_eq!(job.fourcc, ['m', 'p', '4', 'v']);
        assert_eq!(job.config, ReconstructConfig::default());
    }

    #[test]
    fn test_reconstruct_video_missing_input() {
        let result = reconstruct_video("no_such_video.mp4", "out.mp4", &VideoJob::default());
        assert!(matches!(result, Err(ReconstructError::VideoNotFound { .. })));
    }

    #[test]
    fn test_get_video_info_missing_input() {
        assert!(matches!(
            get_video_info("no_such_video.mp4"),
            Err(ReconstructError::VideoNotFound { .. })
        ));
    }

    #[test]
    fn test_report_json() {
        let report = ReconstructionReport {
            input: "in.mp4".to_string(),
            output: "out.mp4".to_string(),
            frame_count: 3,
            fps: 25.0,
            width: 64,
            height: 48,
            reconstruction: Reconstruction {
                ordering: vec![2, 0, 1],
                start_frame: 1,
                swaps: 1,
                direction: Direction::Reversed,
                forward_score: 10.0,
                reverse_score: 5.0,
            },
        };

        let json = report.to_json();
        assert_eq!(json["frame_count"], 3);
        assert_eq!(json["reversed"], true);
        assert_eq!(json["ordering"], serde_json::json!([2, 0, 1]));
        assert_eq!(json["start_frame"], 1);
    }
}
