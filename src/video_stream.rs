//! Video stream handling using OpenCV backend
//!
//! This module wraps OpenCV's VideoCapture for decoding a shuffled video into
//! an ordered list of frames, and reduces decoded frames to the single-channel
//! intensity images the reconstruction core compares.

use opencv::{core::{Mat, CV_8U}, imgproc, videoio, prelude::*};
use tracing::{instrument, debug, warn, info};
use std::path::Path;
use crate::common::{GrayFrame, Result, ReconstructError};

/// Log decode progress every this many frames
const PROGRESS_INTERVAL: usize = 500;

/// Wrapper around OpenCV VideoCapture for reading every frame of a video
///
/// The stream remembers the resolution reported at open time and rejects any
/// later frame that disagrees with it.
pub struct VideoStream {
    cap: videoio::VideoCapture,
    fps: f64,
    frame_count: i32,
    current_frame: i32,
    width: i32,
    height: i32,
    path: String,
}

impl VideoStream {
    /// Open a video file for reading
    ///
    /// # Arguments
    /// * `path` - Path to the video file
    ///
    /// # Returns
    /// * `Result<VideoStream>` - A new video stream instance or an error
    ///
    /// # Errors
    /// * `VideoNotFound` - If the file doesn't exist
    /// * `VideoOpenFailed` - If OpenCV can't open the file
    /// * `InvalidVideoFormat` - If the reported properties are unusable
    /// * `EmptyInput` - If the container declares no frames
    #[instrument(skip(path))]
    pub fn open(path: &str) -> Result<Self> {
        info!("Opening video stream: {}", path);

        // Check if file exists first
        if !Path::new(path).exists() {
            return Err(ReconstructError::VideoNotFound {
                path: path.to_string()
            });
        }

        // Open video capture
        let cap = videoio::VideoCapture::from_file(path, videoio::CAP_ANY)
            .map_err(|e| {
                warn!("Failed to create VideoCapture: {}", e);
                ReconstructError::VideoOpenFailed {
                    path: path.to_string()
                }
            })?;

        // Verify the capture is opened
        let is_opened = cap.is_opened().map_err(|e| {
            warn!("Failed to check if VideoCapture is opened: {}", e);
            ReconstructError::VideoOpenFailed {
                path: path.to_string()
            }
        })?;

        if !is_opened {
            return Err(ReconstructError::VideoOpenFailed {
                path: path.to_string()
            });
        }

        // Get video properties
        let property = |id: i32, name: &str| -> Result<f64> {
            cap.get(id).map_err(|e| {
                warn!("Failed to get video {}: {}", name, e);
                ReconstructError::InvalidVideoFormat {
                    path: path.to_string()
                }
            })
        };

        let fps = property(videoio::CAP_PROP_FPS, "FPS")?;
        let frame_count = property(videoio::CAP_PROP_FRAME_COUNT, "frame count")? as i32;
        let width = property(videoio::CAP_PROP_FRAME_WIDTH, "frame width")? as i32;
        let height = property(videoio::CAP_PROP_FRAME_HEIGHT, "frame height")? as i32;

        // Validate video properties before any frame is decoded
        if fps <= 0.0 || width <= 0 || height <= 0 {
            return Err(ReconstructError::InvalidVideoFormat {
                path: path.to_string()
            });
        }

        if frame_count <= 0 {
            return Err(ReconstructError::EmptyInput);
        }

        info!("Video opened successfully - FPS: {}, Frames: {}, Size: {}x{}",
              fps, frame_count, width, height);

        Ok(Self {
            cap,
            fps,
            frame_count,
            current_frame: 0,
            width,
            height,
            path: path.to_string(),
        })
    }

    /// Read the next frame from the video
    ///
    /// # Returns
    /// * `Result<Option<Mat>>` - The next frame if available, None at end of video
    ///
    /// # Errors
    /// * `ShapeMismatch` - If the frame's resolution differs from the stream's
    #[instrument(skip(self))]
    pub fn read_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();

        let success = self.cap.read(&mut frame)?;

        if !success || frame.empty() {
            debug!("Reached end of video at frame {}", self.current_frame);
            return Ok(None);
        }

        // A resolution change mid-stream would break the pairwise metric
        if frame.rows() != self.height || frame.cols() != self.width {
            return Err(ReconstructError::ShapeMismatch {
                index: self.current_frame as usize,
                expected: (self.width as u32, self.height as u32),
                found: (frame.cols() as u32, frame.rows() as u32),
            });
        }

        self.current_frame += 1;
        debug!("Read frame {}/{}", self.current_frame, self.frame_count);
        Ok(Some(frame))
    }

    /// Decode every remaining frame
    ///
    /// Reading stops at the first failed decode. A short read is an error
    /// unless `allow_incomplete` is set, in which case it is logged.
    ///
    /// # Arguments
    /// * `allow_incomplete` - Accept fewer frames than the container declares
    ///
    /// # Returns
    /// * `Result<Vec<Mat>>` - The decoded frames in file order
    ///
    /// # Errors
    /// * `EmptyInput` - If no frame could be decoded
    /// * `IncompleteDecode` - If fewer frames than declared were decoded and
    ///   `allow_incomplete` is false
    #[instrument(skip(self))]
    pub fn read_all(&mut self, allow_incomplete: bool) -> Result<Vec<Mat>> {
        let expected = self.frame_count as usize;
        let mut frames = Vec::with_capacity(expected);

        while let Some(frame) = self.read_frame()? {
            frames.push(frame);
            if frames.len() % PROGRESS_INTERVAL == 0 {
                debug!("Decoded {}/{} frames ({:.1}%)",
                       frames.len(), expected, self.progress_percent());
            }
        }

        if frames.is_empty() {
            return Err(ReconstructError::EmptyInput);
        }

        // Container frame counts are estimates for some codecs
        if frames.len() < expected {
            if !allow_incomplete {
                return Err(ReconstructError::IncompleteDecode {
                    expected,
                    decoded: frames.len(),
                });
            }
            warn!("Decoded {} of {} declared frames; continuing", frames.len(), expected);
        }

        info!("Frames extracted: {}", frames.len());
        Ok(frames)
    }

    /// Get the video framerate
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Get the total number of frames the container declares
    pub fn frame_count(&self) -> i32 {
        self.frame_count
    }

    /// Get the number of frames read so far (0 means no frames read yet)
    pub fn current_frame(&self) -> i32 {
        self.current_frame
    }

    /// Get the frame width in pixels
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Get the frame height in pixels
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Get the video file path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the video duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.frame_count as f64 / self.fps
    }

    /// Get the progress as a percentage (0.0 to 100.0)
    pub fn progress_percent(&self) -> f64 {
        if self.frame_count == 0 {
            100.0
        } else {
            (self.current_frame as f64 / self.frame_count as f64) * 100.0
        }
    }
}

// Implement Debug manually to avoid showing internal OpenCV state
impl std::fmt::Debug for VideoStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoStream")
            .field("path", &self.path)
            .field("fps", &self.fps)
            .field("frame_count", &self.frame_count)
            .field("current_frame", &self.current_frame)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Reduce a decoded frame to a single-channel intensity image
///
/// Three-channel frames are treated as BGR (OpenCV's decode order); single
/// channel frames are copied as-is.
///
/// # Arguments
/// * `frame` - An 8-bit frame as decoded by OpenCV
///
/// # Returns
/// * `Result<GrayFrame>` - The frame's intensity image, same width and height
///
/// # Errors
/// * `InvalidFrame` - If the frame is empty, not 8-bit, or has an unsupported
///   channel count
#[instrument(skip(frame))]
pub fn to_gray_frame(frame: &Mat) -> Result<GrayFrame> {
    // Validate the input (fail-fast approach)
    if frame.empty() {
        return Err(ReconstructError::InvalidFrame {
            reason: "empty frame".to_string(),
        });
    }

    if frame.depth() != CV_8U {
        return Err(ReconstructError::InvalidFrame {
            reason: format!("expected 8-bit pixels, got depth {}", frame.depth()),
        });
    }

    // Convert to a single channel
    let gray = match frame.channels() {
        1 => frame.try_clone()?,
        3 => {
            let mut gray = Mat::default();
            imgproc::cvt_color_def(frame, &mut gray, imgproc::COLOR_BGR2GRAY)?;
            gray
        }
        4 => {
            let mut gray = Mat::default();
            imgproc::cvt_color_def(frame, &mut gray, imgproc::COLOR_BGRA2GRAY)?;
            gray
        }
        other => {
            return Err(ReconstructError::InvalidFrame {
                reason: format!("unsupported channel count {}", other),
            })
        }
    };

    // ROIs are not continuous; a clone packs the rows.
    let gray = if gray.is_continuous() { gray } else { gray.try_clone()? };

    GrayFrame::new(gray.cols() as u32, gray.rows() as u32, gray.data_bytes()?.to_vec())
}

/// Reduce every decoded frame to grayscale, preserving order
///
/// # Errors
/// * `InvalidFrame` - If any frame can't be reduced; see [`to_gray_frame`]
#[instrument(skip(frames), fields(frame_count = frames.len()))]
pub fn to_gray_frames(frames: &[Mat]) -> Result<Vec<GrayFrame>> {
    let gray = frames.iter().map(to_gray_frame).collect::<Result<Vec<_>>>()?;
    debug!("Reduced {} frames to grayscale", gray.len());
    Ok(gray)
}
