//! Common types, utilities, and error handling for the reconstruction library.
//!
//! This module provides the foundational types used throughout the codebase:
//! the grayscale frame every stage reads, and the error type every stage returns.

/// A single-channel intensity image
///
/// Frames are identified only by their position in the shuffled input. The
/// pixel buffer is row-major and never mutated once constructed.
#[derive(Clone, PartialEq, Eq)]
pub struct GrayFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl GrayFrame {
    /// Create a frame from a row-major intensity buffer
    ///
    /// # Errors
    /// * `InvalidFrame` - If `data.len()` is not `width * height`
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(ReconstructError::InvalidFrame {
                reason: format!(
                    "buffer holds {} bytes, {}x{} needs {}",
                    data.len(), width, height, expected
                ),
            });
        }

        Ok(Self { width, height, data })
    }

    /// Create a frame where every pixel has the same intensity
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    /// Get the frame width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the frame height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get `(width, height)`
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels in the frame
    pub fn pixel_count(&self) -> usize {
        self.data.len()
    }

    /// Raw row-major intensities
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }
}

// Pixel buffers can be megabytes; keep Debug output to the shape.
impl std::fmt::Debug for GrayFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrayFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// All possible errors from the reconstruction system
///
/// Every error is fatal to a run. A poor ordering is never an error; only
/// structurally missing or malformed input is.
#[derive(Debug, thiserror::Error)]
pub enum ReconstructError {
    #[error("No frames to reconstruct")]
    EmptyInput,

    #[error("Frame {index} is {found:?}, expected {expected:?} (width, height)")]
    ShapeMismatch {
        index: usize,
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("Decoder produced {decoded} frames, container declared {expected}")]
    IncompleteDecode { expected: usize, decoded: usize },

    #[error("Invalid frame: {reason}")]
    InvalidFrame { reason: String },

    #[error("Failed to open video file: {path}")]
    VideoOpenFailed { path: String },

    #[error("Video file not found: {path}")]
    VideoNotFound { path: String },

    #[error("Invalid video format or corrupted file: {path}")]
    InvalidVideoFormat { path: String },

    #[error("Failed to open video writer: {path}")]
    VideoWriteFailed { path: String },

    #[error("OpenCV error: {0}")]
    OpenCvError(#[from] opencv::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl ReconstructError {
    /// Create a configuration error with a descriptive message
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }

    /// Create an internal error (for unexpected conditions)
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError { message: message.into() }
    }
}

/// Convenient Result type for reconstruction operations
pub type Result<T> = std::result::Result<T, ReconstructError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_frame_creation() {
        let frame = GrayFrame::new(3, 2, vec![0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(frame.width(), 3);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.dimensions(), (3, 2));
        assert_eq!(frame.pixel_count(), 6);
        assert_eq!(frame.pixels()[4], 4);
    }

    #[test]
    fn test_gray_frame_wrong_buffer_length() {
        let result = GrayFrame::new(4, 4, vec![0; 15]);
        assert!(matches!(result, Err(ReconstructError::InvalidFrame { .. })));
    }

    #[test]
    fn test_gray_frame_filled() {
        let frame = GrayFrame::filled(4, 3, 77);
        assert_eq!(frame.pixel_count(), 12);
        assert!(frame.pixels().iter().all(|&p| p == 77));

        // Helpers build many small frames; a large batch stays cheap and exact
        let batch: Vec<GrayFrame> = (0..=255u8).map(|v| GrayFrame::filled(8, 8, v)).collect();
        assert_eq!(batch.len(), 256);
        assert!(batch.iter().enumerate().all(|(v, f)| f.pixels()[63] == v as u8));
        assert_eq!(batch[10], GrayFrame::new(8, 8, vec![10; 64]).unwrap());
    }

    #[test]
    fn test_gray_frame_debug_omits_pixels() {
        let frame = GrayFrame::filled(2, 2, 9);
        let debug_str = format!("{:?}", frame);
        assert!(debug_str.contains("GrayFrame"));
        assert!(debug_str.contains("width"));
        assert!(!debug_str.contains("data"));
    }

    #[test]
    fn test_error_types() {
        let error = ReconstructError::config_error("fps must be positive");
        assert!(matches!(error, ReconstructError::InvalidConfig { .. }));

        let error = ReconstructError::internal_error("Unexpected condition");
        assert!(matches!(error, ReconstructError::InternalError { .. }));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(ReconstructError::EmptyInput.to_string(), "No frames to reconstruct");

        let error = ReconstructError::ShapeMismatch {
            index: 3,
            expected: (640, 480),
            found: (320, 240),
        };
        assert_eq!(
            error.to_string(),
            "Frame 3 is (320, 240), expected (640, 480) (width, height)"
        );

        let error = ReconstructError::IncompleteDecode { expected: 100, decoded: 97 };
        assert_eq!(error.to_string(), "Decoder produced 97 frames, container declared 100");

        let error = ReconstructError::VideoNotFound { path: "test.mp4".to_string() };
        assert_eq!(error.to_string(), "Video file not found: test.mp4");
    }
}
