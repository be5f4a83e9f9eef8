//! Writing frames back to a container in reconstructed order

use opencv::{core::{Mat, Size}, videoio::VideoWriter, prelude::*};
use tracing::{instrument, debug, info};
use crate::common::{Result, ReconstructError};

/// Codec used when none is requested
pub const DEFAULT_FOURCC: [char; 4] = ['m', 'p', '4', 'v'];

/// Log encode progress every this many frames
const PROGRESS_INTERVAL: usize = 500;

/// Check that `ordering` is a permutation of `0..frame_count`
///
/// # Errors
/// * `InternalError` - On a length mismatch, an out-of-range index or a duplicate
pub fn validate_ordering(ordering: &[usize], frame_count: usize) -> Result<()> {
    if ordering.len() != frame_count {
        return Err(ReconstructError::internal_error(format!(
            "Ordering has {} entries for {} frames", ordering.len(), frame_count
        )));
    }

    let mut seen = vec![false; frame_count];
    for &index in ordering {
        match seen.get_mut(index) {
            None => {
                return Err(ReconstructError::internal_error(format!(
                    "Ordering references frame {} of {}", index, frame_count
                )))
            }
            Some(true) => {
                return Err(ReconstructError::internal_error(format!(
                    "Ordering places frame {} twice", index
                )))
            }
            Some(slot) => *slot = true,
        }
    }
    Ok(())
}

/// Encode `frames` in the order given by `ordering`
///
/// The output resolution is taken from the first frame.
///
/// # Errors
/// * `InvalidConfig` - If `fps` is not positive
/// * `EmptyInput` - If there are no frames
/// * `InternalError` - If `ordering` is not a permutation of the frames
/// * `VideoWriteFailed` - If OpenCV can't open the output for writing
#[instrument(skip(frames, ordering), fields(frame_count = frames.len()))]
pub fn write_reordered(
    frames: &[Mat],
    ordering: &[usize],
    path: &str,
    fps: f64,
    fourcc: [char; 4],
) -> Result<()> {
    if fps.is_nan() || fps <= 0.0 {
        return Err(ReconstructError::config_error(format!(
            "Output FPS must be positive, got: {}", fps
        )));
    }

    let first = frames.first().ok_or(ReconstructError::EmptyInput)?;
    validate_ordering(ordering, frames.len())?;

    let size = Size::new(first.cols(), first.rows());
    let code = VideoWriter::fourcc(fourcc[0], fourcc[1], fourcc[2], fourcc[3])?;
    let is_color = first.channels() > 1;

    info!("Saving reconstructed video to {} ({}x{} @ {:.2} FPS)",
          path, size.width, size.height, fps);

    let mut writer = VideoWriter::new(path, code, fps, size, is_color)
        .map_err(|_| ReconstructError::VideoWriteFailed { path: path.to_string() })?;

    if !writer.is_opened()? {
        return Err(ReconstructError::VideoWriteFailed { path: path.to_string() });
    }

    for (written, &index) in ordering.iter().enumerate() {
        writer.write(&frames[index])?;
        if (written + 1) % PROGRESS_INTERVAL == 0 {
            debug!("Wrote {}/{} frames", written + 1, ordering.len());
        }
    }

    writer.release()?;
    info!("Wrote {} frames to {}", ordering.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, CV_8UC3};

    fn frames(count: usize) -> Vec<Mat> {
        (0..count)
            .map(|_| Mat::new_rows_cols_with_default(4, 4, CV_8UC3, Scalar::all(0.0)).unwrap())
            .collect()
    }

    #[test]
    fn test_validate_ordering() {
        assert!(validate_ordering(&[2, 0, 1], 3).is_ok());
        assert!(validate_ordering(&[], 0).is_ok());

        assert!(matches!(
            validate_ordering(&[0, 1], 3),
            Err(ReconstructError::InternalError { .. })
        ));
        assert!(matches!(
            validate_ordering(&[0, 1, 3], 3),
            Err(ReconstructError::InternalError { .. })
        ));
        assert!(matches!(
            validate_ordering(&[0, 1, 1], 3),
            Err(ReconstructError::InternalError { .. })
        ));
    }

    #[test]
    fn test_write_rejects_bad_fps() {
        let result = write_reordered(&frames(2), &[0, 1], "unused.mp4", 0.0, DEFAULT_FOURCC);
        assert!(matches!(result, Err(ReconstructError::InvalidConfig { .. })));

        let result = write_reordered(&frames(2), &[0, 1], "unused.mp4", f64::NAN, DEFAULT_FOURCC);
        assert!(matches!(result, Err(ReconstructError::InvalidConfig { .. })));
    }

    #[test]
    fn test_write_rejects_empty_input() {
        let result = write_reordered(&[], &[], "unused.mp4", 30.0, DEFAULT_FOURCC);
        assert!(matches!(result, Err(ReconstructError::EmptyInput)));
    }

    #[test]
    fn test_write_rejects_bad_ordering() {
        let result = write_reordered(&frames(3), &[0, 0, 1], "unused.mp4", 30.0, DEFAULT_FOURCC);
        assert!(matches!(result, Err(ReconstructError::InternalError { .. })));
    }
}
