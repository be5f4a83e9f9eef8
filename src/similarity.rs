//! Similarity metric between two grayscale frames
//!
//! The dissimilarity of two frames is the mean of squared per-pixel intensity
//! differences. It is symmetric, zero only for pixel-identical frames, and
//! defined only for frames of equal shape.

use tracing::trace;
use crate::common::{GrayFrame, Result, ReconstructError};

/// Mean squared pixel difference between two equal-shaped frames
///
/// # Errors
/// * `ShapeMismatch` - If the frames differ in dimensions. The reported index
///   is `1`, the right-hand operand.
pub fn mean_squared_error(left: &GrayFrame, right: &GrayFrame) -> Result<f64> {
    check_shape(left, right, 1)?;
    Ok(mse_unchecked(left, right))
}

/// Distance between `frames[i]` and `frames[j]`, reporting `j` on a shape mismatch
pub(crate) fn frame_distance(frames: &[GrayFrame], i: usize, j: usize) -> Result<f64> {
    let (left, right) = frame_pair(frames, i, j)?;
    Ok(mse_unchecked(left, right))
}

/// Exact sum of squared differences between `frames[i]` and `frames[j]`
///
/// Equal-shaped frames share a pixel count, so comparing these sums orders
/// pairs the same way the mean does, without rounding.
pub(crate) fn frame_sse(frames: &[GrayFrame], i: usize, j: usize) -> Result<u64> {
    let (left, right) = frame_pair(frames, i, j)?;
    Ok(sse_unchecked(left, right))
}

fn frame_pair(frames: &[GrayFrame], i: usize, j: usize) -> Result<(&GrayFrame, &GrayFrame)> {
    let (left, right) = match (frames.get(i), frames.get(j)) {
        (Some(left), Some(right)) => (left, right),
        _ => {
            return Err(ReconstructError::internal_error(format!(
                "Frame index out of range: ({}, {}) with {} frames",
                i, j, frames.len()
            )))
        }
    };

    check_shape(left, right, j)?;
    Ok((left, right))
}

fn check_shape(left: &GrayFrame, right: &GrayFrame, index: usize) -> Result<()> {
    if left.dimensions() != right.dimensions() {
        return Err(ReconstructError::ShapeMismatch {
            index,
            expected: left.dimensions(),
            found: right.dimensions(),
        });
    }
    Ok(())
}

/// Caller guarantees equal shapes.
fn sse_unchecked(left: &GrayFrame, right: &GrayFrame) -> u64 {
    left.pixels()
        .iter()
        .zip(right.pixels())
        .map(|(&a, &b)| {
            let diff = a as i32 - b as i32;
            (diff * diff) as u64
        })
        .sum()
}

/// Caller guarantees equal shapes.
pub(crate) fn mse_unchecked(left: &GrayFrame, right: &GrayFrame) -> f64 {
    let pixels = left.pixel_count();
    if pixels == 0 {
        return 0.0;
    }

    let mse = sse_unchecked(left, right) as f64 / pixels as f64;
    trace!("Mean squared error: {:.3} (over {} pixels)", mse, pixels);
    mse
}
